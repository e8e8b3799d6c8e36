use std::path::PathBuf;

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use tracing::Level;

use live_voice::ClientConfig;
use live_voice::core::live::ClientMessage;

/// Live Voice - realtime spoken conversation with a Gemini Live model
#[derive(Parser, Debug)]
#[command(name = "live-voice")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,

    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Talk to the model through the microphone and speakers
    Converse {
        /// Also write the model's audio to this WAV file
        #[arg(short = 'r', long = "record", value_name = "FILE")]
        record: Option<PathBuf>,
    },

    /// Print the setup message that would open a session
    SetupMessage,

    /// List audio input and output devices
    Devices,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    // Initialize crypto provider for TLS connections
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    match cli.command {
        Commands::Devices => devices::list(),
        Commands::SetupMessage => {
            let config = load_config(cli.config)?;
            let session_config = config.to_session_config()?;
            let message = ClientMessage::setup(&session_config);
            println!("{}", serde_json::to_string_pretty(&message)?);
            Ok(())
        }
        Commands::Converse { record } => {
            let config = load_config(cli.config)?;
            conversation::run(config, record).await
        }
    }
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<ClientConfig> {
    if let Some(config_path) = path {
        tracing::debug!("Loading configuration from {}", config_path.display());
        ClientConfig::from_file(&config_path).map_err(|e| anyhow!(e.to_string()))
    } else {
        ClientConfig::from_env().map_err(|e| anyhow!(e.to_string()))
    }
}

#[cfg(feature = "backend-cpal")]
mod devices {
    use live_voice::core::capture::list_input_devices;
    use live_voice::core::playback::list_output_devices;

    pub fn list() -> anyhow::Result<()> {
        println!("Input devices:");
        for name in list_input_devices()? {
            println!("  {name}");
        }
        println!("Output devices:");
        for name in list_output_devices()? {
            println!("  {name}");
        }
        Ok(())
    }
}

#[cfg(not(feature = "backend-cpal"))]
mod devices {
    pub fn list() -> anyhow::Result<()> {
        anyhow::bail!("Audio devices require the `backend-cpal` feature")
    }
}

#[cfg(feature = "backend-cpal")]
mod conversation {
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::Arc;

    use tracing::{info, warn};

    use live_voice::ClientConfig;
    use live_voice::core::capture::{CapturePipeline, CpalInput};
    use live_voice::core::live::{FrameForwarder, LiveSession, SessionEvent, ToolResponse};
    use live_voice::core::playback::{CpalOutput, PlaybackScheduler, WavRecorder};

    pub async fn run(config: ClientConfig, record: Option<PathBuf>) -> anyhow::Result<()> {
        let options = config.connection_options();
        let setup_timeout = options.setup_timeout;
        let session = Arc::new(LiveSession::with_options(
            config.to_session_config()?,
            options,
        ));

        let output = CpalOutput::open(config.output_device.clone())?;
        info!("Playing through {}", output.device_name());
        let mut scheduler = PlaybackScheduler::new(output);
        if let Some(path) = record.or_else(|| config.record_path.clone()) {
            info!("Recording model audio to {}", path.display());
            scheduler = scheduler.with_recorder(WavRecorder::create(&path)?);
        }

        let mut events = session.subscribe();
        session.connect().await?;
        session.wait_for_active(setup_timeout).await?;

        let mut capture = CapturePipeline::new(
            Box::new(CpalInput::new(config.input_device.clone())),
            config.capture_config(),
        );
        let frames = capture.start()?;
        let forwarder = Arc::new(FrameForwarder::new(session.clone()));
        let mut forward_task = forwarder.clone().spawn(frames);
        println!("Listening. Press Ctrl-C to end the conversation.");

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Ending conversation");
                    break;
                }
                _ = &mut forward_task => {
                    // The frame channel closed without a stop request
                    warn!("Microphone capture ended");
                    break;
                }
                event = events.recv() => {
                    let Some(event) = event else { break };
                    let is_final = event.is_final();
                    match event {
                        SessionEvent::AudioChunkReceived(frame) => {
                            scheduler.enqueue(&frame)?;
                        }
                        SessionEvent::TextReceived(text) => {
                            print!("{text}");
                            let _ = std::io::stdout().flush();
                        }
                        SessionEvent::Interrupted => scheduler.interrupt(),
                        SessionEvent::TurnComplete => println!(),
                        SessionEvent::ToolInvoked(call) => {
                            println!("\n[tool call] {} {}", call.name, call.arguments);
                            let response = ToolResponse::for_invocation(
                                &call,
                                serde_json::json!({"error": "tool not available in this client"}),
                            );
                            session.send_tool_response(vec![response]).await?;
                        }
                        SessionEvent::ToolCallCancelled(ids) => {
                            println!("\n[tool calls cancelled] {}", ids.join(", "));
                        }
                        SessionEvent::GoAway { time_left } => {
                            warn!("Service is closing the session soon ({:?})", time_left);
                        }
                        SessionEvent::Closed { code, reason } => {
                            println!("\nSession closed ({code}: {reason})");
                        }
                        SessionEvent::Error(e) => {
                            eprintln!("\nSession error: {e}");
                        }
                        SessionEvent::Opened | SessionEvent::SetupComplete => {}
                    }
                    if is_final {
                        break;
                    }
                }
            }
        }

        capture.stop();
        forward_task.abort();
        session.disconnect().await?;
        scheduler.finish_recording()?;
        if let Some(e) = capture.failure() {
            return Err(e.into());
        }

        let stats = session.stats();
        info!(
            "Sent {} frames ({} dropped), received {} messages, scheduled {:.1}s of audio",
            stats.frames_sent,
            forwarder.dropped(),
            stats.messages_received,
            scheduler.stats().scheduled_secs
        );
        Ok(())
    }
}

#[cfg(not(feature = "backend-cpal"))]
mod conversation {
    use std::path::PathBuf;

    use live_voice::ClientConfig;

    pub async fn run(_config: ClientConfig, _record: Option<PathBuf>) -> anyhow::Result<()> {
        anyhow::bail!("Conversations require the `backend-cpal` feature")
    }
}
