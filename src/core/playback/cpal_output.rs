//! Speaker output through the system audio host.
//!
//! The device callback pulls mono samples from a shared [`TimelineOutput`]
//! and copies them to every output channel. The stream itself lives on a
//! dedicated thread because `cpal::Stream` is not `Send`.

use std::sync::Arc;
use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, StreamConfig};
use tracing::{debug, error, info, warn};

use super::{AudioOutput, PlaybackError, PlaybackResult, TimelineOutput};
use crate::core::frame::PLAYBACK_SAMPLE_RATE;

/// List the names of available output devices.
pub fn list_output_devices() -> PlaybackResult<Vec<String>> {
    let host = cpal::default_host();
    let devices: Vec<String> = host
        .output_devices()
        .map_err(|e| PlaybackError::DeviceUnavailable(format!("Failed to enumerate devices: {e}")))?
        .filter_map(|device| device.name().ok())
        .collect();
    debug!("Found {} output devices", devices.len());
    Ok(devices)
}

fn find_device(device_name: Option<&str>) -> PlaybackResult<Device> {
    let host = cpal::default_host();
    if let Some(name) = device_name {
        let mut devices = host.output_devices().map_err(|e| {
            PlaybackError::DeviceUnavailable(format!("Failed to enumerate devices: {e}"))
        })?;
        if let Some(device) = devices.find(|d| d.name().ok().as_deref() == Some(name)) {
            return Ok(device);
        }
        warn!(
            "Requested output device '{}' not found, falling back to default device",
            name
        );
    }
    host.default_output_device().ok_or_else(|| {
        PlaybackError::DeviceUnavailable("No default output device found".to_string())
    })
}

/// Prefer an f32 config at the playback rate; otherwise take the default.
fn best_config(device: &Device) -> PlaybackResult<(StreamConfig, SampleFormat)> {
    let mut supported = device
        .supported_output_configs()
        .map_err(|e| PlaybackError::DeviceUnavailable(format!("Failed to get device configs: {e}")))?;

    let preferred = supported.find(|config| {
        config.min_sample_rate().0 <= PLAYBACK_SAMPLE_RATE
            && config.max_sample_rate().0 >= PLAYBACK_SAMPLE_RATE
            && config.sample_format() == SampleFormat::F32
    });
    if let Some(config) = preferred {
        let config = config.with_sample_rate(cpal::SampleRate(PLAYBACK_SAMPLE_RATE));
        return Ok((config.config(), config.sample_format()));
    }

    let config = device
        .default_output_config()
        .map_err(|e| PlaybackError::DeviceUnavailable(format!("Failed to get default config: {e}")))?;
    Ok((config.config(), config.sample_format()))
}

/// Render one device buffer from the timeline, duplicating mono to all channels.
fn fill_interleaved<T: Copy>(
    timeline: &TimelineOutput,
    scratch: &mut Vec<f32>,
    data: &mut [T],
    channels: usize,
    convert: impl Fn(f32) -> T,
) {
    let frames = data.len() / channels.max(1);
    scratch.resize(frames, 0.0);
    timeline.render(scratch);
    for (frame, sample) in data.chunks_mut(channels.max(1)).zip(scratch.iter()) {
        let value = convert(sample.clamp(-1.0, 1.0));
        frame.fill(value);
    }
}

fn build_stream(
    device: &Device,
    config: &StreamConfig,
    sample_format: SampleFormat,
    timeline: Arc<TimelineOutput>,
) -> PlaybackResult<cpal::Stream> {
    let channels = config.channels as usize;
    let err_fn = |err: cpal::StreamError| error!("Audio output stream error: {}", err);
    let mut scratch = Vec::new();

    let stream = match sample_format {
        SampleFormat::F32 => device.build_output_stream(
            config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                fill_interleaved(&timeline, &mut scratch, data, channels, |s| s);
            },
            err_fn,
            None,
        ),
        SampleFormat::I16 => device.build_output_stream(
            config,
            move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                fill_interleaved(&timeline, &mut scratch, data, channels, |s| {
                    (s * i16::MAX as f32) as i16
                });
            },
            err_fn,
            None,
        ),
        SampleFormat::U16 => device.build_output_stream(
            config,
            move |data: &mut [u16], _: &cpal::OutputCallbackInfo| {
                fill_interleaved(&timeline, &mut scratch, data, channels, |s| {
                    ((s + 1.0) * 0.5 * u16::MAX as f32) as u16
                });
            },
            err_fn,
            None,
        ),
        other => {
            return Err(PlaybackError::DeviceUnavailable(format!(
                "Unsupported sample format: {other:?}"
            )));
        }
    }
    .map_err(|e| PlaybackError::DeviceUnavailable(format!("Failed to build stream: {e}")))?;

    stream
        .play()
        .map_err(|e| PlaybackError::DeviceUnavailable(format!("Failed to start stream: {e}")))?;
    Ok(stream)
}

/// Speaker playback device.
pub struct CpalOutput {
    timeline: Arc<TimelineOutput>,
    device_name: String,
    stop_tx: Option<std_mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl CpalOutput {
    /// Open the named output device, or the host default when `None`.
    pub fn open(device_name: Option<String>) -> PlaybackResult<Self> {
        let (ready_tx, ready_rx) =
            std_mpsc::channel::<PlaybackResult<(String, Arc<TimelineOutput>)>>();
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();

        let thread = std::thread::Builder::new()
            .name("live-voice-playback".to_string())
            .spawn(move || {
                let opened = find_device(device_name.as_deref()).and_then(|device| {
                    let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
                    let (config, sample_format) = best_config(&device)?;
                    debug!(
                        "Output config: sample_rate={}, channels={}, format={:?}",
                        config.sample_rate.0, config.channels, sample_format
                    );
                    let timeline = Arc::new(TimelineOutput::new(config.sample_rate.0));
                    let stream = build_stream(&device, &config, sample_format, timeline.clone())?;
                    Ok((name, timeline, stream))
                });
                match opened {
                    Ok((name, timeline, stream)) => {
                        let _ = ready_tx.send(Ok((name, timeline)));
                        let _ = stop_rx.recv();
                        drop(stream);
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                    }
                }
            })
            .map_err(|e| PlaybackError::DeviceUnavailable(format!("Failed to spawn thread: {e}")))?;

        let ready = ready_rx.recv().map_err(|_| {
            PlaybackError::DeviceUnavailable("playback thread exited during setup".to_string())
        });
        match ready.and_then(|result| result) {
            Ok((device_name, timeline)) => {
                info!(
                    "Opened output device '{}' at {}Hz",
                    device_name,
                    timeline.sample_rate()
                );
                Ok(Self {
                    timeline,
                    device_name,
                    stop_tx: Some(stop_tx),
                    thread: Some(thread),
                })
            }
            Err(e) => {
                let _ = thread.join();
                Err(e)
            }
        }
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn timeline(&self) -> Arc<TimelineOutput> {
        self.timeline.clone()
    }

    /// Stop the stream and release the device. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
            debug!("Closed output device '{}'", self.device_name);
        }
    }
}

impl AudioOutput for CpalOutput {
    fn now(&self) -> f64 {
        self.timeline.now()
    }

    fn schedule(&self, samples: Vec<f32>, sample_rate: u32, start_at: f64) -> PlaybackResult<()> {
        self.timeline.schedule(samples, sample_rate, start_at)
    }

    fn clear(&self) {
        self.timeline.clear()
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        self.close();
    }
}
