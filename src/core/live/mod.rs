//! Live session protocol.
//!
//! Persistent bidirectional session with the Gemini Live / Vertex AI
//! `BidiGenerateContent` service over one WebSocket.
//!
//! # Lifecycle
//!
//! 1. `connect()` opens the transport and sends the setup message first
//! 2. The service acknowledges with `setupComplete`; the session is `Active`
//! 3. Microphone frames flow out as realtime input; model audio, text and
//!    tool calls flow back as [`SessionEvent`]s
//! 4. `disconnect()` sends a normal close; exactly one `Closed` is emitted
//!
//! # Wire format
//!
//! - Outbound audio: `{"realtime_input":{"media_chunks":[{"mime_type":"audio/pcm;rate=16000","data":"<base64>"}]}}`
//! - Inbound audio: `serverContent.modelTurn.parts[].inlineData` with 24 kHz PCM16
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use live_voice::core::live::{FrameForwarder, LiveSession, SessionConfig, Endpoint};
//!
//! let session = Arc::new(LiveSession::new(SessionConfig::new(
//!     Endpoint::GeminiApi,
//!     api_key,
//!     "gemini-live-2.5-flash-preview-native-audio-09-2025",
//! )));
//! session.connect().await?;
//! let forwarder = Arc::new(FrameForwarder::new(session.clone()));
//! forwarder.spawn(capture_frames);
//! ```

mod base;
mod bridge;
mod client;
mod config;
mod events;
mod messages;

pub use base::{
    EventCallback, LiveError, LiveResult, SessionEvent, SessionState, SessionStats,
    ToolInvocation, ToolResponse,
};
pub use bridge::FrameForwarder;
pub use client::LiveSession;
pub use config::{
    ConnectionOptions, DEFAULT_MODEL, DEFAULT_REGION, Endpoint, GEMINI_API_LIVE_URL,
    GEMINI_EPHEMERAL_LIVE_URL, ResponseModality, SessionConfig, TokenPlacement, ToolDeclaration,
    VERTEX_AI_LIVE_PATH,
};
pub use events::{EventBus, EventStream};
pub use messages::{ClientMessage, ContentPart, InboundMessage, parse_server_message};
