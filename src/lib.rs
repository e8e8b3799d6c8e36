//! Realtime duplex voice sessions with the Gemini Live / Vertex AI
//! `BidiGenerateContent` service.
//!
//! - [`core::capture`]: microphone blocks to 16 kHz PCM16 frames
//! - [`core::live`]: the session protocol client
//! - [`core::playback`]: gapless scheduling of 24 kHz model audio
//! - [`core::codec`]: PCM16 and base64 conversions
//! - [`config`]: YAML and environment configuration

pub mod config;
pub mod core;

// Re-export commonly used items for convenience
pub use config::ClientConfig;
pub use core::*;
