//! Audio frames exchanged between capture, session and playback.

use bytes::Bytes;
use std::fmt;

use super::codec::{self, CodecResult};

/// Sample rate of microphone audio sent to the service.
pub const CAPTURE_SAMPLE_RATE: u32 = 16000;

/// Sample rate of synthesized audio returned by the service.
pub const PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// Mime type attached to outbound microphone frames.
pub const CAPTURE_MIME_TYPE: &str = "audio/pcm;rate=16000";

/// A contiguous block of mono PCM16 little-endian samples.
///
/// Frames are immutable once built; cloning only bumps the `Bytes` refcount.
#[derive(Clone, PartialEq, Eq)]
pub struct AudioFrame {
    data: Bytes,
    sample_rate: u32,
    mime_type: String,
}

impl AudioFrame {
    /// Wrap already-encoded PCM16 bytes.
    pub fn new(data: Bytes, sample_rate: u32, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            sample_rate,
            mime_type: mime_type.into(),
        }
    }

    /// Encode floating-point samples into an outbound 16 kHz capture frame.
    pub fn capture(samples: &[f32]) -> Self {
        Self::new(
            codec::encode_pcm16(samples),
            CAPTURE_SAMPLE_RATE,
            CAPTURE_MIME_TYPE,
        )
    }

    /// Build a frame from an inbound `inlineData` part.
    ///
    /// The sample rate comes from the mime type's `rate=` parameter and
    /// falls back to the 24 kHz playback rate.
    pub fn from_portable_text(mime_type: &str, data: &str) -> CodecResult<Self> {
        let bytes = codec::from_portable_text(data)?;
        let sample_rate = codec::parse_pcm_rate(mime_type).unwrap_or(PLAYBACK_SAMPLE_RATE);
        Ok(Self::new(Bytes::from(bytes), sample_rate, mime_type))
    }

    /// Raw PCM16 bytes.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Number of samples in the frame.
    pub fn sample_count(&self) -> usize {
        codec::pcm16_sample_count(self.data.len())
    }

    /// Playback duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        codec::pcm16_duration(self.data.len(), self.sample_rate)
    }

    pub fn is_empty(&self) -> bool {
        self.sample_count() == 0
    }

    /// Decode the frame into floating-point samples.
    pub fn to_samples(&self) -> Vec<f32> {
        codec::decode_pcm16(&self.data)
    }

    /// Encode the payload as portable text for a JSON envelope.
    pub fn to_portable_text(&self) -> String {
        codec::to_portable_text(&self.data)
    }
}

impl fmt::Debug for AudioFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioFrame")
            .field("bytes", &self.data.len())
            .field("sample_rate", &self.sample_rate)
            .field("mime_type", &self.mime_type)
            .finish()
    }
}
