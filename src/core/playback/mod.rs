//! Gapless playback of synthesized audio.
//!
//! Inbound chunks arrive at irregular intervals. [`PlaybackScheduler`]
//! places each chunk on the output clock immediately after the previous one,
//! so consecutive chunks play back-to-back and a gap only appears when the
//! network falls behind real time.
//!
//! Output sinks implement [`AudioOutput`]. [`TimelineOutput`] is a
//! sample-accurate timeline driven by a pull callback; the speaker sink
//! (feature `backend-cpal`) pulls from one.

mod recorder;
mod scheduler;
mod timeline;

#[cfg(feature = "backend-cpal")]
mod cpal_output;

pub use recorder::{RECORDING_SAMPLE_RATE, WavRecorder};
pub use scheduler::{PlaybackScheduler, PlaybackStats, ScheduledChunk};
pub use timeline::TimelineOutput;

#[cfg(feature = "backend-cpal")]
pub use cpal_output::{CpalOutput, list_output_devices};

use std::sync::Arc;
use thiserror::Error;

use super::resample::ResampleError;

/// Errors that can occur during playback.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The output device cannot be acquired
    #[error("Audio output device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Sample-rate conversion failed
    #[error("Resampling error: {0}")]
    Resample(#[from] ResampleError),

    /// Writing the recording tap failed
    #[error("Recording error: {0}")]
    Recording(#[from] hound::Error),
}

/// Result type for playback operations.
pub type PlaybackResult<T> = Result<T, PlaybackError>;

/// A sink that plays mono samples at scheduled times.
///
/// `now` is a monotonic clock in seconds on the output's own timeline.
/// Implementations are shared with realtime callbacks, so every method
/// takes `&self`.
pub trait AudioOutput: Send + Sync {
    /// Current output clock in seconds.
    fn now(&self) -> f64;

    /// Play `samples` starting at `start_at` on the output clock.
    fn schedule(&self, samples: Vec<f32>, sample_rate: u32, start_at: f64) -> PlaybackResult<()>;

    /// Drop everything not yet played.
    fn clear(&self);
}

impl<T: AudioOutput + ?Sized> AudioOutput for Arc<T> {
    fn now(&self) -> f64 {
        (**self).now()
    }

    fn schedule(&self, samples: Vec<f32>, sample_rate: u32, start_at: f64) -> PlaybackResult<()> {
        (**self).schedule(samples, sample_rate, start_at)
    }

    fn clear(&self) {
        (**self).clear()
    }
}
