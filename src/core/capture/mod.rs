//! Microphone capture pipeline.
//!
//! Turns a live input device into a stream of fixed-size 16 kHz PCM16
//! [`AudioFrame`](crate::core::frame::AudioFrame)s ready for the session.
//!
//! ```text
//! InputDevice callback -> RawSink (bounded) -> worker task
//!     -> downmix -> StreamResampler (16 kHz) -> fixed blocks -> PCM16 frames
//! ```
//!
//! The device pushes interleaved `f32` blocks from its own thread. Pushing
//! never blocks: when the raw queue is full the block is dropped and
//! counted, so a stalled consumer cannot stall the audio callback.
//!
//! A device that fails after opening reports through [`RawSink::fail`]. The
//! worker stops, the frame channel closes and the error stays available
//! from [`CapturePipeline::failure`].

mod device;
mod pipeline;

#[cfg(feature = "backend-cpal")]
mod cpal_input;

pub use device::{DeviceFailure, DeviceFormat, InputDevice, RawSink, ScriptedInput};
pub use pipeline::{
    BlockAssembler, CaptureConfig, CapturePipeline, CaptureStats, DEFAULT_BLOCK_SIZE,
    MAX_BLOCK_SIZE, MIN_BLOCK_SIZE,
};

#[cfg(feature = "backend-cpal")]
pub use cpal_input::{CpalInput, list_input_devices};

use thiserror::Error;

use super::resample::ResampleError;

/// Errors that can occur while capturing audio.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The input device cannot be acquired
    #[error("Audio input device unavailable: {0}")]
    DeviceUnavailable(String),

    /// `start()` was called on a running pipeline
    #[error("Capture pipeline is already running")]
    AlreadyRunning,

    /// Invalid pipeline configuration
    #[error("Invalid capture configuration: {0}")]
    InvalidConfiguration(String),

    /// Sample-rate conversion failed
    #[error("Resampling error: {0}")]
    Resample(#[from] ResampleError),
}

/// Result type for capture operations.
pub type CaptureResult<T> = Result<T, CaptureError>;
