//! Sample-rate conversion with rubato.
//!
//! Capture audio arrives in arbitrary device-sized blocks, so the capture
//! side uses [`StreamResampler`], which keeps resampler state across calls
//! and buffers leftover input until a full rubato chunk is available.
//! One-off buffers go through [`resample_mono`].

use rubato::{FastFixedIn, PolynomialDegree, Resampler as _};
use tracing::debug;

/// Input frames fed to rubato per streaming call.
pub const STREAM_CHUNK_FRAMES: usize = 1024;

/// Errors raised while building or running a resampler.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ResampleError {
    #[error("Failed to create resampler: {0}")]
    Construction(String),

    #[error("Resampling failed: {0}")]
    Process(String),
}

/// Average interleaved samples down to a single channel.
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => interleaved.to_vec(),
        n => interleaved
            .chunks_exact(n)
            .map(|frame| frame.iter().sum::<f32>() / n as f32)
            .collect(),
    }
}

fn create_resampler(
    input_rate: u32,
    output_rate: u32,
    chunk_size: usize,
) -> Result<FastFixedIn<f32>, ResampleError> {
    FastFixedIn::<f32>::new(
        output_rate as f64 / input_rate as f64,
        1.0,
        PolynomialDegree::Septic,
        chunk_size,
        1,
    )
    .map_err(|e| ResampleError::Construction(e.to_string()))
}

/// Resample a complete mono buffer in one pass.
///
/// Returns a copy when the rates already match. The output holds exactly
/// `round(len * output_rate / input_rate)` samples, aligned with the input.
pub fn resample_mono(
    samples: &[f32],
    input_rate: u32,
    output_rate: u32,
) -> Result<Vec<f32>, ResampleError> {
    if input_rate == output_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let mut resampler = StreamResampler::new(input_rate, output_rate)?;
    let mut output = resampler.process(samples)?;
    output.extend(resampler.flush()?);
    Ok(output)
}

/// Output samples to drop so the first one lands on the first input sample.
fn leading_skip(resampler: &FastFixedIn<f32>) -> usize {
    resampler.output_delay().saturating_sub(1)
}

// =============================================================================
// Streaming resampler
// =============================================================================

/// Mono resampler that accepts input of any length.
///
/// Input that does not fill a whole chunk is held until the next call, so
/// output lags input by at most one chunk. The filter delay is trimmed from
/// the front of the stream, and [`flush`](StreamResampler::flush) emits the
/// held tail so that the stream's total length matches its input duration.
pub struct StreamResampler {
    inner: FastFixedIn<f32>,
    pending: Vec<f32>,
    input_rate: u32,
    output_rate: u32,
    /// Leading output samples still to drop
    skip: usize,
    /// Input samples accepted since the last reset
    fed: u64,
    /// Output samples returned since the last reset
    emitted: u64,
}

impl StreamResampler {
    pub fn new(input_rate: u32, output_rate: u32) -> Result<Self, ResampleError> {
        if input_rate == 0 || output_rate == 0 {
            return Err(ResampleError::Construction(format!(
                "invalid rates {input_rate} -> {output_rate}"
            )));
        }
        debug!(
            "Creating streaming resampler {}Hz -> {}Hz",
            input_rate, output_rate
        );
        let inner = create_resampler(input_rate, output_rate, STREAM_CHUNK_FRAMES)?;
        Ok(Self {
            skip: leading_skip(&inner),
            inner,
            pending: Vec::with_capacity(STREAM_CHUNK_FRAMES * 2),
            input_rate,
            output_rate,
            fed: 0,
            emitted: 0,
        })
    }

    pub fn input_rate(&self) -> u32 {
        self.input_rate
    }

    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }

    /// Samples buffered but not yet converted.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Output length that corresponds to everything fed since the last reset.
    pub fn expected_output_len(&self) -> u64 {
        (self.fed as f64 * self.output_rate as f64 / self.input_rate as f64).round() as u64
    }

    /// Feed mono samples and collect whatever output is ready.
    pub fn process(&mut self, samples: &[f32]) -> Result<Vec<f32>, ResampleError> {
        self.pending.extend_from_slice(samples);
        self.fed += samples.len() as u64;

        let mut output = Vec::new();
        loop {
            let needed = self.inner.input_frames_next();
            if self.pending.len() < needed {
                break;
            }
            let waves = [&self.pending[..needed]];
            let converted = self
                .inner
                .process(&waves[..], None)
                .map_err(|e| ResampleError::Process(e.to_string()))?;
            if let Some(channel) = converted.first() {
                output.extend_from_slice(channel);
            }
            self.pending.drain(..needed);
        }
        Ok(self.trim(output))
    }

    /// Emit the held input and the filter tail, then start a new stream.
    ///
    /// Together with earlier [`process`](StreamResampler::process) output
    /// this yields exactly [`expected_output_len`](StreamResampler::expected_output_len)
    /// samples.
    pub fn flush(&mut self) -> Result<Vec<f32>, ResampleError> {
        let mut output = Vec::new();
        if !self.pending.is_empty() {
            let waves = [&self.pending[..]];
            let converted = self
                .inner
                .process_partial(Some(&waves[..]), None)
                .map_err(|e| ResampleError::Process(e.to_string()))?;
            if let Some(channel) = converted.first() {
                output.extend_from_slice(channel);
            }
        }
        let tail = self
            .inner
            .process_partial::<&[f32]>(None, None)
            .map_err(|e| ResampleError::Process(e.to_string()))?;
        if let Some(channel) = tail.first() {
            output.extend_from_slice(channel);
        }

        let mut output = self.trim(output);
        let remaining = self.expected_output_len().saturating_sub(self.emitted);
        output.truncate(remaining as usize);
        self.reset();
        Ok(output)
    }

    /// Drop buffered input and filter state.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.inner.reset();
        self.skip = leading_skip(&self.inner);
        self.fed = 0;
        self.emitted = 0;
    }

    fn trim(&mut self, mut output: Vec<f32>) -> Vec<f32> {
        if self.skip > 0 {
            let n = self.skip.min(output.len());
            output.drain(..n);
            self.skip -= n;
        }
        self.emitted += output.len() as u64;
        output
    }
}
