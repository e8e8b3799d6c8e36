use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::device::{DeviceFailure, DeviceFormat, InputDevice, RawSink};
use super::{CaptureError, CaptureResult};
use crate::core::frame::{AudioFrame, CAPTURE_SAMPLE_RATE};
use crate::core::resample::{StreamResampler, downmix};

/// Samples per emitted frame (256 ms at 16 kHz).
pub const DEFAULT_BLOCK_SIZE: usize = 4096;
pub const MIN_BLOCK_SIZE: usize = 2048;
pub const MAX_BLOCK_SIZE: usize = 8192;

const DEFAULT_RAW_QUEUE_CAPACITY: usize = 64;
const DEFAULT_FRAME_QUEUE_CAPACITY: usize = 32;

/// Capture pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Samples per emitted frame, after resampling
    pub block_size: usize,
    /// Raw device blocks buffered before dropping
    pub raw_queue_capacity: usize,
    /// Encoded frames buffered before the worker waits on the consumer
    pub frame_queue_capacity: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            raw_queue_capacity: DEFAULT_RAW_QUEUE_CAPACITY,
            frame_queue_capacity: DEFAULT_FRAME_QUEUE_CAPACITY,
        }
    }
}

impl CaptureConfig {
    pub fn with_block_size(block_size: usize) -> Self {
        Self {
            block_size,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> CaptureResult<()> {
        if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&self.block_size) {
            return Err(CaptureError::InvalidConfiguration(format!(
                "block_size must be between {} and {}, got {}",
                MIN_BLOCK_SIZE, MAX_BLOCK_SIZE, self.block_size
            )));
        }
        if self.raw_queue_capacity == 0 || self.frame_queue_capacity == 0 {
            return Err(CaptureError::InvalidConfiguration(
                "queue capacities must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Counters exposed by [`CapturePipeline::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub frames_emitted: u64,
    pub blocks_dropped: u64,
}

#[derive(Default)]
struct CaptureCounters {
    frames_emitted: AtomicU64,
    blocks_dropped: Arc<AtomicU64>,
}

// =============================================================================
// Block assembly
// =============================================================================

/// Converts raw device blocks into fixed-size 16 kHz frames.
///
/// Holds resampler state and the partially filled block between calls.
pub struct BlockAssembler {
    channels: usize,
    resampler: Option<StreamResampler>,
    pending: Vec<f32>,
    block_size: usize,
}

impl BlockAssembler {
    pub fn new(format: DeviceFormat, block_size: usize) -> CaptureResult<Self> {
        if format.channels == 0 {
            return Err(CaptureError::DeviceUnavailable(
                "device reported zero channels".to_string(),
            ));
        }
        let resampler = if format.sample_rate == CAPTURE_SAMPLE_RATE {
            None
        } else {
            Some(StreamResampler::new(format.sample_rate, CAPTURE_SAMPLE_RATE)?)
        };
        Ok(Self {
            channels: format.channels as usize,
            resampler,
            pending: Vec::with_capacity(block_size * 2),
            block_size,
        })
    }

    /// Samples waiting for the next full block.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Feed one raw interleaved block; returns every frame it completes.
    pub fn push(&mut self, interleaved: &[f32]) -> CaptureResult<Vec<AudioFrame>> {
        let mono = downmix(interleaved, self.channels);
        match self.resampler.as_mut() {
            Some(resampler) => {
                let converted = resampler.process(&mono)?;
                self.pending.extend_from_slice(&converted);
            }
            None => self.pending.extend_from_slice(&mono),
        }

        let mut frames = Vec::with_capacity(self.pending.len() / self.block_size);
        while self.pending.len() >= self.block_size {
            frames.push(AudioFrame::capture(&self.pending[..self.block_size]));
            self.pending.drain(..self.block_size);
        }
        Ok(frames)
    }
}

// =============================================================================
// Pipeline
// =============================================================================

struct RunningCapture {
    cancel: CancellationToken,
    worker: JoinHandle<()>,
}

impl RunningCapture {
    fn is_active(&self) -> bool {
        !self.worker.is_finished()
    }
}

/// Owns an input device and the worker that turns its output into frames.
pub struct CapturePipeline {
    device: Box<dyn InputDevice>,
    config: CaptureConfig,
    counters: Arc<CaptureCounters>,
    failure: DeviceFailure,
    running: Option<RunningCapture>,
}

impl CapturePipeline {
    pub fn new(device: Box<dyn InputDevice>, config: CaptureConfig) -> Self {
        Self {
            device,
            config,
            counters: Arc::new(CaptureCounters::default()),
            failure: DeviceFailure::default(),
            running: None,
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Whether frames are still being produced.
    ///
    /// Turns false once the worker has stopped, including after a device
    /// failure (see [`failure`](CapturePipeline::failure)).
    pub fn is_running(&self) -> bool {
        self.running.as_ref().is_some_and(RunningCapture::is_active)
    }

    /// The device failure that ended the current or last run, if any.
    ///
    /// When the frame channel closes without `stop`, check here.
    pub fn failure(&self) -> Option<CaptureError> {
        self.failure.get()
    }

    pub fn stats(&self) -> CaptureStats {
        CaptureStats {
            frames_emitted: self.counters.frames_emitted.load(Ordering::Relaxed),
            blocks_dropped: self.counters.blocks_dropped.load(Ordering::Relaxed),
        }
    }

    /// Open the device and start emitting frames.
    ///
    /// Must be called from within a tokio runtime. Frames arrive on the
    /// returned channel in capture order; the channel closes after `stop`.
    pub fn start(&mut self) -> CaptureResult<mpsc::Receiver<AudioFrame>> {
        if self.is_running() {
            return Err(CaptureError::AlreadyRunning);
        }
        // Release a device whose run already ended on its own
        self.stop();
        self.config.validate()?;

        self.failure = DeviceFailure::default();
        let (raw_tx, raw_rx) = mpsc::channel(self.config.raw_queue_capacity);
        let sink = RawSink::new(
            raw_tx,
            self.counters.blocks_dropped.clone(),
            self.failure.clone(),
        );
        let format = self.device.open(sink)?;

        let assembler = match BlockAssembler::new(format, self.config.block_size) {
            Ok(assembler) => assembler,
            Err(e) => {
                self.device.close();
                return Err(e);
            }
        };

        info!(
            "Capture started on '{}' ({}Hz, {} channels, block {} samples)",
            self.device.name(),
            format.sample_rate,
            format.channels,
            self.config.block_size
        );

        let (frame_tx, frame_rx) = mpsc::channel(self.config.frame_queue_capacity);
        let cancel = CancellationToken::new();
        let worker = tokio::spawn(run_worker(
            raw_rx,
            frame_tx,
            assembler,
            cancel.clone(),
            self.failure.clone(),
            self.counters.clone(),
        ));

        self.running = Some(RunningCapture { cancel, worker });
        Ok(frame_rx)
    }

    /// Stop the worker and release the device.
    ///
    /// The partially filled block is discarded. Safe to call repeatedly.
    pub fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        running.cancel.cancel();
        running.worker.abort();
        self.device.close();

        let stats = self.stats();
        info!(
            "Capture stopped ({} frames emitted, {} raw blocks dropped)",
            stats.frames_emitted, stats.blocks_dropped
        );
    }
}

impl Drop for CapturePipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_worker(
    mut raw_rx: mpsc::Receiver<Vec<f32>>,
    frame_tx: mpsc::Sender<AudioFrame>,
    mut assembler: BlockAssembler,
    cancel: CancellationToken,
    failure: DeviceFailure,
    counters: Arc<CaptureCounters>,
) {
    loop {
        // Blocks already queued are converted before a failure stops the worker
        let block = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            block = raw_rx.recv() => match block {
                Some(block) => block,
                None => break,
            },
            _ = failure.reported() => break,
        };

        let frames = match assembler.push(&block) {
            Ok(frames) => frames,
            Err(e) => {
                failure.report(e);
                break;
            }
        };

        for frame in frames {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                sent = frame_tx.send(frame) => {
                    if sent.is_err() {
                        debug!("Frame receiver dropped, stopping capture worker");
                        return;
                    }
                    counters.frames_emitted.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }
    if failure.is_failed() {
        warn!("Capture worker stopped after device failure");
    }
    debug!(
        "Capture worker exiting with {} samples discarded",
        assembler.pending_len()
    );
}
