use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::{CaptureError, CaptureResult};

/// Native format of an opened input device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl DeviceFormat {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }
}

/// First failure reported by a device after it was opened.
///
/// Reporting is non-blocking and may happen from any thread; the capture
/// worker wakes on the first report and stops.
#[derive(Clone, Default)]
pub struct DeviceFailure {
    error: Arc<Mutex<Option<CaptureError>>>,
    signal: CancellationToken,
}

impl DeviceFailure {
    /// Record `error` unless a failure is already recorded.
    pub fn report(&self, error: CaptureError) {
        {
            let mut slot = self.error.lock();
            if slot.is_some() {
                return;
            }
            error!("Capture device failed: {}", error);
            *slot = Some(error);
        }
        self.signal.cancel();
    }

    pub fn get(&self) -> Option<CaptureError> {
        self.error.lock().clone()
    }

    pub fn is_failed(&self) -> bool {
        self.signal.is_cancelled()
    }

    /// Resolves once a failure has been reported.
    pub async fn reported(&self) {
        self.signal.cancelled().await
    }
}

/// Non-blocking handle a device uses to hand raw blocks to the pipeline.
///
/// Safe to call from a realtime audio thread: `push` never waits. Blocks
/// that do not fit in the queue are dropped and counted.
#[derive(Clone)]
pub struct RawSink {
    tx: mpsc::Sender<Vec<f32>>,
    dropped: Arc<AtomicU64>,
    failure: DeviceFailure,
}

impl RawSink {
    pub(crate) fn new(
        tx: mpsc::Sender<Vec<f32>>,
        dropped: Arc<AtomicU64>,
        failure: DeviceFailure,
    ) -> Self {
        Self {
            tx,
            dropped,
            failure,
        }
    }

    /// Report that the device stopped delivering audio.
    ///
    /// The pipeline stops and keeps `error` for the caller.
    pub fn fail(&self, error: CaptureError) {
        self.failure.report(error);
    }

    /// Queue one block of interleaved samples.
    ///
    /// Returns `false` when the block was dropped.
    pub fn push(&self, interleaved: Vec<f32>) -> bool {
        match self.tx.try_send(interleaved) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                // Log the first drop and then every 100th to keep the callback quiet
                if dropped == 1 || dropped % 100 == 0 {
                    warn!("Capture queue full, dropped {} raw blocks so far", dropped);
                }
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Whether the pipeline side has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// A live source of interleaved `f32` audio.
///
/// `open` starts delivery into `sink` from the device's own context and
/// reports the native format; `close` stops delivery and releases the
/// device. `close` must be safe to call more than once.
pub trait InputDevice: Send {
    /// Human-readable device name for logs.
    fn name(&self) -> &str;

    fn open(&mut self, sink: RawSink) -> CaptureResult<DeviceFormat>;

    fn close(&mut self);
}

// =============================================================================
// Scripted input
// =============================================================================

/// Input device that replays prepared blocks.
///
/// Used for tests and dry runs. Blocks are delivered from a background
/// thread, optionally paced by a fixed interval to mimic a real device.
pub struct ScriptedInput {
    name: String,
    format: DeviceFormat,
    blocks: Vec<Vec<f32>>,
    interval: Option<Duration>,
    fail_open: bool,
    /// Fail with this message after delivering this many blocks
    fail_after: Option<(usize, String)>,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ScriptedInput {
    pub fn new(format: DeviceFormat, blocks: Vec<Vec<f32>>) -> Self {
        Self {
            name: "scripted".to_string(),
            format,
            blocks,
            interval: None,
            fail_open: false,
            fail_after: None,
            stop: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }

    /// A device whose `open` always fails with `DeviceUnavailable`.
    pub fn unavailable() -> Self {
        let mut input = Self::new(DeviceFormat::new(16000, 1), Vec::new());
        input.name = "unavailable".to_string();
        input.fail_open = true;
        input
    }

    /// Pace delivery, sleeping `interval` before each block.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Deliver `blocks` blocks, then report the device as lost.
    pub fn fail_after(mut self, blocks: usize, message: impl Into<String>) -> Self {
        self.fail_after = Some((blocks, message.into()));
        self
    }

    pub fn is_open(&self) -> bool {
        self.thread.is_some()
    }
}

impl InputDevice for ScriptedInput {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self, sink: RawSink) -> CaptureResult<DeviceFormat> {
        if self.fail_open {
            return Err(CaptureError::DeviceUnavailable(format!(
                "device '{}' cannot be opened",
                self.name
            )));
        }
        if self.thread.is_some() {
            return Err(CaptureError::DeviceUnavailable(format!(
                "device '{}' is already open",
                self.name
            )));
        }

        let blocks = std::mem::take(&mut self.blocks);
        let interval = self.interval;
        let fail_after = self.fail_after.clone();
        let stop = Arc::new(AtomicBool::new(false));
        self.stop = stop.clone();

        debug!("Scripted input replaying {} blocks", blocks.len());
        self.thread = Some(std::thread::spawn(move || {
            let limit = fail_after.as_ref().map_or(usize::MAX, |(limit, _)| *limit);
            for block in blocks.into_iter().take(limit) {
                if let Some(interval) = interval {
                    std::thread::sleep(interval);
                }
                if stop.load(Ordering::Acquire) || sink.is_closed() {
                    return;
                }
                sink.push(block);
            }
            if let Some((_, message)) = fail_after {
                sink.fail(CaptureError::DeviceUnavailable(message));
            }
        }));

        Ok(self.format)
    }

    fn close(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ScriptedInput {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_sink_counts_drops() {
        let (tx, mut rx) = mpsc::channel(1);
        let dropped = Arc::new(AtomicU64::new(0));
        let sink = RawSink::new(tx, dropped.clone(), DeviceFailure::default());

        assert!(sink.push(vec![0.0; 4]));
        assert!(!sink.push(vec![0.0; 4]));
        assert!(!sink.push(vec![0.0; 4]));
        assert_eq!(dropped.load(Ordering::Relaxed), 2);

        assert_eq!(rx.try_recv().unwrap().len(), 4);
        assert!(sink.push(vec![0.0; 4]));
    }

    #[test]
    fn test_raw_sink_closed_is_not_a_drop() {
        let (tx, rx) = mpsc::channel(1);
        let dropped = Arc::new(AtomicU64::new(0));
        let sink = RawSink::new(tx, dropped.clone(), DeviceFailure::default());
        drop(rx);

        assert!(sink.is_closed());
        assert!(!sink.push(vec![0.0]));
        assert_eq!(dropped.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_first_failure_wins() {
        let failure = DeviceFailure::default();
        assert!(!failure.is_failed());
        failure.report(CaptureError::DeviceUnavailable("unplugged".to_string()));
        failure.report(CaptureError::DeviceUnavailable("later".to_string()));
        assert!(failure.is_failed());
        assert_eq!(
            failure.get(),
            Some(CaptureError::DeviceUnavailable("unplugged".to_string()))
        );
    }

    #[test]
    fn test_unavailable_device() {
        let (tx, _rx) = mpsc::channel(1);
        let mut input = ScriptedInput::unavailable();
        let result = input.open(RawSink::new(tx, Arc::default(), DeviceFailure::default()));
        assert!(matches!(result, Err(CaptureError::DeviceUnavailable(_))));
        assert!(!input.is_open());
    }

    #[test]
    fn test_scripted_input_delivers_blocks() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut input = ScriptedInput::new(
            DeviceFormat::new(48000, 2),
            vec![vec![0.5; 8], vec![-0.5; 8]],
        );
        let format = input.open(RawSink::new(tx, Arc::default(), DeviceFailure::default())).unwrap();
        assert_eq!(format, DeviceFormat::new(48000, 2));

        assert_eq!(rx.blocking_recv().unwrap(), vec![0.5; 8]);
        assert_eq!(rx.blocking_recv().unwrap(), vec![-0.5; 8]);

        input.close();
        assert!(!input.is_open());
        // Idempotent
        input.close();
    }
}
