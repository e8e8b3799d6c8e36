//! Capture-to-session frame forwarding.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::base::LiveError;
use super::client::LiveSession;
use crate::core::frame::AudioFrame;

/// Moves capture frames into a session.
///
/// Frames that arrive while the session is not `Active` are dropped and
/// counted, never buffered.
pub struct FrameForwarder {
    session: Arc<LiveSession>,
    forwarded: AtomicU64,
    dropped: AtomicU64,
}

impl FrameForwarder {
    pub fn new(session: Arc<LiveSession>) -> Self {
        Self {
            session,
            forwarded: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Forward one frame; returns whether it was queued for sending.
    pub async fn forward(&self, frame: &AudioFrame) -> bool {
        match self.session.send_audio_frame(frame).await {
            Ok(()) => {
                self.forwarded.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(err) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                match err {
                    LiveError::NotReady(state) if dropped == 1 || dropped % 100 == 0 => {
                        warn!(
                            "Dropping capture frame, session is {} ({} dropped so far)",
                            state, dropped
                        );
                    }
                    LiveError::NotReady(_) => {}
                    other => warn!("Failed to forward capture frame: {}", other),
                }
                false
            }
        }
    }

    /// Forward every frame until the capture channel closes.
    pub async fn run(&self, mut frames: mpsc::Receiver<AudioFrame>) {
        while let Some(frame) = frames.recv().await {
            self.forward(&frame).await;
        }
        debug!(
            "Capture channel closed ({} forwarded, {} dropped)",
            self.forwarded(),
            self.dropped()
        );
    }

    pub fn spawn(self: Arc<Self>, frames: mpsc::Receiver<AudioFrame>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(frames).await })
    }
}
