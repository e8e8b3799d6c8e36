use tracing::{debug, trace, warn};

use super::{AudioOutput, PlaybackResult, WavRecorder};
use crate::core::frame::AudioFrame;

/// Where a chunk landed on the output clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledChunk {
    /// Start time on the output clock, seconds
    pub start_at: f64,
    /// Chunk duration, seconds
    pub duration: f64,
    /// Silence inserted before this chunk because it arrived late, seconds
    pub gap: f64,
}

impl ScheduledChunk {
    pub fn end_at(&self) -> f64 {
        self.start_at + self.duration
    }
}

/// Counters exposed by [`PlaybackScheduler::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaybackStats {
    pub chunks_scheduled: u64,
    /// Chunks that arrived after the previous one had finished playing
    pub late_chunks: u64,
    pub scheduled_secs: f64,
}

/// Schedules inbound chunks back-to-back on an output clock.
///
/// Keeps a single cursor: the time at which the next chunk should start.
/// A chunk starts at the cursor, or at `now()` when the cursor is unset or
/// already in the past, and the cursor then moves past its end. Start times
/// are therefore FIFO and never overlap.
pub struct PlaybackScheduler<O: AudioOutput> {
    output: O,
    cursor: Option<f64>,
    recorder: Option<WavRecorder>,
    stats: PlaybackStats,
}

impl<O: AudioOutput> PlaybackScheduler<O> {
    pub fn new(output: O) -> Self {
        Self {
            output,
            cursor: None,
            recorder: None,
            stats: PlaybackStats::default(),
        }
    }

    /// Also write every scheduled chunk to `recorder`.
    pub fn with_recorder(mut self, recorder: WavRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    /// Next scheduled start time, if any chunk is pending.
    pub fn cursor(&self) -> Option<f64> {
        self.cursor
    }

    pub fn stats(&self) -> PlaybackStats {
        self.stats
    }

    /// Schedule one chunk after everything already scheduled.
    ///
    /// Empty chunks are ignored and return `None`.
    pub fn enqueue(&mut self, frame: &AudioFrame) -> PlaybackResult<Option<ScheduledChunk>> {
        let samples = frame.to_samples();
        if samples.is_empty() || frame.sample_rate() == 0 {
            trace!("Ignoring empty playback chunk");
            return Ok(None);
        }
        let duration = samples.len() as f64 / frame.sample_rate() as f64;

        let now = self.output.now();
        let (start_at, gap) = match self.cursor {
            Some(cursor) if cursor >= now => (cursor, 0.0),
            Some(cursor) => (now, now - cursor),
            None => (now, 0.0),
        };

        self.output.schedule(samples, frame.sample_rate(), start_at)?;
        self.cursor = Some(start_at + duration);

        if gap > 0.0 {
            self.stats.late_chunks += 1;
            debug!("Playback chunk arrived {:.3}s late", gap);
        }
        self.stats.chunks_scheduled += 1;
        self.stats.scheduled_secs += duration;

        if let Some(recorder) = self.recorder.as_mut()
            && let Err(e) = recorder.write_frame(frame)
        {
            warn!("Disabling recording after write failure: {}", e);
            self.recorder = None;
        }

        Ok(Some(ScheduledChunk {
            start_at,
            duration,
            gap,
        }))
    }

    /// Forget the cursor. The next chunk starts at `now()`.
    pub fn reset(&mut self) {
        self.cursor = None;
    }

    /// Drop pending audio and reset the cursor (user barge-in).
    pub fn interrupt(&mut self) {
        self.output.clear();
        self.reset();
        debug!("Playback interrupted");
    }

    /// Finalize the recording tap, if any.
    pub fn finish_recording(&mut self) -> PlaybackResult<()> {
        match self.recorder.take() {
            Some(mut recorder) => recorder.finalize(),
            None => Ok(()),
        }
    }
}
