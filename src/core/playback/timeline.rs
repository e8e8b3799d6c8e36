use std::collections::VecDeque;

use parking_lot::Mutex;
use tracing::{trace, warn};

use super::{AudioOutput, PlaybackResult};
use crate::core::resample::StreamResampler;

struct Segment {
    start: u64,
    samples: Vec<f32>,
}

impl Segment {
    fn end(&self) -> u64 {
        self.start + self.samples.len() as u64
    }
}

/// Rate conversion for a run of back-to-back chunks at a foreign rate.
///
/// One resampler carries filter state across chunk boundaries, and each
/// converted piece is placed where the previous one ended.
struct Conversion {
    source_rate: u32,
    resampler: StreamResampler,
    /// Timeline sample where the stream started
    anchor: u64,
    /// Timeline sample where the next converted sample goes
    write_at: u64,
    /// Clock time, in seconds, at which a continuing chunk would start
    next_start_at: f64,
}

impl Conversion {
    /// Timeline sample where the stream ends once flushed
    fn end(&self) -> u64 {
        self.anchor + self.resampler.expected_output_len()
    }
}

#[derive(Default)]
struct Timeline {
    /// Samples rendered so far; this is the clock
    consumed: u64,
    /// Segments ordered by start sample
    segments: VecDeque<Segment>,
    conversion: Option<Conversion>,
}

impl Timeline {
    fn insert(&mut self, start: u64, samples: Vec<f32>) {
        if samples.is_empty() {
            return;
        }
        let start = start.max(self.consumed);
        trace!(
            "Timeline schedule: {} samples at sample {}",
            samples.len(),
            start
        );
        let index = self
            .segments
            .iter()
            .rposition(|s| s.start <= start)
            .map_or(0, |i| i + 1);
        self.segments.insert(index, Segment { start, samples });
    }

    /// Emit the tail of the running conversion, if any, and end it.
    fn finish_conversion(&mut self) -> PlaybackResult<()> {
        if let Some(mut conversion) = self.conversion.take() {
            let tail = conversion.resampler.flush()?;
            self.insert(conversion.write_at, tail);
        }
        Ok(())
    }
}

/// Sample-accurate scheduled timeline.
///
/// The clock only advances when [`render`](TimelineOutput::render) is
/// called, so a device callback (or a test) drives time explicitly. Chunks
/// at a different sample rate are resampled to the timeline rate.
pub struct TimelineOutput {
    sample_rate: u32,
    inner: Mutex<Timeline>,
}

impl TimelineOutput {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            inner: Mutex::new(Timeline::default()),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Samples rendered since creation.
    pub fn consumed_samples(&self) -> u64 {
        self.inner.lock().consumed
    }

    /// Seconds of scheduled audio not yet rendered.
    pub fn pending_secs(&self) -> f64 {
        let timeline = self.inner.lock();
        let end = timeline
            .segments
            .iter()
            .map(Segment::end)
            .chain(timeline.conversion.as_ref().map(Conversion::end))
            .max()
            .unwrap_or(timeline.consumed);
        end.saturating_sub(timeline.consumed) as f64 / self.sample_rate as f64
    }

    pub fn is_idle(&self) -> bool {
        let timeline = self.inner.lock();
        timeline.segments.is_empty() && timeline.conversion.is_none()
    }

    /// Fill `out` with the next mono samples and advance the clock.
    ///
    /// Returns how many samples came from scheduled audio; the rest is
    /// silence.
    pub fn render(&self, out: &mut [f32]) -> usize {
        out.fill(0.0);
        let mut timeline = self.inner.lock();
        let window_start = timeline.consumed;
        let window_end = window_start + out.len() as u64;

        // Converted audio is about to run out; release the held tail
        if timeline
            .conversion
            .as_ref()
            .is_some_and(|c| c.write_at < window_end)
            && let Err(e) = timeline.finish_conversion()
        {
            warn!("Dropping unconverted playback tail: {}", e);
        }

        let mut audible = 0;
        for segment in timeline.segments.iter() {
            if segment.start >= window_end {
                break;
            }
            let from = segment.start.max(window_start);
            let to = segment.end().min(window_end);
            if from >= to {
                continue;
            }
            let src = (from - segment.start) as usize;
            let dst = (from - window_start) as usize;
            let len = (to - from) as usize;
            for (o, s) in out[dst..dst + len]
                .iter_mut()
                .zip(&segment.samples[src..src + len])
            {
                *o += *s;
            }
            audible += len;
        }

        timeline.consumed = window_end;
        while timeline
            .segments
            .front()
            .is_some_and(|segment| segment.end() <= window_end)
        {
            timeline.segments.pop_front();
        }
        audible.min(out.len())
    }
}

impl AudioOutput for TimelineOutput {
    fn now(&self) -> f64 {
        self.inner.lock().consumed as f64 / self.sample_rate as f64
    }

    fn schedule(&self, samples: Vec<f32>, sample_rate: u32, start_at: f64) -> PlaybackResult<()> {
        if samples.is_empty() || sample_rate == 0 {
            return Ok(());
        }
        let mut timeline = self.inner.lock();
        let requested = (start_at.max(0.0) * self.sample_rate as f64).round() as u64;

        if sample_rate == self.sample_rate {
            timeline.finish_conversion()?;
            timeline.insert(requested, samples);
            return Ok(());
        }

        let continues = timeline.conversion.as_ref().is_some_and(|c| {
            c.source_rate == sample_rate
                && (start_at - c.next_start_at).abs() * (self.sample_rate as f64) < 1.0
        });
        if !continues {
            timeline.finish_conversion()?;
            let anchor = requested.max(timeline.consumed);
            timeline.conversion = Some(Conversion {
                source_rate: sample_rate,
                resampler: StreamResampler::new(sample_rate, self.sample_rate)?,
                anchor,
                write_at: anchor,
                next_start_at: start_at,
            });
        }

        let Some(conversion) = timeline.conversion.as_mut() else {
            return Ok(());
        };
        let converted = conversion.resampler.process(&samples)?;
        let write_at = conversion.write_at;
        conversion.write_at += converted.len() as u64;
        conversion.next_start_at = start_at + samples.len() as f64 / sample_rate as f64;
        timeline.insert(write_at, converted);
        Ok(())
    }

    fn clear(&self) {
        let mut timeline = self.inner.lock();
        timeline.segments.clear();
        timeline.conversion = None;
    }
}
