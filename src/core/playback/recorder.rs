use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::info;

use super::PlaybackResult;
use crate::core::codec::{decode_pcm16, encode_pcm16};
use crate::core::frame::{AudioFrame, PLAYBACK_SAMPLE_RATE};
use crate::core::resample::StreamResampler;

/// Sample rate of recorded WAV files.
pub const RECORDING_SAMPLE_RATE: u32 = PLAYBACK_SAMPLE_RATE;

/// Writes received assistant audio to a mono 16-bit WAV file.
pub struct WavRecorder {
    path: PathBuf,
    writer: Option<WavWriter<BufWriter<File>>>,
    /// Converter for frames at another rate, kept across frames
    resampler: Option<StreamResampler>,
    samples_written: u64,
}

impl WavRecorder {
    pub fn create(path: impl AsRef<Path>) -> PlaybackResult<Self> {
        let path = path.as_ref().to_path_buf();
        let spec = WavSpec {
            channels: 1,
            sample_rate: RECORDING_SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let writer = WavWriter::create(&path, spec)?;
        info!("Recording assistant audio to {}", path.display());
        Ok(Self {
            path,
            writer: Some(writer),
            resampler: None,
            samples_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }

    /// Append one frame, converting its rate when needed.
    pub fn write_frame(&mut self, frame: &AudioFrame) -> PlaybackResult<()> {
        if self.writer.is_none() {
            return Ok(());
        }

        if frame.sample_rate() == RECORDING_SAMPLE_RATE {
            self.flush_resampler()?;
            return self.write_pcm(frame.data());
        }

        if self
            .resampler
            .as_ref()
            .is_some_and(|r| r.input_rate() != frame.sample_rate())
        {
            self.flush_resampler()?;
        }
        if self.resampler.is_none() {
            self.resampler = Some(StreamResampler::new(
                frame.sample_rate(),
                RECORDING_SAMPLE_RATE,
            )?);
        }
        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(());
        };
        let samples = resampler.process(&decode_pcm16(frame.data()))?;
        self.write_pcm(&encode_pcm16(&samples))
    }

    /// Flush the header and close the file. Later writes are ignored.
    pub fn finalize(&mut self) -> PlaybackResult<()> {
        self.flush_resampler()?;
        if let Some(writer) = self.writer.take() {
            writer.finalize()?;
            info!(
                "Recording finalized: {} ({:.1}s)",
                self.path.display(),
                self.samples_written as f64 / RECORDING_SAMPLE_RATE as f64
            );
        }
        Ok(())
    }

    fn flush_resampler(&mut self) -> PlaybackResult<()> {
        if let Some(mut resampler) = self.resampler.take() {
            let tail = resampler.flush()?;
            self.write_pcm(&encode_pcm16(&tail))?;
        }
        Ok(())
    }

    fn write_pcm(&mut self, pcm: &[u8]) -> PlaybackResult<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        for pair in pcm.chunks_exact(2) {
            writer.write_sample(i16::from_le_bytes([pair[0], pair[1]]))?;
        }
        self.samples_written += (pcm.len() / 2) as u64;
        Ok(())
    }
}

impl Drop for WavRecorder {
    fn drop(&mut self) {
        let _ = self.finalize();
    }
}
