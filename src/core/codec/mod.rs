//! PCM16 and portable-text codec.
//!
//! Pure conversions used on both sides of a live session:
//!
//! - `f32` samples in `[-1, 1]` <-> 16-bit signed little-endian PCM
//! - binary buffers <-> padded standard base64 ("portable text"), the
//!   encoding used to carry audio inside JSON messages
//!
//! # Quantization
//!
//! Encoding clamps to `[-1, 1]`, scales negative samples by 32768 and
//! non-negative samples by 32767, matching the asymmetric range of `i16`,
//! and rounds to the nearest step. Decoding divides by 32768. A round trip
//! stays within one quantization step (1/32768) for negative samples and
//! for samples up to 0.5; the 32767 scale adds up to another half step
//! towards full scale, so the overall bound is 1.5 steps.

use base64::prelude::*;
use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Size in bytes of one PCM16 sample.
pub const PCM16_SAMPLE_BYTES: usize = 2;

/// One quantization step of the PCM16 decoder.
pub const PCM16_QUANTUM: f32 = 1.0 / 32768.0;

/// Errors produced by the codec.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The portable-text payload is not valid base64
    #[error("Malformed encoding: {0}")]
    MalformedEncoding(String),
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

// =============================================================================
// PCM16
// =============================================================================

/// Encode floating-point samples as 16-bit signed little-endian PCM.
pub fn encode_pcm16(samples: &[f32]) -> Bytes {
    let mut buf = BytesMut::with_capacity(samples.len() * PCM16_SAMPLE_BYTES);
    for &sample in samples {
        buf.put_i16_le(quantize(sample));
    }
    buf.freeze()
}

/// Decode 16-bit signed little-endian PCM into floating-point samples.
///
/// A trailing odd byte is ignored.
pub fn decode_pcm16(buffer: &[u8]) -> Vec<f32> {
    buffer
        .chunks_exact(PCM16_SAMPLE_BYTES)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect()
}

#[inline]
fn quantize(sample: f32) -> i16 {
    // NaN clamps to NaN; treat it as silence
    let s = if sample.is_nan() {
        0.0
    } else {
        sample.clamp(-1.0, 1.0)
    };
    if s < 0.0 {
        (s * 32768.0).round() as i16
    } else {
        (s * 32767.0).round() as i16
    }
}

/// Number of whole PCM16 samples in a buffer of `byte_len` bytes.
#[inline]
pub fn pcm16_sample_count(byte_len: usize) -> usize {
    byte_len / PCM16_SAMPLE_BYTES
}

/// Playback duration in seconds of a mono PCM16 buffer.
pub fn pcm16_duration(byte_len: usize, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    pcm16_sample_count(byte_len) as f64 / sample_rate as f64
}

/// Read the `rate=` parameter of a PCM mime type such as `audio/pcm;rate=24000`.
pub fn parse_pcm_rate(mime_type: &str) -> Option<u32> {
    mime_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("rate"))
        .and_then(|(_, value)| value.trim().parse().ok())
}

// =============================================================================
// Portable text
// =============================================================================

/// Encode a binary buffer as padded standard base64.
pub fn to_portable_text(buffer: &[u8]) -> String {
    BASE64_STANDARD.encode(buffer)
}

/// Decode padded standard base64, rejecting malformed input.
pub fn from_portable_text(text: &str) -> CodecResult<Vec<u8>> {
    BASE64_STANDARD
        .decode(text)
        .map_err(|e| CodecError::MalformedEncoding(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_scaling_is_asymmetric() {
        let bytes = encode_pcm16(&[1.0, -1.0, 0.0]);
        let decoded: Vec<i16> = bytes
            .chunks_exact(2)
            .map(|p| i16::from_le_bytes([p[0], p[1]]))
            .collect();
        assert_eq!(decoded, vec![32767, -32768, 0]);
    }

    #[test]
    fn test_encode_clamps_out_of_range() {
        let bytes = encode_pcm16(&[2.5, -7.0]);
        assert_eq!(&bytes[..], &[0xFF, 0x7F, 0x00, 0x80]);
    }

    #[test]
    fn test_encode_nan_is_silence() {
        let bytes = encode_pcm16(&[f32::NAN]);
        assert_eq!(&bytes[..], &[0, 0]);
    }

    #[test]
    fn test_encode_is_little_endian() {
        // 0.25 * 32767 = 8191.75, rounds to 8192 = 0x2000
        let bytes = encode_pcm16(&[0.25]);
        assert_eq!(&bytes[..], &[0x00, 0x20]);
    }

    #[test]
    fn test_encode_rounds_to_nearest_step() {
        // 0.043 * 32767 = 1408.98; truncation would give 1408
        let bytes = encode_pcm16(&[0.043, -0.043]);
        let decoded: Vec<i16> = bytes
            .chunks_exact(2)
            .map(|p| i16::from_le_bytes([p[0], p[1]]))
            .collect();
        assert_eq!(decoded, vec![1409, -1409]);
    }

    #[test]
    fn test_round_trip_within_one_quantum() {
        // f32 arithmetic adds a sliver on top of the quantization error
        let slack = 0.01 * PCM16_QUANTUM;
        let input: Vec<f32> = (0..=2000).map(|i| -1.0 + i as f32 / 1000.0).collect();
        let output = decode_pcm16(&encode_pcm16(&input));
        assert_eq!(input.len(), output.len());
        for (x, y) in input.iter().zip(output.iter()) {
            let error = (x - y).abs();
            if *x <= 0.5 {
                assert!(error <= PCM16_QUANTUM + slack, "sample {x} decoded to {y}");
            } else {
                assert!(error < 1.5 * PCM16_QUANTUM, "sample {x} decoded to {y}");
            }
        }
    }

    #[test]
    fn test_decode_ignores_trailing_byte() {
        let samples = decode_pcm16(&[0x00, 0x40, 0x7F]);
        assert_eq!(samples, vec![0.5]);
    }

    #[test]
    fn test_duration_and_count() {
        assert_eq!(pcm16_sample_count(4800), 2400);
        assert!((pcm16_duration(48000, 24000) - 1.0).abs() < f64::EPSILON);
        assert_eq!(pcm16_duration(100, 0), 0.0);
    }

    #[test]
    fn test_parse_pcm_rate() {
        assert_eq!(parse_pcm_rate("audio/pcm;rate=24000"), Some(24000));
        assert_eq!(parse_pcm_rate("audio/pcm; Rate = 16000"), Some(16000));
        assert_eq!(parse_pcm_rate("audio/pcm"), None);
        assert_eq!(parse_pcm_rate("audio/pcm;rate=abc"), None);
    }

    #[test]
    fn test_portable_text_padding() {
        assert_eq!(to_portable_text(&[0, 0]), "AAA=");
        assert_eq!(to_portable_text(&[1, 2, 3]), "AQID");
        assert_eq!(from_portable_text("AAA=").unwrap(), vec![0, 0]);
    }

    #[test]
    fn test_portable_text_round_trip() {
        let buffers: [&[u8]; 4] = [&[], &[0xFF], &[0, 1, 2, 3, 4], &[0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x01]];
        for buf in buffers {
            assert_eq!(from_portable_text(&to_portable_text(buf)).unwrap(), buf);
        }
    }

    #[test]
    fn test_portable_text_rejects_malformed() {
        for bad in ["A", "!!!!", "AAA", "AA=A"] {
            match from_portable_text(bad) {
                Err(CodecError::MalformedEncoding(_)) => {}
                other => panic!("expected MalformedEncoding for {bad:?}, got {other:?}"),
            }
        }
    }
}
