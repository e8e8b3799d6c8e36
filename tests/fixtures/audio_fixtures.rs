//! Audio Test Fixtures
//!
//! Programmatically generated audio so tests need no external files.
//!
//! Formats:
//! - Device blocks: interleaved `f32` at any rate and channel count
//! - Capture frames: 16 kHz mono PCM16
//! - Model audio: 24 kHz mono PCM16, base64 inside `serverContent` JSON

use std::f32::consts::PI;

use base64::prelude::*;
use serde_json::{Value, json};

/// Capture rate sent to the service
pub const CAPTURE_RATE: u32 = 16000;

/// Rate of model audio
pub const MODEL_RATE: u32 = 24000;

/// A common device rate that forces resampling
pub const DEVICE_RATE: u32 = 48000;

/// Generate a mono sine wave in `[-amplitude, amplitude]`
pub fn sine_wave(samples: usize, frequency: f32, sample_rate: u32, amplitude: f32) -> Vec<f32> {
    let angular = 2.0 * PI * frequency / sample_rate as f32;
    (0..samples)
        .map(|i| (angular * i as f32).sin() * amplitude)
        .collect()
}

/// Generate speech-like audio: a tone with a slow amplitude envelope
pub fn speech_pattern(samples: usize, sample_rate: u32) -> Vec<f32> {
    let envelope_rate = 4.0 / sample_rate as f32;
    sine_wave(samples, 220.0, sample_rate, 0.6)
        .into_iter()
        .enumerate()
        .map(|(i, s)| s * (0.5 + 0.5 * (2.0 * PI * envelope_rate * i as f32).sin()))
        .collect()
}

/// Duplicate a mono signal into `channels` interleaved channels
pub fn interleave(mono: &[f32], channels: usize) -> Vec<f32> {
    mono.iter()
        .flat_map(|&s| std::iter::repeat_n(s, channels))
        .collect()
}

/// Split a signal into device-sized blocks
pub fn device_blocks(signal: &[f32], block_len: usize) -> Vec<Vec<f32>> {
    signal.chunks(block_len).map(|c| c.to_vec()).collect()
}

/// Encode `f32` samples as little-endian PCM16
pub fn pcm16_bytes(samples: &[f32]) -> Vec<u8> {
    samples
        .iter()
        .flat_map(|&s| {
            let s = s.clamp(-1.0, 1.0);
            let v = if s < 0.0 { s * 32768.0 } else { s * 32767.0 };
            (v.round() as i16).to_le_bytes()
        })
        .collect()
}

/// Base64 of `samples_count` samples of 24 kHz silence
pub fn silence_base64(samples_count: usize) -> String {
    BASE64_STANDARD.encode(vec![0u8; samples_count * 2])
}

/// `serverContent` message carrying one audio part
pub fn audio_content(data_base64: &str, turn_complete: bool) -> Value {
    json!({
        "serverContent": {
            "modelTurn": {
                "parts": [
                    {"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": data_base64}}
                ]
            },
            "turnComplete": turn_complete
        }
    })
}

/// `serverContent` message carrying one text part
pub fn text_content(text: &str) -> Value {
    json!({
        "serverContent": {
            "modelTurn": {"parts": [{"text": text}]}
        }
    })
}

/// `toolCall` message with one function call
pub fn tool_call(id: &str, name: &str, args: Value) -> Value {
    json!({
        "toolCall": {
            "functionCalls": [{"id": id, "name": name, "args": args}]
        }
    })
}

/// Decode the audio payload of an outbound `realtime_input` message
pub fn realtime_input_samples(message: &Value) -> Option<(String, usize)> {
    let chunk = message.get("realtime_input")?.get("media_chunks")?.get(0)?;
    let mime = chunk.get("mime_type")?.as_str()?.to_string();
    let data = BASE64_STANDARD.decode(chunk.get("data")?.as_str()?).ok()?;
    Some((mime, data.len() / 2))
}

/// Root mean square of a signal
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sine_wave_amplitude() {
        let wave = sine_wave(CAPTURE_RATE as usize, 440.0, CAPTURE_RATE, 0.5);
        let peak = wave.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak <= 0.5 + f32::EPSILON);
        assert!(peak > 0.49);
    }

    #[test]
    fn test_interleave() {
        assert_eq!(interleave(&[0.1, 0.2], 2), vec![0.1, 0.1, 0.2, 0.2]);
    }

    #[test]
    fn test_pcm16_bytes() {
        assert_eq!(pcm16_bytes(&[0.0, -1.0]), vec![0, 0, 0, 0x80]);
    }

    #[test]
    fn test_silence_base64() {
        assert_eq!(silence_base64(2), "AAAAAA==");
    }

    #[test]
    fn test_realtime_input_samples() {
        let message = json!({"realtime_input": {"media_chunks": [
            {"mime_type": "audio/pcm;rate=16000", "data": "AAAAAA=="}
        ]}});
        assert_eq!(
            realtime_input_samples(&message),
            Some(("audio/pcm;rate=16000".to_string(), 2))
        );
    }
}
