//! Capture pipeline tests
//!
//! Scripted device blocks through the full pipeline: device thread, raw
//! queue, worker task, resampler and frame channel.

mod fixtures;

use std::time::Duration;

use fixtures::*;
use live_voice::core::capture::{
    CaptureConfig, CaptureError, CapturePipeline, DeviceFormat, ScriptedInput,
};
use live_voice::core::codec::PCM16_QUANTUM;
use live_voice::core::frame::AudioFrame;
use tokio::sync::mpsc;

async fn collect_frames(rx: &mut mpsc::Receiver<AudioFrame>) -> Vec<AudioFrame> {
    let mut frames = Vec::new();
    while let Ok(Some(frame)) = tokio::time::timeout(Duration::from_secs(3), rx.recv()).await {
        frames.push(frame);
    }
    frames
}

#[tokio::test]
async fn test_native_rate_frames_preserve_signal() {
    let signal = sine_wave(10_000, 440.0, CAPTURE_RATE, 0.5);
    let device = ScriptedInput::new(
        DeviceFormat::new(CAPTURE_RATE, 1),
        device_blocks(&signal, 1000),
    );
    let mut capture = CapturePipeline::new(Box::new(device), CaptureConfig::default());

    let mut rx = capture.start().unwrap();
    let frames = collect_frames(&mut rx).await;

    // 10000 samples make two full 4096-sample frames; the rest stays pending
    assert_eq!(frames.len(), 2);
    let decoded: Vec<f32> = frames.iter().flat_map(|f| f.to_samples()).collect();
    assert_eq!(decoded.len(), 8192);
    for (out, input) in decoded.iter().zip(&signal) {
        assert!((out - input).abs() <= PCM16_QUANTUM * 2.0);
    }
    for frame in &frames {
        assert_eq!(frame.sample_rate(), 16000);
        assert_eq!(frame.mime_type(), "audio/pcm;rate=16000");
    }
    assert_eq!(capture.stats().frames_emitted, 2);
}

#[tokio::test]
async fn test_stereo_48k_is_resampled_to_16k() {
    // One second of stereo speech in 100 ms device blocks
    let mono = speech_pattern(DEVICE_RATE as usize, DEVICE_RATE);
    let signal = interleave(&mono, 2);
    let device = ScriptedInput::new(DeviceFormat::new(DEVICE_RATE, 2), device_blocks(&signal, 9600))
        .with_interval(Duration::from_millis(2));
    let mut capture = CapturePipeline::new(Box::new(device), CaptureConfig::with_block_size(2048));

    let mut rx = capture.start().unwrap();
    let frames = collect_frames(&mut rx).await;

    // About 16000 output samples, minus resampler delay
    assert!(frames.len() >= 6 && frames.len() <= 8, "got {} frames", frames.len());
    for frame in &frames {
        assert_eq!(frame.sample_count(), 2048);
        assert!((frame.duration_secs() - 0.128).abs() < 1e-9);
    }

    let decoded: Vec<f32> = frames.iter().flat_map(|f| f.to_samples()).collect();
    let ratio = rms(&decoded) / rms(&mono[..decoded.len() * 3]);
    assert!((0.8..1.2).contains(&ratio), "rms ratio {ratio}");
}

#[tokio::test]
async fn test_unavailable_device() {
    let mut capture =
        CapturePipeline::new(Box::new(ScriptedInput::unavailable()), CaptureConfig::default());
    assert!(matches!(
        capture.start(),
        Err(CaptureError::DeviceUnavailable(_))
    ));
    assert!(!capture.is_running());
}

#[tokio::test]
async fn test_stop_closes_frame_channel() {
    let signal = vec![0.25; 4096 * 50];
    let device = ScriptedInput::new(
        DeviceFormat::new(CAPTURE_RATE, 1),
        device_blocks(&signal, 4096),
    )
    .with_interval(Duration::from_millis(20));
    let mut capture = CapturePipeline::new(Box::new(device), CaptureConfig::default());

    let mut rx = capture.start().unwrap();
    let first = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.sample_count(), 4096);

    capture.stop();
    assert!(!capture.is_running());
    capture.stop();

    // Frames already queued may still drain, then the channel ends
    let remaining = collect_frames(&mut rx).await;
    assert!(remaining.len() < 49);
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_dropped_receiver_stops_worker() {
    let signal = vec![0.1; 2048 * 20];
    let device = ScriptedInput::new(
        DeviceFormat::new(CAPTURE_RATE, 1),
        device_blocks(&signal, 2048),
    )
    .with_interval(Duration::from_millis(5));
    let mut capture = CapturePipeline::new(Box::new(device), CaptureConfig::with_block_size(2048));

    let rx = capture.start().unwrap();
    drop(rx);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(capture.stats().frames_emitted <= 1);
    capture.stop();
}

#[tokio::test]
async fn test_device_lost_mid_stream_is_reported() {
    let signal = vec![0.2; 2048 * 10];
    let device = ScriptedInput::new(
        DeviceFormat::new(CAPTURE_RATE, 1),
        device_blocks(&signal, 2048),
    )
    .with_interval(Duration::from_millis(2))
    .fail_after(3, "device unplugged");
    let mut capture = CapturePipeline::new(Box::new(device), CaptureConfig::with_block_size(2048));

    let mut rx = capture.start().unwrap();
    let frames = collect_frames(&mut rx).await;

    // Blocks delivered before the failure still come through
    assert_eq!(frames.len(), 3);
    assert!(rx.recv().await.is_none());
    assert_eq!(
        capture.failure(),
        Some(CaptureError::DeviceUnavailable("device unplugged".to_string()))
    );
    assert!(!capture.is_running());

    // The failed device is released and a later stop is a no-op
    capture.stop();
    assert!(!capture.is_running());
}
