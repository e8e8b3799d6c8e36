//! Microphone input through the system audio host.
//!
//! `cpal::Stream` is not `Send`, so the stream is built, played and dropped
//! on a dedicated thread that lives for as long as the device is open.

use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, StreamConfig};
use tracing::{debug, info, warn};

use super::device::{DeviceFormat, InputDevice, RawSink};
use super::{CaptureError, CaptureResult};

/// List the names of available input devices.
pub fn list_input_devices() -> CaptureResult<Vec<String>> {
    let host = cpal::default_host();
    let devices: Vec<String> = host
        .input_devices()
        .map_err(|e| CaptureError::DeviceUnavailable(format!("Failed to enumerate devices: {e}")))?
        .filter_map(|device| device.name().ok())
        .collect();
    debug!("Found {} input devices", devices.len());
    Ok(devices)
}

fn find_device(device_name: Option<&str>) -> CaptureResult<Device> {
    let host = cpal::default_host();
    if let Some(name) = device_name {
        let mut devices = host.input_devices().map_err(|e| {
            CaptureError::DeviceUnavailable(format!("Failed to enumerate devices: {e}"))
        })?;
        if let Some(device) = devices.find(|d| d.name().ok().as_deref() == Some(name)) {
            return Ok(device);
        }
        warn!(
            "Requested input device '{}' not found, falling back to default device",
            name
        );
    }
    host.default_input_device()
        .ok_or_else(|| CaptureError::DeviceUnavailable("No default input device found".to_string()))
}

fn build_stream(device: &Device, sink: RawSink) -> CaptureResult<(cpal::Stream, DeviceFormat)> {
    let supported = device
        .default_input_config()
        .map_err(|e| CaptureError::DeviceUnavailable(format!("Failed to get default config: {e}")))?;
    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.config();
    let format = DeviceFormat::new(config.sample_rate.0, config.channels);

    let failure = sink.clone();
    let err_fn = move |err: cpal::StreamError| {
        failure.fail(CaptureError::DeviceUnavailable(format!(
            "Audio input stream error: {err}"
        )));
    };

    let stream = match sample_format {
        SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                sink.push(data.to_vec());
            },
            err_fn,
            None,
        ),
        SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                sink.push(data.iter().map(|&s| s as f32 / 32768.0).collect());
            },
            err_fn,
            None,
        ),
        SampleFormat::U16 => device.build_input_stream(
            &config,
            move |data: &[u16], _: &cpal::InputCallbackInfo| {
                sink.push(
                    data.iter()
                        .map(|&s| (s as f32 - 32768.0) / 32768.0)
                        .collect(),
                );
            },
            err_fn,
            None,
        ),
        other => {
            return Err(CaptureError::DeviceUnavailable(format!(
                "Unsupported sample format: {other:?}"
            )));
        }
    }
    .map_err(|e| CaptureError::DeviceUnavailable(format!("Failed to build stream: {e}")))?;

    stream
        .play()
        .map_err(|e| CaptureError::DeviceUnavailable(format!("Failed to start stream: {e}")))?;

    Ok((stream, format))
}

/// Microphone capture device.
pub struct CpalInput {
    device_name: Option<String>,
    display_name: String,
    stop_tx: Option<std_mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl CpalInput {
    /// Use the named device, or the host default when `None`.
    pub fn new(device_name: Option<String>) -> Self {
        let display_name = device_name.clone().unwrap_or_else(|| "default".to_string());
        Self {
            device_name,
            display_name,
            stop_tx: None,
            thread: None,
        }
    }
}

impl InputDevice for CpalInput {
    fn name(&self) -> &str {
        &self.display_name
    }

    fn open(&mut self, sink: RawSink) -> CaptureResult<DeviceFormat> {
        if self.thread.is_some() {
            return Err(CaptureError::DeviceUnavailable(format!(
                "device '{}' is already open",
                self.display_name
            )));
        }

        let (ready_tx, ready_rx) = std_mpsc::channel::<CaptureResult<(String, DeviceFormat)>>();
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();
        let device_name = self.device_name.clone();

        let thread = std::thread::Builder::new()
            .name("live-voice-capture".to_string())
            .spawn(move || {
                let opened = find_device(device_name.as_deref()).and_then(|device| {
                    let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
                    build_stream(&device, sink).map(|(stream, format)| (name, format, stream))
                });
                match opened {
                    Ok((name, format, stream)) => {
                        let _ = ready_tx.send(Ok((name, format)));
                        // Hold the stream until stop is requested or the owner goes away
                        let _ = stop_rx.recv();
                        drop(stream);
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                    }
                }
            })
            .map_err(|e| CaptureError::DeviceUnavailable(format!("Failed to spawn thread: {e}")))?;

        let ready = ready_rx.recv().map_err(|_| {
            CaptureError::DeviceUnavailable("capture thread exited during setup".to_string())
        });
        match ready.and_then(|result| result) {
            Ok((name, format)) => {
                info!(
                    "Opened input device '{}' ({}Hz, {} channels)",
                    name, format.sample_rate, format.channels
                );
                self.display_name = name;
                self.stop_tx = Some(stop_tx);
                self.thread = Some(thread);
                Ok(format)
            }
            Err(e) => {
                let _ = thread.join();
                Err(e)
            }
        }
    }

    fn close(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
            debug!("Closed input device '{}'", self.display_name);
        }
    }
}

impl Drop for CpalInput {
    fn drop(&mut self) {
        self.close();
    }
}
