//! Audio capture via cpal.
//!
//! Opens the default (or named) input device, captures at its native rate,
//! down-mixes to mono and resamples to the processing rate, then hands full
//! chunks to the analysis loop through the SPSC queue. The callback does no
//! analysis work.

use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use tracing::{error, info, warn};

use super::chunk::{resample_linear, to_mono};
use super::handoff::{chunk_queue, ChunkProducer};
use crate::error::CaptureError;

/// List available input device names.
pub fn list_devices() -> Vec<String> {
    let host = cpal::default_host();
    let mut names = Vec::new();
    if let Ok(devices) = host.input_devices() {
        for dev in devices {
            if let Ok(name) = dev.name() {
                names.push(name);
            }
        }
    }
    names
}

/// Resolved info about the audio input we will use.
struct CaptureConfig {
    device: cpal::Device,
    stream_config: StreamConfig,
    native_rate: u32,
}

fn resolve_device(device_name: Option<&str>) -> Result<CaptureConfig, CaptureError> {
    let host = cpal::default_host();

    let device = if let Some(name) = device_name {
        host.input_devices()
            .map_err(|e| CaptureError::Stream(format!("Failed to enumerate input devices: {e}")))?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| CaptureError::DeviceNotFound(name.to_string()))?
    } else {
        host.default_input_device()
            .ok_or(CaptureError::NoDefaultDevice)?
    };

    let dev_name = device.name().unwrap_or_else(|_| "unknown".into());
    info!(device = %dev_name, "Selected input device");

    let default_config = device
        .default_input_config()
        .map_err(|e| CaptureError::Stream(format!("Failed to get default input config: {e}")))?;

    let native_rate = default_config.sample_rate().0;
    let channels = default_config.channels();

    let stream_config = StreamConfig {
        channels,
        sample_rate: cpal::SampleRate(native_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    info!(native_rate, channels, "Input device config");

    Ok(CaptureConfig {
        device,
        stream_config,
        native_rate,
    })
}

/// Start audio capture. Returns the cpal `Stream`, which must be kept alive;
/// dropping it stops and closes the device.
pub fn start_capture(
    mut producer: ChunkProducer,
    device_name: Option<&str>,
    target_rate: u32,
    chunk_len: usize,
) -> Result<Stream, CaptureError> {
    let cfg = resolve_device(device_name)?;
    let native_rate = cfg.native_rate;
    let channels = cfg.stream_config.channels;
    let needs_resample = native_rate != target_rate;
    let needs_downmix = channels > 1;

    let mut chunk_buf: Vec<f32> = Vec::with_capacity(chunk_len * 2);

    let stream = cfg
        .device
        .build_input_stream(
            &cfg.stream_config,
            move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                let mono = if needs_downmix {
                    to_mono(data, channels)
                } else {
                    data.to_vec()
                };

                let resampled = if needs_resample {
                    resample_linear(&mono, native_rate, target_rate)
                } else {
                    mono
                };

                chunk_buf.extend_from_slice(&resampled);
                while chunk_buf.len() >= chunk_len {
                    let chunk: Vec<f32> = chunk_buf.drain(..chunk_len).collect();
                    // A full queue drops the chunk; the consumer reports drops.
                    producer.push(chunk);
                }
            },
            move |err| {
                error!("Audio input stream error: {}", err);
            },
            None,
        )
        .map_err(|e| CaptureError::Stream(format!("Failed to build input stream: {e}")))?;

    stream
        .play()
        .map_err(|e| CaptureError::Stream(format!("Failed to start input stream: {e}")))?;

    info!(target_rate, chunk_len, "Audio capture started");

    Ok(stream)
}

/// Capture a fixed-length recording from the microphone, blocking until
/// `duration` of audio has arrived.
pub fn record_for(
    duration: Duration,
    device_name: Option<&str>,
    sample_rate: u32,
    chunk_len: usize,
) -> Result<Vec<f32>, CaptureError> {
    let wanted = (duration.as_secs_f64() * sample_rate as f64).round() as usize;
    let (producer, mut consumer) = chunk_queue(None);
    let stream = start_capture(producer, device_name, sample_rate, chunk_len)?;

    let mut audio = Vec::with_capacity(wanted);
    // Generous deadline so a stalled device cannot hang the caller.
    let deadline = Instant::now() + duration * 2 + Duration::from_secs(2);
    while audio.len() < wanted {
        match consumer.pop() {
            Some(chunk) => audio.extend_from_slice(&chunk.samples),
            None => {
                if Instant::now() > deadline {
                    warn!(
                        captured = audio.len(),
                        wanted, "Recording deadline reached before enough audio arrived"
                    );
                    break;
                }
                std::thread::sleep(Duration::from_millis(20));
            }
        }
    }
    drop(stream);

    audio.truncate(wanted);
    info!(
        samples = audio.len(),
        duration_secs = format!("{:.2}", audio.len() as f64 / sample_rate as f64),
        "Recording finished"
    );
    Ok(audio)
}
