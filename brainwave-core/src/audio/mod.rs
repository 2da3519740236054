//! Microphone capture via the cpal backend.
//!
//! # Design constraints
//!
//! The cpal input callback runs on an OS audio thread at elevated priority.
//! It must not allocate, block on a lock, or perform I/O. The callback here
//! only downmixes into a pre-grown scratch buffer and writes to the SPSC
//! ring producer, whose `push_slice` is lock-free and allocation-free.
//!
//! # Threading note
//!
//! `cpal::Stream` is `!Send` on most platforms (COM on Windows, CoreAudio on
//! macOS). `AudioCapture` must therefore be created and dropped on the same
//! thread; the engine does both inside one `spawn_blocking` closure, which
//! also guarantees the device is released when recording stops or fails.

pub mod device;
pub mod resample;

#[cfg(feature = "audio-cpal")]
use cpal::{
    traits::{DeviceTrait, StreamTrait},
    SampleFormat, SampleRate, Stream, StreamConfig,
};

#[cfg(feature = "audio-cpal")]
use crate::buffering::Producer;
use crate::{
    buffering::AudioProducer,
    error::{BrainwaveError, Result},
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
#[cfg(feature = "audio-cpal")]
use tracing::{error, info, warn};

/// Handle to an active microphone capture stream.
///
/// **Not `Send`** — create and drop this type on the same OS thread.
pub struct AudioCapture {
    /// Kept alive so the stream is not dropped prematurely.
    #[cfg(feature = "audio-cpal")]
    _stream: Stream,
    /// Shared flag — set to `false` to make the callback a no-op.
    running: Arc<AtomicBool>,
    /// Actual capture sample rate reported by the device (Hz).
    pub sample_rate: u32,
}

/// Downmix interleaved frames to mono and push them into the ring.
///
/// `scratch` is reused across callbacks; it only grows, so steady state is
/// allocation-free.
#[cfg(feature = "audio-cpal")]
fn push_downmixed<I>(
    producer: &mut AudioProducer,
    scratch: &mut Vec<f32>,
    samples: I,
    channels: usize,
) where
    I: Iterator<Item = f32>,
{
    scratch.clear();
    if channels <= 1 {
        scratch.extend(samples);
    } else {
        let mut frame_sum = 0f32;
        let mut in_frame = 0usize;
        for s in samples {
            frame_sum += s;
            in_frame += 1;
            if in_frame == channels {
                scratch.push(frame_sum / channels as f32);
                frame_sum = 0.0;
                in_frame = 0;
            }
        }
    }
    let written = producer.push_slice(scratch);
    if written < scratch.len() {
        warn!(
            "ring buffer full: dropped {} captured frames",
            scratch.len() - written
        );
    }
}

impl AudioCapture {
    /// Open an input device by preferred name, otherwise fall back to the
    /// default input device and then the first available one.
    #[cfg(feature = "audio-cpal")]
    pub fn open_with_preference(
        mut producer: AudioProducer,
        running: Arc<AtomicBool>,
        preferred_device_name: Option<&str>,
    ) -> Result<Self> {
        use cpal::traits::HostTrait;

        let host = cpal::default_host();

        let mut selected = None;
        if let Some(preferred) = preferred_device_name {
            match host.input_devices() {
                Ok(mut devices) => {
                    selected = devices
                        .find(|d| d.name().map(|n| n == preferred).unwrap_or(false));
                    if selected.is_none() {
                        warn!("preferred input device '{preferred}' not found, falling back");
                    }
                }
                Err(e) => warn!("failed to list input devices while resolving preference: {e}"),
            }
        }

        let device = if let Some(device) = selected {
            device
        } else if let Some(default) = host.default_input_device() {
            default
        } else {
            let mut devices = host
                .input_devices()
                .map_err(|e| BrainwaveError::AudioDevice(e.to_string()))?;
            devices.next().ok_or(BrainwaveError::NoDefaultInputDevice)?
        };

        info!(
            device = device.name().unwrap_or_default().as_str(),
            "opening input device"
        );

        let supported = device
            .default_input_config()
            .map_err(|e| BrainwaveError::AudioDevice(e.to_string()))?;
        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels() as usize;

        info!(sample_rate, channels, "audio config selected");

        let config = StreamConfig {
            channels: supported.channels(),
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let running_cb = Arc::clone(&running);
        let stream = match supported.sample_format() {
            SampleFormat::F32 => {
                let mut scratch: Vec<f32> = Vec::new();
                device.build_input_stream(
                    &config,
                    move |data: &[f32], _info| {
                        if !running_cb.load(Ordering::Relaxed) {
                            return;
                        }
                        push_downmixed(&mut producer, &mut scratch, data.iter().copied(), channels);
                    },
                    |err| error!("audio stream error: {err}"),
                    None,
                )
            }
            SampleFormat::I16 => {
                let mut scratch: Vec<f32> = Vec::new();
                device.build_input_stream(
                    &config,
                    move |data: &[i16], _info| {
                        if !running_cb.load(Ordering::Relaxed) {
                            return;
                        }
                        push_downmixed(
                            &mut producer,
                            &mut scratch,
                            data.iter().map(|s| *s as f32 / 32_768.0),
                            channels,
                        );
                    },
                    |err| error!("audio stream error: {err}"),
                    None,
                )
            }
            fmt => {
                return Err(BrainwaveError::AudioStream(format!(
                    "unsupported sample format: {fmt:?}"
                )))
            }
        }
        .map_err(|e| BrainwaveError::AudioStream(e.to_string()))?;

        stream
            .play()
            .map_err(|e| BrainwaveError::AudioStream(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            running,
            sample_rate,
        })
    }

    /// Open the system default microphone.
    #[cfg(feature = "audio-cpal")]
    pub fn open_default(producer: AudioProducer, running: Arc<AtomicBool>) -> Result<Self> {
        Self::open_with_preference(producer, running, None)
    }

    /// Stop: signal the callback to no-op on its next invocation.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Stub when the `audio-cpal` feature is disabled.
#[cfg(not(feature = "audio-cpal"))]
impl AudioCapture {
    pub fn open_with_preference(
        _producer: AudioProducer,
        _running: Arc<AtomicBool>,
        _preferred_device_name: Option<&str>,
    ) -> Result<Self> {
        Err(BrainwaveError::AudioStream(
            "compiled without audio-cpal feature".into(),
        ))
    }

    pub fn open_default(producer: AudioProducer, running: Arc<AtomicBool>) -> Result<Self> {
        Self::open_with_preference(producer, running, None)
    }
}
