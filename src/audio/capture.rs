//! Microphone capture via `cpal`.
//!
//! [`AudioChannel`] is the capability the controller arms on every press:
//! [`arm`](AudioChannel::arm) starts a stream that feeds a [`ChunkCallback`]
//! from the audio thread, and the returned [`StreamHandle`] stops it again.
//! [`CpalChannel`] implements it on top of a cpal input device.
//!
//! A fresh cpal stream is built for every arm.  The returned [`CpalStream`]
//! is a RAII guard: disarming (or dropping) it pauses the stream, closes the
//! [`ChunkGate`] and drops the stream, so no chunk reaches the callback once
//! `disarm` has returned.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use thiserror::Error;

use super::{downmix_to_mono, ChunkCallback, ChunkGate, ChunkStatus, SampleChunk, StreamFormat};

// ---------------------------------------------------------------------------
// AudioError
// ---------------------------------------------------------------------------

/// Errors raised while opening, arming or disarming a capture stream.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("no input device matching {0:?}")]
    DeviceNotFound(String),

    #[error("failed to enumerate input devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("failed to query supported input configs: {0}")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[error("device cannot capture {channels} channel(s) at {sample_rate} Hz as i16 or f32")]
    UnsupportedFormat { sample_rate: u32, channels: u16 },

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("failed to stop audio stream: {0}")]
    PauseStream(#[from] cpal::PauseStreamError),

    #[error("audio stream unavailable: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// AudioChannel / StreamHandle
// ---------------------------------------------------------------------------

/// A running stream started by [`AudioChannel::arm`].
pub trait StreamHandle {
    /// Stop the stream.  Blocks until the audio thread can no longer invoke
    /// the chunk callback; this holds even when an error is returned.
    /// Calling it again is a no-op.
    fn disarm(&mut self) -> Result<(), AudioError>;
}

/// Asynchronous sample source.
pub trait AudioChannel {
    type Handle: StreamHandle;

    /// Check that a stream in `format` could be opened.
    fn probe(&self, format: &StreamFormat) -> Result<(), AudioError>;

    /// Start capturing.  `on_chunk` runs on the audio thread, one call at a
    /// time, in capture order, until the handle is disarmed.
    fn arm(
        &mut self,
        format: &StreamFormat,
        on_chunk: ChunkCallback,
    ) -> Result<Self::Handle, AudioError>;
}

// ---------------------------------------------------------------------------
// OverflowDetector
// ---------------------------------------------------------------------------

/// Flags chunks whose capture timestamp lands well after the end of the
/// previous chunk, which means the backend lost input.
#[derive(Debug)]
struct OverflowDetector {
    sample_rate: u32,
    /// Capture offset and length of the previous chunk.
    previous: Option<(Duration, Duration)>,
}

impl OverflowDetector {
    /// Allowed lateness on top of one and a half blocks.
    const TOLERANCE: Duration = Duration::from_millis(2);

    fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            previous: None,
        }
    }

    /// Record a chunk of `frames` captured at offset `at`; returns `true`
    /// when input went missing before it.
    fn observe(&mut self, at: Duration, frames: usize) -> bool {
        let length = if self.sample_rate == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(frames as f64 / self.sample_rate as f64)
        };

        let overflowed = match self.previous {
            Some((prev_at, prev_len)) => {
                let gap = at.saturating_sub(prev_at);
                gap > prev_len + prev_len / 2 + Self::TOLERANCE
            }
            None => false,
        };

        self.previous = Some((at, length));
        overflowed
    }
}

// ---------------------------------------------------------------------------
// CpalStream
// ---------------------------------------------------------------------------

/// Armed cpal stream.  Dropping it disarms.
pub struct CpalStream {
    stream: Option<cpal::Stream>,
    gate: ChunkGate,
}

impl StreamHandle for CpalStream {
    fn disarm(&mut self) -> Result<(), AudioError> {
        let Some(stream) = self.stream.take() else {
            return Ok(());
        };

        let paused = stream.pause();
        self.gate.close();
        drop(stream);

        paused.map_err(AudioError::from)
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        if let Err(e) = self.disarm() {
            log::warn!("audio: disarm on drop failed: {e}");
        }
    }
}

// ---------------------------------------------------------------------------
// CpalChannel
// ---------------------------------------------------------------------------

/// Capture device wrapper built on top of `cpal`.
///
/// # Example
///
/// ```rust,no_run
/// use stethoscope::audio::{AudioChannel, CpalChannel, StreamFormat, StreamHandle};
///
/// let mut channel = CpalChannel::open(None, None).unwrap();
/// let format = StreamFormat::mono_i16(44_100);
/// let mut handle = channel
///     .arm(&format, Box::new(|chunk| println!("{} samples", chunk.samples.len())))
///     .unwrap();
/// std::thread::sleep(std::time::Duration::from_secs(1));
/// handle.disarm().unwrap();
/// ```
pub struct CpalChannel {
    device: cpal::Device,
    device_name: String,
    block_size: Option<u32>,
}

impl CpalChannel {
    /// Open the input device whose name contains `device` (for example
    /// `"hw:1,0"`), or the host default when `device` is `None`.
    ///
    /// `block_size` requests a fixed number of frames per callback.
    pub fn open(device: Option<&str>, block_size: Option<u32>) -> Result<Self, AudioError> {
        let host = cpal::default_host();

        let device = match device {
            None => host.default_input_device().ok_or(AudioError::NoDevice)?,
            Some(wanted) => host
                .input_devices()?
                .find(|d| d.name().map(|n| n.contains(wanted)).unwrap_or(false))
                .ok_or_else(|| AudioError::DeviceNotFound(wanted.to_string()))?,
        };

        let device_name = device.name().unwrap_or_else(|_| "<unnamed>".into());
        log::info!("audio: using input device {device_name:?}");

        Ok(Self {
            device,
            device_name,
            block_size,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Pick the device configuration closest to `format`.
    fn select_config(
        &self,
        format: &StreamFormat,
    ) -> Result<(cpal::StreamConfig, cpal::SampleFormat), AudioError> {
        let rate = cpal::SampleRate(format.sample_rate);

        let range = self
            .device
            .supported_input_configs()?
            .filter(|r| r.min_sample_rate() <= rate && rate <= r.max_sample_rate())
            .filter_map(|r| {
                config_rank(r.channels(), r.sample_format(), format.channels).map(|rank| (rank, r))
            })
            .min_by_key(|(rank, _)| *rank)
            .map(|(_, r)| r)
            .ok_or(AudioError::UnsupportedFormat {
                sample_rate: format.sample_rate,
                channels: format.channels,
            })?;

        let sample_format = range.sample_format();
        let supported = range.with_sample_rate(rate);
        let mut config: cpal::StreamConfig = supported.into();
        if let Some(frames) = self.block_size {
            config.buffer_size = cpal::BufferSize::Fixed(frames);
        }

        Ok((config, sample_format))
    }

    /// Build a paused stream for `format` that delivers through `gate`.
    fn open_stream(
        &self,
        format: &StreamFormat,
        gate: ChunkGate,
    ) -> Result<cpal::Stream, AudioError> {
        let (config, sample_format) = self.select_config(format)?;
        log::debug!(
            "audio: {} Hz, {} channel(s), {:?} on {:?}",
            config.sample_rate.0,
            config.channels,
            sample_format,
            self.device_name
        );

        match sample_format {
            cpal::SampleFormat::I16 => self.build_stream::<i16>(&config, gate),
            cpal::SampleFormat::F32 => self.build_stream::<f32>(&config, gate),
            _ => Err(AudioError::UnsupportedFormat {
                sample_rate: format.sample_rate,
                channels: format.channels,
            }),
        }
    }

    fn build_stream<T>(
        &self,
        config: &cpal::StreamConfig,
        gate: ChunkGate,
    ) -> Result<cpal::Stream, AudioError>
    where
        T: SizedSample + Send + 'static,
        i16: FromSample<T>,
    {
        let channels = config.channels;
        let sample_rate = config.sample_rate.0;
        let device_fault = Arc::new(AtomicBool::new(false));
        let fault_writer = Arc::clone(&device_fault);
        let mut overflow = OverflowDetector::new(sample_rate);
        let mut first_capture: Option<cpal::StreamInstant> = None;

        let stream = self.device.build_input_stream(
            config,
            move |data: &[T], info: &cpal::InputCallbackInfo| {
                let capture = info.timestamp().capture;
                let origin = *first_capture.get_or_insert(capture);
                let frames = data.len() / channels.max(1) as usize;

                let mut status = device_fault
                    .swap(false, Ordering::AcqRel)
                    .then_some(ChunkStatus::DeviceError);
                if let Some(offset) = capture.duration_since(&origin) {
                    if overflow.observe(offset, frames) {
                        status = status.or(Some(ChunkStatus::InputOverflow));
                    }
                }

                let interleaved: Vec<i16> = data.iter().map(|&s| i16::from_sample(s)).collect();
                let samples = if channels == 1 {
                    interleaved
                } else {
                    downmix_to_mono(&interleaved, channels)
                };

                gate.deliver(SampleChunk {
                    samples,
                    sample_rate,
                    status,
                });
            },
            move |err: cpal::StreamError| {
                log::error!("audio: cpal stream error: {err}");
                fault_writer.store(true, Ordering::Release);
            },
            None,
        )?;

        Ok(stream)
    }
}

impl AudioChannel for CpalChannel {
    type Handle = CpalStream;

    fn probe(&self, format: &StreamFormat) -> Result<(), AudioError> {
        // Build (without starting) a stream that drops everything, then
        // tear it down again.
        let gate = ChunkGate::open(Box::new(|_: SampleChunk| {}));
        let stream = self.open_stream(format, gate.clone())?;
        gate.close();
        drop(stream);
        Ok(())
    }

    fn arm(
        &mut self,
        format: &StreamFormat,
        on_chunk: ChunkCallback,
    ) -> Result<CpalStream, AudioError> {
        let gate = ChunkGate::open(on_chunk);
        let stream = self.open_stream(format, gate.clone())?;

        // From here on the handle owns the stream, so a failed play still
        // closes the gate on drop.
        let handle = CpalStream {
            stream: Some(stream),
            gate,
        };
        if let Some(stream) = handle.stream.as_ref() {
            stream.play()?;
        }

        log::debug!("audio: stream armed on {:?}", self.device_name);
        Ok(handle)
    }
}

/// Preference order for a supported configuration: the requested channel
/// count first, then native `i16` over `f32`, then fewer channels.  `None`
/// for sample formats the adapter cannot convert.
fn config_rank(
    channels: u16,
    sample_format: cpal::SampleFormat,
    wanted_channels: u16,
) -> Option<(u8, u8, u16)> {
    let format_rank = match sample_format {
        cpal::SampleFormat::I16 => 0,
        cpal::SampleFormat::F32 => 1,
        _ => return None,
    };
    let channel_rank = u8::from(channels != wanted_channels);
    Some((channel_rank, format_rank, channels))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
