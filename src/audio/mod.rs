//! Audio side of the recorder: microphone capture → chunk gate → session.
//!
//! # Pipeline
//!
//! ```text
//! Microphone → cpal callback → i16 + downmix → SampleChunk
//!           → ChunkGate (closed by disarm) → CaptureSession::push
//!           → CaptureSession::finalize → CaptureBuffer → Envelope
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stethoscope::audio::{
//!     AudioChannel, CaptureSession, CpalChannel, StreamFormat, StreamHandle,
//! };
//!
//! let format = StreamFormat::mono_i16(44_100);
//! let mut channel = CpalChannel::open(None, None).unwrap();
//! let session = Arc::new(CaptureSession::begin(format.sample_rate, None));
//!
//! let sink = Arc::clone(&session);
//! let mut handle = channel
//!     .arm(&format, Box::new(move |chunk| { sink.push(chunk); }))
//!     .unwrap();
//! std::thread::sleep(std::time::Duration::from_secs(2));
//! handle.disarm().unwrap();
//!
//! let capture = session.finalize().unwrap();
//! println!("empty: {}", capture.is_empty());
//! ```

pub mod capture;
pub mod chunk;
pub mod gate;
pub mod mix;
pub mod session;
pub mod waveform;

pub use capture::{AudioChannel, AudioError, CpalChannel, CpalStream, StreamHandle};
pub use chunk::{ChunkStatus, SampleChunk, StreamFormat};
pub use gate::{ChunkCallback, ChunkGate};
pub use mix::downmix_to_mono;
pub use session::{Capture, CaptureBuffer, CaptureSession, SessionError};
pub use waveform::Envelope;
