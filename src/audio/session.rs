//! One press-to-release recording attempt.
//!
//! [`CaptureSession`] is shared between the controller thread and the audio
//! thread (behind an `Arc`).  The audio thread calls
//! [`push`](CaptureSession::push) for every delivered chunk; the controller
//! calls [`finalize`](CaptureSession::finalize) once the stream has been
//! disarmed.  Both go through the same mutex, so finalize never observes a
//! half-appended chunk.
//!
//! ```rust
//! use stethoscope::audio::{Capture, CaptureSession, SampleChunk};
//!
//! let session = CaptureSession::begin(8_000, None);
//! session.push(SampleChunk::new(vec![1, 2], 8_000));
//! session.push(SampleChunk::new(vec![3], 8_000));
//!
//! match session.finalize().unwrap() {
//!     Capture::Recorded(buffer) => assert_eq!(buffer.samples(), &[1, 2, 3]),
//!     Capture::Empty => unreachable!(),
//! }
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use thiserror::Error;

use super::SampleChunk;

// ---------------------------------------------------------------------------
// SessionError
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// `finalize` was called on a session that is no longer recording.
    #[error("capture session already finalized")]
    InvalidState,
}

// ---------------------------------------------------------------------------
// CaptureBuffer / Capture
// ---------------------------------------------------------------------------

/// Flat, immutable result of a finished session.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureBuffer {
    samples: Vec<i16>,
    sample_rate: u32,
    chunk_count: usize,
    flagged_chunks: usize,
    truncated: bool,
}

impl CaptureBuffer {
    /// Build a buffer directly from samples (single chunk, no flags).
    pub fn from_samples(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            chunk_count: 1,
            flagged_chunks: 0,
            truncated: false,
        }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of chunks that were concatenated.
    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// Chunks that arrived with a status flag.
    pub fn flagged_chunks(&self) -> usize {
        self.flagged_chunks
    }

    /// `true` when the session hit its sample cap and dropped audio.
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Largest absolute sample value.
    pub fn peak(&self) -> u16 {
        self.samples
            .iter()
            .map(|s| s.unsigned_abs())
            .max()
            .unwrap_or(0)
    }
}

/// Outcome of [`CaptureSession::finalize`].
#[derive(Debug, Clone, PartialEq)]
pub enum Capture {
    /// No chunk was delivered at all.
    Empty,
    /// At least one chunk was delivered (it may have held zero samples).
    Recorded(CaptureBuffer),
}

impl Capture {
    pub fn is_empty(&self) -> bool {
        matches!(self, Capture::Empty)
    }
}

// ---------------------------------------------------------------------------
// CaptureSession
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Recording,
    Finalized,
}

#[derive(Debug)]
struct Chunks {
    phase: Phase,
    chunks: Vec<SampleChunk>,
    samples: usize,
    flagged: usize,
    rejected: usize,
    truncated: bool,
}

/// Ordered accumulation of delivered chunks for one recording.
#[derive(Debug)]
pub struct CaptureSession {
    inner: Mutex<Chunks>,
    started: Instant,
    sample_rate: u32,
    max_samples: Option<usize>,
}

impl CaptureSession {
    /// Start an empty session.  `max_samples` caps the buffer; `None` keeps
    /// everything for as long as the button is held.
    pub fn begin(sample_rate: u32, max_samples: Option<usize>) -> Self {
        Self {
            inner: Mutex::new(Chunks {
                phase: Phase::Recording,
                chunks: Vec::new(),
                samples: 0,
                flagged: 0,
                rejected: 0,
                truncated: false,
            }),
            started: Instant::now(),
            sample_rate,
            max_samples,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Chunks> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `chunk` after every previously pushed chunk.
    ///
    /// Returns `false` when the chunk was not stored: the session is already
    /// finalized, or the sample cap was reached before this chunk.  A chunk
    /// straddling the cap is cut at the cap.
    pub fn push(&self, mut chunk: SampleChunk) -> bool {
        let mut inner = self.lock();

        if inner.phase != Phase::Recording {
            inner.rejected += 1;
            return false;
        }

        if let Some(max) = self.max_samples {
            let remaining = max.saturating_sub(inner.samples);
            if chunk.samples.len() > remaining {
                if !inner.truncated {
                    log::warn!(
                        "session: sample cap of {max} reached, dropping further audio"
                    );
                }
                inner.truncated = true;
                if remaining == 0 {
                    return false;
                }
                chunk.samples.truncate(remaining);
            }
        }

        if chunk.status.is_some() {
            inner.flagged += 1;
        }
        inner.samples += chunk.samples.len();
        inner.chunks.push(chunk);
        true
    }

    /// Concatenate every pushed chunk, in push order.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidState`] when called a second time.
    pub fn finalize(&self) -> Result<Capture, SessionError> {
        let mut inner = self.lock();
        if inner.phase != Phase::Recording {
            return Err(SessionError::InvalidState);
        }
        inner.phase = Phase::Finalized;

        if inner.chunks.is_empty() {
            return Ok(Capture::Empty);
        }

        let chunks = std::mem::take(&mut inner.chunks);
        let mut samples = Vec::with_capacity(inner.samples);
        for chunk in &chunks {
            samples.extend_from_slice(&chunk.samples);
        }

        Ok(Capture::Recorded(CaptureBuffer {
            samples,
            sample_rate: self.sample_rate,
            chunk_count: chunks.len(),
            flagged_chunks: inner.flagged,
            truncated: inner.truncated,
        }))
    }

    /// Stop accepting chunks and drop what was collected.
    pub fn discard(&self) {
        let mut inner = self.lock();
        inner.phase = Phase::Finalized;
        inner.chunks.clear();
    }

    pub fn is_recording(&self) -> bool {
        self.lock().phase == Phase::Recording
    }

    pub fn chunk_count(&self) -> usize {
        self.lock().chunks.len()
    }

    pub fn sample_count(&self) -> usize {
        self.lock().samples
    }

    /// Chunks refused because they arrived after finalize or discard.
    pub fn rejected_count(&self) -> usize {
        self.lock().rejected
    }

    /// Wall-clock time since [`begin`](Self::begin).
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Audio time captured so far.
    pub fn captured_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.sample_count() as f32 / self.sample_rate as f32
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
