//! Sample chunks and stream formats shared by the capture adapters and the
//! capture session.

use crate::config::AudioConfig;

// ---------------------------------------------------------------------------
// StreamFormat
// ---------------------------------------------------------------------------

/// Requested stream parameters.  Samples always reach the session as signed
/// 16-bit PCM; backends producing other encodings convert before delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl StreamFormat {
    /// Mono `i16` at `sample_rate`.
    pub fn mono_i16(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: 1,
        }
    }
}

impl From<&AudioConfig> for StreamFormat {
    fn from(config: &AudioConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            channels: config.channels,
        }
    }
}

// ---------------------------------------------------------------------------
// SampleChunk
// ---------------------------------------------------------------------------

/// Non-fatal condition reported alongside a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStatus {
    /// Input samples were lost before this chunk (capture timestamps jumped).
    InputOverflow,
    /// The backend reported a stream error since the previous chunk.
    DeviceError,
}

/// One block of mono samples as delivered by the audio thread.
///
/// The samples are owned: adapters copy the backend's buffer, which the
/// backend recycles, into a fresh `Vec` before delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleChunk {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub status: Option<ChunkStatus>,
}

impl SampleChunk {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            status: None,
        }
    }

    pub fn with_status(mut self, status: ChunkStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
