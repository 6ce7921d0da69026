//! Turning a finished capture into something to look at.
//!
//! # Flow
//!
//! ```text
//! CaptureBuffer ──Envelope::compute(width)──▶ plot (tiny-skia) ──▶ waveform.png
//!                                   │
//!                                   └──rebin(128)──▶ MonoFrame ──▶ StatusDisplay
//! ```
//!
//! [`RenderPipeline`] is the seam the controller calls; [`WaveformRenderer`]
//! is the production implementation.

pub mod plot;
pub mod preview;

pub use plot::WaveformRenderer;
pub use preview::preview_frame;

use std::path::PathBuf;

use thiserror::Error;

use crate::audio::{CaptureBuffer, Envelope};
use crate::display::{DisplayError, StatusDisplay};

// ---------------------------------------------------------------------------
// RenderError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("cannot allocate a {width}x{height} canvas")]
    Canvas { width: u32, height: u32 },

    #[error("PNG encoding failed: {0}")]
    Encode(String),

    #[error("writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("preview display failed: {0}")]
    Display(#[from] DisplayError),
}

// ---------------------------------------------------------------------------
// Artifact
// ---------------------------------------------------------------------------

/// What one successful render produced.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Where the image was written.
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub sample_count: usize,
    pub duration_secs: f32,
    /// Per-column extremes at image width; the preview is derived from it.
    pub envelope: Envelope,
}

// ---------------------------------------------------------------------------
// RenderPipeline trait
// ---------------------------------------------------------------------------

/// Consumer of finished captures.
///
/// `render` runs synchronously on the control thread after the stream has
/// been disarmed; the buffer is never touched by the audio thread again.
pub trait RenderPipeline {
    /// Draw `buffer` and persist the result.
    fn render(&mut self, buffer: &CaptureBuffer) -> Result<Artifact, RenderError>;

    /// Push a small preview of `artifact` to `display`.  A pipeline with the
    /// preview turned off returns `Ok(false)` without touching the display.
    fn preview(
        &mut self,
        artifact: &Artifact,
        display: &mut dyn StatusDisplay,
    ) -> Result<bool, RenderError>;
}
