//! PNG waveform plot drawn with tiny-skia.
//!
//! Blue min/max trace on white, autoscaled to the loudest sample, with a grey
//! zero line.  The file is overwritten on every capture.

use std::path::{Path, PathBuf};

use tiny_skia::{Color, Paint, Pixmap, Rect, Transform};

use crate::audio::{CaptureBuffer, Envelope};
use crate::config::{AppPaths, PreviewConfig, RenderConfig};
use crate::display::StatusDisplay;

use super::{preview_frame, Artifact, RenderError, RenderPipeline};

/// Vertical padding, as a fraction of the half-height, so peaks do not touch
/// the image border.
const HEADROOM: f32 = 0.9;

fn trace_color() -> Color {
    Color::from_rgba8(31, 119, 180, 255)
}

fn axis_color() -> Color {
    Color::from_rgba8(170, 170, 170, 255)
}

// ---------------------------------------------------------------------------
// WaveformRenderer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct WaveformRenderer {
    output: PathBuf,
    width: u32,
    height: u32,
    preview: PreviewConfig,
}

impl WaveformRenderer {
    pub fn new(output: PathBuf, width: u32, height: u32, preview: PreviewConfig) -> Self {
        Self {
            output,
            width,
            height,
            preview,
        }
    }

    pub fn from_config(render: &RenderConfig, preview: &PreviewConfig, paths: &AppPaths) -> Self {
        Self::new(
            render.output_path(paths),
            render.width,
            render.height,
            preview.clone(),
        )
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Draw `envelope` onto a fresh canvas.
    fn draw(&self, envelope: &Envelope) -> Result<Pixmap, RenderError> {
        let mut pixmap = Pixmap::new(self.width, self.height).ok_or(RenderError::Canvas {
            width: self.width,
            height: self.height,
        })?;
        pixmap.fill(Color::WHITE);

        let w = self.width as f32;
        let h = self.height as f32;
        let mid = h / 2.0;

        let mut paint = Paint::default();
        paint.anti_alias = false;

        paint.set_color(axis_color());
        if let Some(axis) = Rect::from_xywh(0.0, mid.floor(), w, 1.0) {
            pixmap.fill_rect(axis, &paint, Transform::identity(), None);
        }

        let peak = envelope.peak().max(1) as f32;
        let scale = mid * HEADROOM / peak;

        paint.set_color(trace_color());
        for (x, &(lo, hi)) in envelope.columns.iter().enumerate() {
            let top = mid - hi as f32 * scale;
            let bottom = mid - lo as f32 * scale;
            // At least one pixel tall so quiet passages stay visible.
            let span = (bottom - top).max(1.0);
            if let Some(rect) = Rect::from_xywh(x as f32, top, 1.0, span) {
                pixmap.fill_rect(rect, &paint, Transform::identity(), None);
            }
        }

        Ok(pixmap)
    }

    fn write_png(&self, pixmap: &Pixmap) -> Result<(), RenderError> {
        let bytes = pixmap
            .encode_png()
            .map_err(|e| RenderError::Encode(e.to_string()))?;

        if let Some(parent) = self.output.parent() {
            std::fs::create_dir_all(parent).map_err(|source| RenderError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&self.output, bytes).map_err(|source| RenderError::Io {
            path: self.output.clone(),
            source,
        })
    }
}

impl RenderPipeline for WaveformRenderer {
    fn render(&mut self, buffer: &CaptureBuffer) -> Result<Artifact, RenderError> {
        let envelope = Envelope::compute(buffer.samples(), self.width as usize);
        let pixmap = self.draw(&envelope)?;
        self.write_png(&pixmap)?;

        log::info!(
            "render: wrote {} ({} samples, {:.2}s, peak {})",
            self.output.display(),
            buffer.len(),
            buffer.duration_secs(),
            buffer.peak()
        );

        Ok(Artifact {
            path: self.output.clone(),
            width: self.width,
            height: self.height,
            sample_count: buffer.len(),
            duration_secs: buffer.duration_secs(),
            envelope,
        })
    }

    fn preview(
        &mut self,
        artifact: &Artifact,
        display: &mut dyn StatusDisplay,
    ) -> Result<bool, RenderError> {
        if !self.preview.enabled {
            return Ok(false);
        }
        let frame = preview_frame(&artifact.envelope, self.preview.width, self.preview.height);
        display.show_frame(&frame)?;
        log::debug!(
            "render: preview {}x{} shown",
            self.preview.width,
            self.preview.height
        );
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
