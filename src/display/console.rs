//! Log-backed display and a do-nothing display.

use super::{DisplayError, MonoFrame, Status, StatusDisplay};

// ---------------------------------------------------------------------------
// ConsoleDisplay
// ---------------------------------------------------------------------------

/// Writes status lines at `info` and previews as text art at `debug`.
///
/// Repeated identical statuses are suppressed so the recording tick does not
/// flood the log.
#[derive(Debug)]
pub struct ConsoleDisplay {
    width: u32,
    height: u32,
    last: Option<(String, String)>,
    frames_shown: usize,
}

impl ConsoleDisplay {
    /// A console standing in for a `width` x `height` panel.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            last: None,
            frames_shown: 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn frames_shown(&self) -> usize {
        self.frames_shown
    }
}

impl StatusDisplay for ConsoleDisplay {
    fn notify(&mut self, status: &Status) -> Result<(), DisplayError> {
        let lines = status.lines();
        if self.last.as_ref() == Some(&lines) {
            return Ok(());
        }
        match status {
            Status::Error { .. } => log::warn!("display: {} {}", lines.0, lines.1),
            Status::Recording { .. } => log::debug!("display: {} {}", lines.0, lines.1),
            _ => log::info!("display: {} {}", lines.0, lines.1),
        }
        self.last = Some(lines);
        Ok(())
    }

    fn show_frame(&mut self, frame: &MonoFrame) -> Result<(), DisplayError> {
        if (frame.width(), frame.height()) != (self.width, self.height) {
            return Err(DisplayError::FrameSize {
                got_w: frame.width(),
                got_h: frame.height(),
                want_w: self.width,
                want_h: self.height,
            });
        }
        self.frames_shown += 1;
        log::info!(
            "display: preview #{} {}x{} ({} lit pixels)",
            self.frames_shown,
            frame.width(),
            frame.height(),
            frame.lit_pixels()
        );
        if log::log_enabled!(log::Level::Debug) {
            log::debug!("display: preview\n{}", frame.to_ascii());
        }
        // A frame replaces whatever text was showing.
        self.last = None;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.last = None;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// NullDisplay
// ---------------------------------------------------------------------------

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDisplay;

impl StatusDisplay for NullDisplay {
    fn notify(&mut self, _status: &Status) -> Result<(), DisplayError> {
        Ok(())
    }

    fn show_frame(&mut self, _frame: &MonoFrame) -> Result<(), DisplayError> {
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        Ok(())
    }
}
