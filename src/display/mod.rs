//! Status display: where the recorder shows "Press button", the recording
//! timer and the waveform preview.
//!
//! The controller only talks to [`StatusDisplay`].  A panel driver (an
//! SSD1306 over I²C, say) implements the same three calls; the crate ships a
//! log-backed [`ConsoleDisplay`] and a [`NullDisplay`].
//!
//! ```rust
//! use stethoscope::display::{ConsoleDisplay, Status, StatusDisplay};
//!
//! let mut display = ConsoleDisplay::new(128, 64);
//! display.notify(&Status::Ready).unwrap();
//! display.notify(&Status::Recording { elapsed_secs: 0.4 }).unwrap();
//! ```

pub mod console;
pub mod frame;
pub mod status;

pub use console::{ConsoleDisplay, NullDisplay};
pub use frame::MonoFrame;
pub use status::Status;

use thiserror::Error;

use crate::config::{DisplayKind, PreviewConfig};

// ---------------------------------------------------------------------------
// DisplayError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("display I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame is {got_w}x{got_h}, display is {want_w}x{want_h}")]
    FrameSize {
        got_w: u32,
        got_h: u32,
        want_w: u32,
        want_h: u32,
    },
}

// ---------------------------------------------------------------------------
// StatusDisplay trait
// ---------------------------------------------------------------------------

/// A sink for status text and 1-bit preview frames.
pub trait StatusDisplay {
    /// Show the two-line rendering of `status`.
    fn notify(&mut self, status: &Status) -> Result<(), DisplayError>;

    /// Replace the screen contents with `frame`.
    fn show_frame(&mut self, frame: &MonoFrame) -> Result<(), DisplayError>;

    /// Blank the screen.
    fn clear(&mut self) -> Result<(), DisplayError>;
}

/// Build the display selected in the config, sized for the preview panel.
pub fn from_config(kind: DisplayKind, preview: &PreviewConfig) -> Box<dyn StatusDisplay + Send> {
    match kind {
        DisplayKind::Console => Box::new(ConsoleDisplay::new(preview.width, preview.height)),
        DisplayKind::None => Box::new(NullDisplay),
    }
}
