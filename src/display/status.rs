//! What the recorder tells the user, independent of how it is shown.

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// User-facing status pushed to the display on every controller transition.
///
/// ```text
/// Ready ──press──▶ Recording{elapsed} ──release──▶ Processing ──▶ Ready
///                       │                               │
///                       └────────── fault ─────────▶ Error{reason} ──▶ Ready
/// any ──cancel──▶ ShuttingDown
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Status {
    /// Waiting for a press.
    #[default]
    Ready,
    /// Button held; `elapsed_secs` since the stream was armed.
    Recording { elapsed_secs: f32 },
    /// Released; finalizing and rendering.
    Processing,
    /// A recoverable fault; the controller keeps running.
    Error { reason: String },
    /// Cancellation requested; hardware is being released.
    ShuttingDown,
}

impl Status {
    /// Two short lines for a small text display.
    ///
    /// ```
    /// use stethoscope::display::Status;
    ///
    /// assert_eq!(Status::Ready.lines(), ("Press button".to_string(), "to record.".to_string()));
    /// ```
    pub fn lines(&self) -> (String, String) {
        match self {
            Status::Ready => ("Press button".into(), "to record.".into()),
            Status::Recording { elapsed_secs } => (
                format!("RECORDING... {elapsed_secs:.1}s"),
                "(Hold button)".into(),
            ),
            Status::Processing => ("Processing...".into(), "Please wait.".into()),
            Status::Error { reason } => ("Error:".into(), reason.clone()),
            Status::ShuttingDown => ("Goodbye!".into(), String::new()),
        }
    }

    /// A short label for log lines.
    pub fn label(&self) -> &'static str {
        match self {
            Status::Ready => "Ready",
            Status::Recording { .. } => "Recording",
            Status::Processing => "Processing",
            Status::Error { .. } => "Error",
            Status::ShuttingDown => "ShuttingDown",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_lines_show_elapsed_tenths() {
        let (top, bottom) = Status::Recording { elapsed_secs: 1.26 }.lines();
        assert_eq!(top, "RECORDING... 1.3s");
        assert_eq!(bottom, "(Hold button)");
    }

    #[test]
    fn processing_lines() {
        assert_eq!(
            Status::Processing.lines(),
            ("Processing...".to_string(), "Please wait.".to_string())
        );
    }

    #[test]
    fn error_lines_carry_reason() {
        let status = Status::Error {
            reason: "Image save fail".into(),
        };
        assert_eq!(status.lines().0, "Error:");
        assert_eq!(status.lines().1, "Image save fail");
    }

    #[test]
    fn shutting_down_says_goodbye() {
        assert_eq!(Status::ShuttingDown.lines().0, "Goodbye!");
        assert!(Status::ShuttingDown.lines().1.is_empty());
    }

    #[test]
    fn labels() {
        assert_eq!(Status::Ready.label(), "Ready");
        assert_eq!(Status::Recording { elapsed_secs: 0.0 }.label(), "Recording");
        assert_eq!(Status::Error { reason: String::new() }.label(), "Error");
    }

    #[test]
    fn default_is_ready() {
        assert_eq!(Status::default(), Status::Ready);
    }
}
