//! Push button input, polled from a GPIO pin.
//!
//! # Design
//!
//! The button is read through the [`PinReader`] capability, which only knows
//! the physical [`PinState`].  [`DigitalInputMonitor`] owns the reader and the
//! wiring polarity (`press_is_low`) and exposes logical [`Level`]s plus a
//! blocking [`wait_for_level`](DigitalInputMonitor::wait_for_level) that the
//! controller uses to detect press and release edges.
//!
//! There is no debouncing: one read at the target level satisfies a wait.
//!
//! # Usage
//!
//! ```no_run
//! use std::time::Duration;
//! use stethoscope::cancel::CancelToken;
//! use stethoscope::config::ButtonConfig;
//! use stethoscope::input::{DigitalInputMonitor, Level, SysfsPin};
//!
//! let config = ButtonConfig::default();
//! let pin = SysfsPin::claim(&config.sysfs_root, config.gpio).expect("pin");
//! let mut monitor = DigitalInputMonitor::new(pin, config.press_is_low, Duration::from_millis(20));
//!
//! let cancel = CancelToken::new();
//! monitor.wait_for_level(Level::Pressed, &cancel, None).unwrap();
//! ```

pub mod monitor;
pub mod pin;

pub use monitor::{DigitalInputMonitor, Wait};
pub use pin::{PinReader, SysfsPin};

use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// PinState / Level / Edge
// ---------------------------------------------------------------------------

/// Physical level read from the pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinState {
    High,
    Low,
}

/// Logical button level.  `Pressed` is the asserted level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Pressed,
    Unpressed,
}

impl Level {
    /// Map a physical read to a logical level.
    ///
    /// With a pull-up resistor the button pulls the pin to ground, so
    /// `press_is_low = true`; with a pull-down it is `false`.
    ///
    /// ```
    /// use stethoscope::input::{Level, PinState};
    ///
    /// assert_eq!(Level::from_pin(PinState::Low, true), Level::Pressed);
    /// assert_eq!(Level::from_pin(PinState::High, true), Level::Unpressed);
    /// assert_eq!(Level::from_pin(PinState::High, false), Level::Pressed);
    /// ```
    pub fn from_pin(state: PinState, press_is_low: bool) -> Self {
        match (state, press_is_low) {
            (PinState::Low, true) | (PinState::High, false) => Level::Pressed,
            (PinState::High, true) | (PinState::Low, false) => Level::Unpressed,
        }
    }
}

/// A level transition the controller reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Unpressed → Pressed.
    Press,
    /// Pressed → Unpressed.
    Release,
}

impl Edge {
    /// The level a wait must observe to detect this edge.
    pub fn target(self) -> Level {
        match self {
            Edge::Press => Level::Pressed,
            Edge::Release => Level::Unpressed,
        }
    }
}

// ---------------------------------------------------------------------------
// InputError
// ---------------------------------------------------------------------------

/// Failures claiming or reading the button pin.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("gpio{gpio} is not available under {root}")]
    PinUnavailable { gpio: u32, root: PathBuf },

    #[error("gpio I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unexpected gpio value {0:?}")]
    BadValue(String),

    #[error("pin has been released")]
    Released,
}

// ---------------------------------------------------------------------------
// parse_pin_value
// ---------------------------------------------------------------------------

/// Parse the contents of a sysfs `value` file.
///
/// ```
/// use stethoscope::input::{parse_pin_value, PinState};
///
/// assert_eq!(parse_pin_value("1\n"), Some(PinState::High));
/// assert_eq!(parse_pin_value("0"), Some(PinState::Low));
/// assert_eq!(parse_pin_value("high"), None);
/// ```
pub fn parse_pin_value(raw: &str) -> Option<PinState> {
    match raw.trim() {
        "1" => Some(PinState::High),
        "0" => Some(PinState::Low),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
