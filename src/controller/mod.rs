//! Press-to-record controller.
//!
//! ```text
//! SysfsPin ─▶ DigitalInputMonitor ─┐
//! CpalChannel ─────────────────────┼─▶ Hardware ─▶ CaptureController::run
//! WaveformRenderer ────────────────┤                     │
//! StatusDisplay ───────────────────┘                     ▼
//!                                     Ready → Recording → Processing → Ready
//! ```
//!
//! [`Hardware`] bundles the capabilities, [`CaptureController`] owns it and
//! runs the state machine, and [`ControllerState`] / [`ControllerStats`]
//! report where it is and what it has done.

pub mod hardware;
pub mod runner;
pub mod state;

pub use hardware::Hardware;
pub use runner::{CaptureController, ControllerError};
pub use state::{ControllerState, ControllerStats, CycleOutcome};
