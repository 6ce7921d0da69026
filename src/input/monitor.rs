//! Polling level monitor for the push button.

use std::time::Duration;

use crate::cancel::CancelToken;

use super::{InputError, Level, PinReader};

/// How a [`DigitalInputMonitor::wait_for_level`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// The target level was read.
    Reached,
    /// The cancel token fired before the target level was seen.
    Cancelled,
}

/// Reads a [`PinReader`] as logical [`Level`]s and waits for level changes
/// by polling at a fixed interval.
pub struct DigitalInputMonitor<P> {
    pin: P,
    press_is_low: bool,
    poll_interval: Duration,
}

impl<P: PinReader> DigitalInputMonitor<P> {
    /// Wrap `pin`.  The polarity is fixed for the monitor's lifetime.
    pub fn new(pin: P, press_is_low: bool, poll_interval: Duration) -> Self {
        Self {
            pin,
            press_is_low,
            poll_interval,
        }
    }

    /// Instantaneous logical level of the button.
    pub fn read_level(&mut self) -> Result<Level, InputError> {
        let state = self.pin.read()?;
        Ok(Level::from_pin(state, self.press_is_low))
    }

    pub fn is_pressed(&mut self) -> Result<bool, InputError> {
        Ok(self.read_level()? == Level::Pressed)
    }

    /// Block until the button reads `target`.
    ///
    /// The level is re-read every `poll_interval`.  `on_tick` runs once after
    /// each read that did not match, before sleeping; it must not block for
    /// long or it stretches the poll cadence.  A single read at `target` ends
    /// the wait (no debounce).
    ///
    /// Returns [`Wait::Cancelled`] within one poll interval of `cancel`
    /// firing.
    pub fn wait_for_level(
        &mut self,
        target: Level,
        cancel: &CancelToken,
        mut on_tick: Option<&mut dyn FnMut()>,
    ) -> Result<Wait, InputError> {
        loop {
            if cancel.is_cancelled() {
                return Ok(Wait::Cancelled);
            }
            if self.read_level()? == target {
                return Ok(Wait::Reached);
            }
            if let Some(tick) = on_tick.as_deref_mut() {
                tick();
            }
            if cancel.sleep(self.poll_interval) {
                return Ok(Wait::Cancelled);
            }
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn press_is_low(&self) -> bool {
        self.press_is_low
    }

    /// Release the underlying pin.
    pub fn release(&mut self) -> Result<(), InputError> {
        self.pin.release()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
