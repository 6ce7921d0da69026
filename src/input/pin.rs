//! GPIO pin access through the Linux sysfs interface.
//!
//! [`SysfsPin`] exports the pin on claim (when it is not already exported),
//! configures it as an input and reads `value` on every poll.  Dropping it
//! releases the pin; release is idempotent, so an explicit
//! [`PinReader::release`] followed by the drop only unexports once.
//!
//! # Layout
//!
//! ```text
//! <root>/export            write "<n>" to export gpio<n>
//! <root>/unexport          write "<n>" to release it
//! <root>/gpio<n>/direction "in" / "out"
//! <root>/gpio<n>/value     "0" / "1"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{parse_pin_value, InputError, PinState};

/// Number of times to look for `value` after exporting; udev may need a
/// moment to create the attribute files.
const EXPORT_SETTLE_ATTEMPTS: u32 = 20;
const EXPORT_SETTLE_DELAY: Duration = Duration::from_millis(10);

// ---------------------------------------------------------------------------
// PinReader
// ---------------------------------------------------------------------------

/// Capability to read one digital input pin.
pub trait PinReader {
    /// Instantaneous physical level of the pin.
    fn read(&mut self) -> Result<PinState, InputError>;

    /// Give the pin back to the system.  Must be idempotent.
    fn release(&mut self) -> Result<(), InputError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SysfsPin
// ---------------------------------------------------------------------------

/// A GPIO input claimed through `/sys/class/gpio`.
#[derive(Debug)]
pub struct SysfsPin {
    root: PathBuf,
    gpio: u32,
    value_path: PathBuf,
    /// `true` when this process exported the pin and must unexport it.
    exported: bool,
    released: bool,
}

impl SysfsPin {
    /// Claim `gpio` under `root` and configure it as an input.
    ///
    /// # Errors
    ///
    /// [`InputError::PinUnavailable`] when the pin directory does not exist
    /// and cannot be exported, [`InputError::Io`] when the direction or value
    /// files cannot be accessed, [`InputError::BadValue`] when the first read
    /// returns something other than `0`/`1`.
    pub fn claim(root: &Path, gpio: u32) -> Result<Self, InputError> {
        let pin_dir = root.join(format!("gpio{gpio}"));
        let mut exported = false;

        if !pin_dir.exists() {
            let export = root.join("export");
            if !export.exists() {
                return Err(InputError::PinUnavailable {
                    gpio,
                    root: root.to_path_buf(),
                });
            }
            write_attr(&export, &gpio.to_string())?;
            exported = true;
            log::debug!("gpio: exported gpio{gpio}");
        }

        let value_path = pin_dir.join("value");
        let mut pin = Self {
            root: root.to_path_buf(),
            gpio,
            value_path,
            exported,
            released: false,
        };

        if exported && !pin.wait_for_value_file() {
            // `pin` drops here and unexports what we just exported.
            return Err(InputError::PinUnavailable {
                gpio,
                root: root.to_path_buf(),
            });
        }

        let direction = pin_dir.join("direction");
        if direction.exists() {
            write_attr(&direction, "in")?;
        }

        let initial = pin.read()?;
        log::info!("gpio: claimed gpio{gpio} (initial level {initial:?})");
        Ok(pin)
    }

    pub fn gpio(&self) -> u32 {
        self.gpio
    }

    fn wait_for_value_file(&self) -> bool {
        for _ in 0..EXPORT_SETTLE_ATTEMPTS {
            if self.value_path.exists() {
                return true;
            }
            std::thread::sleep(EXPORT_SETTLE_DELAY);
        }
        self.value_path.exists()
    }
}

impl PinReader for SysfsPin {
    fn read(&mut self) -> Result<PinState, InputError> {
        if self.released {
            return Err(InputError::Released);
        }
        let raw = fs::read_to_string(&self.value_path).map_err(|source| InputError::Io {
            path: self.value_path.clone(),
            source,
        })?;
        parse_pin_value(&raw).ok_or_else(|| InputError::BadValue(raw.trim().to_string()))
    }

    fn release(&mut self) -> Result<(), InputError> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        if self.exported {
            write_attr(&self.root.join("unexport"), &self.gpio.to_string())?;
            log::debug!("gpio: unexported gpio{}", self.gpio);
        }
        log::info!("gpio: released gpio{}", self.gpio);
        Ok(())
    }
}

impl Drop for SysfsPin {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            log::warn!("gpio: release of gpio{} failed: {e}", self.gpio);
        }
    }
}

fn write_attr(path: &Path, value: &str) -> Result<(), InputError> {
    fs::write(path, value).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
