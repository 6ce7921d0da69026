//! Recorder settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files.  Every section is
//! `#[serde(default)]`, so a settings file only needs the keys it changes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// ButtonConfig
// ---------------------------------------------------------------------------

/// Push button wiring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonConfig {
    /// sysfs GPIO class directory.
    pub sysfs_root: PathBuf,
    /// Kernel GPIO number (P1_36 on a PocketBeagle is gpio110).
    pub gpio: u32,
    /// `true` for pull-up wiring (pressed reads LOW), `false` for pull-down.
    pub press_is_low: bool,
    /// Delay between level reads while waiting for an edge.
    pub poll_interval_ms: u64,
}

impl ButtonConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            sysfs_root: PathBuf::from("/sys/class/gpio"),
            gpio: 110,
            press_is_low: true,
            poll_interval_ms: 20,
        }
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Microphone capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Capture rate in Hz.
    pub sample_rate: u32,
    /// Channel count delivered to the session.  Only mono is supported.
    pub channels: u16,
    /// Substring of the input device name (e.g. `"hw:1,0"`); `None` means
    /// the host default.
    pub device: Option<String>,
    /// Frames per callback; `None` lets the backend choose.
    pub block_size: Option<u32>,
    /// Stop keeping audio after this many seconds of a single press.
    /// `None` keeps everything for as long as the button is held.
    pub max_recording_secs: Option<f32>,
}

impl AudioConfig {
    /// Sample cap derived from `max_recording_secs`.
    pub fn max_samples(&self) -> Option<usize> {
        self.max_recording_secs
            .map(|secs| (secs * self.sample_rate as f32).round() as usize)
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 1,
            device: None,
            block_size: None,
            max_recording_secs: None,
        }
    }
}

// ---------------------------------------------------------------------------
// RenderConfig
// ---------------------------------------------------------------------------

/// Waveform image output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Directory for the image; `None` uses the platform data directory.
    pub output_dir: Option<PathBuf>,
    /// Image file name, overwritten on every capture.
    pub file_name: String,
    pub width: u32,
    pub height: u32,
}

impl RenderConfig {
    /// Full path of the waveform image.
    pub fn output_path(&self, paths: &AppPaths) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| paths.data_dir.clone())
            .join(&self.file_name)
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            file_name: "waveform.png".into(),
            width: 1_000,
            height: 400,
        }
    }
}

// ---------------------------------------------------------------------------
// PreviewConfig
// ---------------------------------------------------------------------------

/// Small-display preview of the rendered waveform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub enabled: bool,
    pub width: u32,
    pub height: u32,
    /// How long the preview stays up before the display returns to "Ready".
    pub hold_secs: f32,
}

impl PreviewConfig {
    pub fn hold(&self) -> Duration {
        Duration::from_secs_f32(self.hold_secs.max(0.0))
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            width: 128,
            height: 64,
            hold_secs: 4.0,
        }
    }
}

// ---------------------------------------------------------------------------
// DisplayConfig
// ---------------------------------------------------------------------------

/// Which status display backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayKind {
    /// Status and previews go to the log.
    Console,
    /// Discard everything.
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub kind: DisplayKind,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            kind: DisplayKind::Console,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level recorder configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use stethoscope::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub button: ButtonConfig,
    pub audio: AudioConfig,
    pub render: RenderConfig,
    pub preview: PreviewConfig,
    pub display: DisplayConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings the recorder cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.button.poll_interval_ms == 0 {
            bail!("button.poll_interval_ms must be greater than zero");
        }
        if self.audio.sample_rate == 0 {
            bail!("audio.sample_rate must be greater than zero");
        }
        if self.audio.channels != 1 {
            bail!(
                "audio.channels = {}: only mono capture is supported",
                self.audio.channels
            );
        }
        if self.audio.block_size == Some(0) {
            bail!("audio.block_size must be greater than zero");
        }
        if let Some(secs) = self.audio.max_recording_secs {
            if !(secs > 0.0) {
                bail!("audio.max_recording_secs must be positive (got {secs})");
            }
        }
        if self.render.width == 0 || self.render.height == 0 {
            bail!("render image size must be non-zero");
        }
        if self.render.file_name.is_empty() {
            bail!("render.file_name must not be empty");
        }
        if self.preview.enabled && (self.preview.width == 0 || self.preview.height == 0) {
            bail!("preview size must be non-zero");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
