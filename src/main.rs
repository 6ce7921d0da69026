//! Application entry point: stethoscope press-to-record.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run) and
//!    validate it.
//! 3. Install the Ctrl+C handler that fires the [`CancelToken`].
//! 4. Claim the button GPIO, open the microphone, build the renderer and the
//!    status display.
//! 5. Run the [`CaptureController`] until cancelled.

use anyhow::{Context, Result};

use stethoscope::{
    audio::CpalChannel,
    cancel::CancelToken,
    config::{AppConfig, AppPaths},
    controller::{CaptureController, Hardware},
    display,
    input::{DigitalInputMonitor, SysfsPin},
    render::WaveformRenderer,
};

fn main() -> Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("stethoscope starting up");

    // 2. Configuration
    let paths = AppPaths::new();
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e:#}); using defaults");
        AppConfig::default()
    });
    config.validate().context("invalid settings")?;
    if !paths.settings_file.exists() {
        // First run: leave an editable copy of the defaults behind.
        match config.save() {
            Ok(()) => log::info!("Wrote default settings to {}", paths.settings_file.display()),
            Err(e) => log::warn!("Could not write default settings: {e:#}"),
        }
    }
    log::debug!("settings file: {}", paths.settings_file.display());

    // 3. Cancellation
    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            log::info!("interrupt received, shutting down");
            cancel.cancel();
        })
        .context("installing Ctrl+C handler")?;
    }

    // 4. Hardware
    let pin = SysfsPin::claim(&config.button.sysfs_root, config.button.gpio)
        .with_context(|| format!("claiming button gpio{}", config.button.gpio))?;
    let monitor = DigitalInputMonitor::new(
        pin,
        config.button.press_is_low,
        config.button.poll_interval(),
    );

    let audio = CpalChannel::open(config.audio.device.as_deref(), config.audio.block_size)
        .context("opening audio input")?;
    log::info!("Audio input: {}", audio.device_name());

    let renderer = WaveformRenderer::from_config(&config.render, &config.preview, &paths);
    log::info!("Waveform output: {}", renderer.output_path().display());

    let status_display = display::from_config(config.display.kind, &config.preview);
    let hw = Hardware::new(monitor, audio, renderer, status_display);

    // 5. Run
    let mut controller = CaptureController::new(hw, &config, cancel);
    let stats = controller.run().context("capture controller stopped")?;

    log::info!(
        "Goodbye: {} press(es), {} rendered, {} empty, {} fault(s)",
        stats.cycles,
        stats.rendered,
        stats.empty,
        stats.faults
    );
    Ok(())
}
