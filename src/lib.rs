//! Press-to-record audio capture for a single push button.
//!
//! Hold the button and the microphone records; let go and the recording is
//! drawn as a waveform image, with a small preview on the status display.
//!
//! # Modules
//!
//! - [`input`]: GPIO button access and level polling.
//! - [`audio`]: microphone capture, the chunk gate and capture sessions.
//! - [`controller`]: the press/record/render state machine.
//! - [`render`]: waveform PNG and 1-bit preview.
//! - [`display`]: status text and preview sinks.
//! - [`config`]: `settings.toml` and platform paths.
//! - [`cancel`]: Ctrl+C cancellation shared with the control thread.

pub mod audio;
pub mod cancel;
pub mod config;
pub mod controller;
pub mod display;
pub mod input;
pub mod render;

#[cfg(test)]
mod testing;
