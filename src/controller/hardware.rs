//! Everything the controller touches outside the process, in one owned
//! struct.
//!
//! [`Hardware`] is built once in `main` and moved into the controller.
//! [`release`](Hardware::release) says goodbye on the display, blanks it and
//! gives the GPIO pin back; it runs at most once, from the controller's
//! shutdown or from `Drop`, whichever comes first.

use crate::audio::AudioChannel;
use crate::display::{Status, StatusDisplay};
use crate::input::{DigitalInputMonitor, PinReader};
use crate::render::RenderPipeline;

pub struct Hardware<P: PinReader, A: AudioChannel, R: RenderPipeline> {
    pub monitor: DigitalInputMonitor<P>,
    pub audio: A,
    pub renderer: R,
    pub display: Box<dyn StatusDisplay>,
    released: bool,
}

impl<P: PinReader, A: AudioChannel, R: RenderPipeline> Hardware<P, A, R> {
    pub fn new(
        monitor: DigitalInputMonitor<P>,
        audio: A,
        renderer: R,
        display: Box<dyn StatusDisplay>,
    ) -> Self {
        Self {
            monitor,
            audio,
            renderer,
            display,
            released: false,
        }
    }

    /// Show `status`, logging instead of failing when the display is broken.
    pub fn notify(&mut self, status: &Status) {
        if let Err(e) = self.display.notify(status) {
            log::warn!("controller: display rejected {} status: {e}", status.label());
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Release every resource.  Later calls do nothing.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        self.notify(&Status::ShuttingDown);
        if let Err(e) = self.display.clear() {
            log::warn!("controller: display clear failed: {e}");
        }
        if let Err(e) = self.monitor.release() {
            log::warn!("controller: releasing button pin failed: {e}");
        }
        log::debug!("controller: hardware released");
    }
}

impl<P: PinReader, A: AudioChannel, R: RenderPipeline> Drop for Hardware<P, A, R> {
    fn drop(&mut self) {
        self.release();
    }
}
