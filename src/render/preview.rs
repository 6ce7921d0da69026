//! Waveform preview for a 1-bit panel.

use crate::audio::Envelope;
use crate::display::MonoFrame;

/// Draw `envelope` into a `width` x `height` frame: one vertical line per
/// column from its minimum to its maximum, autoscaled to the loudest column,
/// with the zero line always lit so silence still shows something.
pub fn preview_frame(envelope: &Envelope, width: u32, height: u32) -> MonoFrame {
    let mut frame = MonoFrame::new(width, height);
    if width == 0 || height == 0 {
        return frame;
    }

    let columns = envelope.rebin(width as usize);
    let peak = columns.peak().max(1) as f32;
    let mid = (height - 1) as f32 / 2.0;
    let to_row = |v: i16| -> u32 {
        let y = mid - (v as f32 / peak) * mid;
        y.round().clamp(0.0, (height - 1) as f32) as u32
    };

    let zero = to_row(0);
    for (x, &(lo, hi)) in columns.columns.iter().enumerate() {
        frame.set(x as u32, zero, true);
        frame.vline(x as u32, to_row(hi), to_row(lo));
    }
    frame
}
