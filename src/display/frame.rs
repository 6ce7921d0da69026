//! 1-bit frame buffer in SSD1306 page order.
//!
//! The panel is addressed in horizontal pages of 8 rows: byte
//! `page * width + x` holds rows `page * 8 .. page * 8 + 8` of column `x`,
//! least significant bit on top.
//!
//! ```text
//!          x=0   x=1   x=2  ...
//! page 0 [ b0 ] [ b0 ] [ b0 ]     row 0
//!        [ .. ] [ .. ] [ .. ]
//!        [ b7 ] [ b7 ] [ b7 ]     row 7
//! page 1 [ b0 ] ...               row 8
//! ```

/// A monochrome frame, ready to be pushed to a page-addressed panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonoFrame {
    width: u32,
    height: u32,
    bytes: Vec<u8>,
}

impl MonoFrame {
    /// All-off frame.  `height` is rounded up to a whole page for storage.
    pub fn new(width: u32, height: u32) -> Self {
        let pages = height.div_ceil(8) as usize;
        Self {
            width,
            height,
            bytes: vec![0; pages * width as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw page-ordered bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Set one pixel.  Out-of-range coordinates are ignored.
    pub fn set(&mut self, x: u32, y: u32, on: bool) {
        let Some((index, bit)) = self.locate(x, y) else {
            return;
        };
        if on {
            self.bytes[index] |= bit;
        } else {
            self.bytes[index] &= !bit;
        }
    }

    /// Read one pixel; out-of-range coordinates read as off.
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.locate(x, y)
            .is_some_and(|(index, bit)| self.bytes[index] & bit != 0)
    }

    /// Turn on every pixel in column `x` between `y0` and `y1` inclusive.
    pub fn vline(&mut self, x: u32, y0: u32, y1: u32) {
        let (lo, hi) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
        for y in lo..=hi.min(self.height.saturating_sub(1)) {
            self.set(x, y, true);
        }
    }

    pub fn lit_pixels(&self) -> usize {
        self.bytes.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Text art, one line per row, `#` for lit pixels.
    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity(((self.width + 1) * self.height) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                out.push(if self.get(x, y) { '#' } else { '.' });
            }
            out.push('\n');
        }
        out
    }

    fn locate(&self, x: u32, y: u32) -> Option<(usize, u8)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let index = (y / 8) as usize * self.width as usize + x as usize;
        Some((index, 1 << (y % 8)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
