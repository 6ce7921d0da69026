//! Min/max amplitude envelope used to draw waveforms.
//!
//! Both the PNG renderer and the small-display preview draw one vertical
//! stroke per pixel column, from the column's minimum to its maximum sample.
//! [`Envelope::compute`] does the reduction once per capture.
//!
//! # Example
//!
//! ```rust
//! use stethoscope::audio::Envelope;
//!
//! let audio: Vec<i16> = (0..44_100)
//!     .map(|i| ((i as f32 * 0.01).sin() * 8_000.0) as i16)
//!     .collect();
//!
//! let envelope = Envelope::compute(&audio, 128);
//! assert_eq!(envelope.len(), 128);
//! assert!(envelope.peak() <= 8_000);
//! ```

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Per-column `(min, max)` sample values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub columns: Vec<(i16, i16)>,
}

impl Envelope {
    /// Reduce `samples` to `num_columns` `(min, max)` pairs.
    ///
    /// Samples are split as evenly as possible: column `c` covers
    /// `[c * len / n, (c + 1) * len / n)`.  When there are fewer samples than
    /// columns, each sample gets its own column and the rest are `(0, 0)`.
    pub fn compute(samples: &[i16], num_columns: usize) -> Self {
        if num_columns == 0 {
            return Self {
                columns: Vec::new(),
            };
        }

        if samples.is_empty() {
            return Self {
                columns: vec![(0, 0); num_columns],
            };
        }

        let len = samples.len();
        if len < num_columns {
            let mut columns: Vec<(i16, i16)> = samples.iter().map(|&s| (s, s)).collect();
            columns.resize(num_columns, (0, 0));
            return Self { columns };
        }

        // With len >= num_columns every column covers at least one sample.
        let columns = (0..num_columns)
            .map(|c| {
                let (start, end) = column_bounds(c, len, num_columns);
                let slice = &samples[start..end];
                let min = slice.iter().copied().min().unwrap_or(0);
                let max = slice.iter().copied().max().unwrap_or(0);
                (min, max)
            })
            .collect();

        Self { columns }
    }

    /// Merge columns down (or spread them up) to `num_columns`, keeping the
    /// extremes of every group so short peaks survive the reduction.
    pub fn rebin(&self, num_columns: usize) -> Self {
        let len = self.columns.len();
        if len == 0 || num_columns == 0 {
            return Self {
                columns: vec![(0, 0); num_columns],
            };
        }

        let columns = (0..num_columns)
            .map(|c| {
                let (start, end) = column_bounds(c, len, num_columns);
                let end = end.max(start + 1).min(len);
                self.columns[start..end]
                    .iter()
                    .fold((i16::MAX, i16::MIN), |(lo, hi), &(a, b)| {
                        (lo.min(a), hi.max(b))
                    })
            })
            .collect();

        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Largest absolute value across all columns.
    pub fn peak(&self) -> u16 {
        self.columns
            .iter()
            .map(|&(lo, hi)| lo.unsigned_abs().max(hi.unsigned_abs()))
            .max()
            .unwrap_or(0)
    }
}

/// Sample range `[c * len / n, (c + 1) * len / n)` for column `c`.
///
/// Computed in `u64` so long captures cannot overflow a 32-bit `usize`.
fn column_bounds(c: usize, len: usize, n: usize) -> (usize, usize) {
    let (c, len, n) = (c as u64, len as u64, n as u64);
    let start = c * len / n;
    let end = (c + 1) * len / n;
    (start as usize, end as usize)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
