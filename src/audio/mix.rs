//! Channel mixing for capture devices that cannot open a mono stream.
//!
//! Some USB microphones only expose stereo configurations.  The capture
//! adapter opens them as-is and folds every frame down to one sample before
//! delivery, so the session only ever sees mono audio.

/// Mix interleaved `i16` audio down to mono by averaging all channels.
///
/// The output length is `samples.len() / channels`; a trailing partial frame
/// is dropped.
///
/// * `channels == 1` copies the input.
/// * `channels == 0` returns an empty vector.
///
/// # Example
///
/// ```rust
/// use stethoscope::audio::downmix_to_mono;
///
/// let stereo = vec![100_i16, -100, 300, 100]; // L R L R
/// assert_eq!(downmix_to_mono(&stereo, 2), vec![0, 200]);
/// ```
pub fn downmix_to_mono(samples: &[i16], channels: u16) -> Vec<i16> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| {
                    let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                    (sum / n as i32) as i16
                })
                .collect()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
