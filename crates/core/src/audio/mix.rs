//! Sample-level assembly primitives: gapless concatenation,
//! loop-stretch, and offset overlay.
//!
//! All functions are pure over mono f64 buffers. Loudness
//! normalization happens at generation time, so mixing here is plain
//! linear summation.

/// Convert a time in seconds to a sample count at the given rate.
pub fn seconds_to_samples(seconds: f64, sample_rate: u32) -> usize {
    (seconds * sample_rate as f64).round().max(0.0) as usize
}

/// Join clips end to end with no gaps and no fades.
pub fn concatenate(clips: &[Vec<f64>]) -> Vec<f64> {
    let total: usize = clips.iter().map(|c| c.len()).sum();
    let mut out = Vec::with_capacity(total);
    for clip in clips {
        out.extend_from_slice(clip);
    }
    out
}

/// Stretch a seed clip to exactly `target_len` samples by cyclic
/// repetition, truncating the final pass.
///
/// A target shorter than the seed truncates; a longer target repeats
/// the seed as many times as needed. Returns an empty buffer when the
/// seed is empty.
pub fn loop_to_length(seed: &[f64], target_len: usize) -> Vec<f64> {
    if seed.is_empty() || target_len == 0 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(target_len);
    while out.len() + seed.len() <= target_len {
        out.extend_from_slice(seed);
    }
    let remainder = target_len - out.len();
    out.extend_from_slice(&seed[..remainder]);
    out
}

/// Add `track` onto `master` starting at `offset` samples.
///
/// Samples extending past the end of the master are dropped; the
/// master's length never changes.
pub fn overlay_at(master: &mut [f64], track: &[f64], offset: usize) {
    if offset >= master.len() {
        return;
    }
    let span = (master.len() - offset).min(track.len());
    for i in 0..span {
        master[offset + i] += track[i];
    }
}
