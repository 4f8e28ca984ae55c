//! Table-driven square root for term frequencies.
//!
//! Scorers take the square root of a document's term frequency once per
//! scored document. Frequencies are small non-negative integers in practice,
//! so the roots of the first [`SQRT_TABLE_SIZE`] integers are computed once
//! and looked up afterwards. Larger frequencies fall back to `f32::sqrt`.
//!
//! Every table entry is the correctly rounded `f32` root, so the lookup is
//! strictly increasing in its argument and never reorders two documents whose
//! frequencies differ by one.

use lazy_static::lazy_static;

/// Number of precomputed entries.
pub const SQRT_TABLE_SIZE: usize = 1 << 16;

lazy_static! {
    static ref SQRT_TABLE: Vec<f32> = (0..SQRT_TABLE_SIZE)
        .map(|i| (i as f64).sqrt() as f32)
        .collect();
}

/// Square root of a frequency.
#[inline]
pub fn sqrt_freq(freq: u64) -> f32 {
    match usize::try_from(freq) {
        Ok(idx) if idx < SQRT_TABLE_SIZE => SQRT_TABLE[idx],
        _ => (freq as f64).sqrt() as f32,
    }
}
