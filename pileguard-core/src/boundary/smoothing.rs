//! Trailing moving average over envelope points
//!
//! ```text
//! out[i] = raw[i]                        i < N - 1
//! out[i] = mean(raw[i-N+1 ..= i])        otherwise
//! ```
//!
//! The average always uses the raw values, never already smoothed ones.

use alloc::vec::Vec;

use crate::buffer::CircularBuffer;

/// Smooth `values` with a trailing window of `N`
pub fn trailing_average<const N: usize>(values: &[f64]) -> Vec<f64> {
    if N == 0 {
        return values.to_vec();
    }
    let mut window: CircularBuffer<f64, N> = CircularBuffer::new();
    values
        .iter()
        .map(|&value| {
            window.push(value);
            if window.is_full() {
                window.mean().unwrap_or(value)
            } else {
                value
            }
        })
        .collect()
}
