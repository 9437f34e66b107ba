//! Calibration peak search ranges
//!
//! Three raw-integral ranges, one per calibration line. Bounds arrive as a
//! flat list of six integers, two per peak. Historical bound files list
//! each pair as `(upper, lower)`; newer ones use `(lower, upper)`. Both are
//! accepted because every pair is normalized to `(min, max)`.
//!
//! A list with any other number of values is not an error: the built-in
//! ranges are used, a warning is logged and `is_fallback()` reports it.

use heapless::Vec as BoundedVec;

use crate::constants::{DEFAULT_PEAK_BOUNDS, PEAK_BOUND_VALUES, PEAK_COUNT};

/// Inclusive raw-integral range around one calibration peak
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeakRange {
    /// Lower edge (ADC units)
    pub lower: i64,
    /// Upper edge (ADC units)
    pub upper: i64,
}

impl PeakRange {
    /// Range between `a` and `b`, in either order
    pub fn new(a: i64, b: i64) -> Self {
        Self {
            lower: a.min(b),
            upper: a.max(b),
        }
    }
}

/// Resolved search ranges for the three calibration peaks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeakBounds {
    ranges: [PeakRange; PEAK_COUNT],
    fallback: bool,
}

impl PeakBounds {
    /// Built-in ranges
    pub fn defaults() -> Self {
        Self::from_pairs(&DEFAULT_PEAK_BOUNDS)
    }

    fn from_pairs(values: &[i64; PEAK_BOUND_VALUES]) -> Self {
        let mut ranges = [PeakRange::new(0, 0); PEAK_COUNT];
        for (range, pair) in ranges.iter_mut().zip(values.chunks_exact(2)) {
            *range = PeakRange::new(pair[0], pair[1]);
        }
        Self { ranges, fallback: false }
    }

    fn fallback(found: usize) -> Self {
        log_warn!(
            "Expected {} peak bound values, found {}; using built-in ranges",
            PEAK_BOUND_VALUES,
            found
        );
        let mut bounds = Self::from_pairs(&DEFAULT_PEAK_BOUNDS);
        bounds.fallback = true;
        bounds
    }

    /// Ranges from a flat list of exactly six values
    ///
    /// Any other length falls back to the built-in ranges.
    pub fn from_values(values: &[i64]) -> Self {
        match <&[i64; PEAK_BOUND_VALUES]>::try_from(values) {
            Ok(pairs) => Self::from_pairs(pairs),
            Err(_) => Self::fallback(values.len()),
        }
    }

    /// Ranges from whitespace-separated integers
    ///
    /// Unparseable tokens or a count other than six fall back to the
    /// built-in ranges.
    pub fn parse(text: &str) -> Self {
        let mut values: BoundedVec<i64, PEAK_BOUND_VALUES> = BoundedVec::new();
        let mut tokens = text.split_whitespace();
        while let Some(token) = tokens.next() {
            let Ok(value) = token.parse::<i64>() else {
                log_warn!("Peak bound {:?} is not an integer", token);
                return Self::fallback(values.len() + 1);
            };
            if values.push(value).is_err() {
                return Self::fallback(PEAK_BOUND_VALUES + 1 + tokens.count());
            }
        }
        Self::from_values(&values)
    }

    /// Ranges from a bounds file
    ///
    /// A missing or unreadable file falls back to the built-in ranges.
    #[cfg(feature = "std")]
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Self {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(text) => Self::parse(&text),
            Err(err) => {
                log_warn!("Cannot read peak bounds {}: {}", path.as_ref().display(), err);
                Self::fallback(0)
            }
        }
    }

    /// Search ranges, in the order of the reference energies
    pub fn ranges(&self) -> &[PeakRange; PEAK_COUNT] {
        &self.ranges
    }

    /// Check if the built-in ranges replaced invalid input
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }
}

impl Default for PeakBounds {
    fn default() -> Self {
        Self::defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_pair_order_is_normalized() {
        let bounds = PeakBounds::from_values(&DEFAULT_PEAK_BOUNDS);
        assert!(!bounds.is_fallback());
        assert_eq!(bounds.ranges()[0], PeakRange { lower: 15000, upper: 17000 });
        assert_eq!(bounds.ranges()[1], PeakRange { lower: 12000, upper: 14500 });
        assert_eq!(bounds.ranges()[2], PeakRange { lower: 7000, upper: 9000 });
    }

    #[test]
    fn ascending_pairs_are_accepted() {
        let bounds = PeakBounds::from_values(&[100, 200, 300, 400, 500, 600]);
        assert_eq!(bounds.ranges()[1], PeakRange { lower: 300, upper: 400 });
        assert!(!bounds.is_fallback());
    }

    #[test]
    fn wrong_count_falls_back() {
        let bounds = PeakBounds::from_values(&[1, 2, 3, 4]);
        assert!(bounds.is_fallback());
        assert_eq!(bounds.ranges(), PeakBounds::defaults().ranges());

        assert!(PeakBounds::from_values(&[1, 2, 3, 4, 5, 6, 7]).is_fallback());
        assert!(PeakBounds::from_values(&[]).is_fallback());
    }

    #[test]
    fn parse_text() {
        let bounds = PeakBounds::parse("17000 15000\n14500 12000\n9000 7000\n");
        assert!(!bounds.is_fallback());
        assert_eq!(bounds, PeakBounds::defaults());

        assert!(PeakBounds::parse("1 2 3 4").is_fallback());
        assert!(PeakBounds::parse("1 2 3 4 5 6 7 8").is_fallback());
        assert!(PeakBounds::parse("1 2 three 4 5 6").is_fallback());
    }

    #[test]
    fn extra_values_are_not_truncated() {
        // The first six values alone would form valid ranges
        let bounds = PeakBounds::parse("100 200 300 400 500 600 700");
        assert!(bounds.is_fallback());
        assert_eq!(bounds.ranges(), PeakBounds::defaults().ranges());
        assert_ne!(bounds.ranges()[0], PeakRange::new(100, 200));
    }

    #[cfg(feature = "std")]
    #[test]
    fn missing_file_falls_back() {
        let bounds = PeakBounds::from_file("/nonexistent/peak_bounds.txt");
        assert!(bounds.is_fallback());
    }
}
