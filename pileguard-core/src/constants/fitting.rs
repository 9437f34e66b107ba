//! Fitting Constants
//!
//! Parameters of the per-column Gaussian fits, the envelope smoothing and
//! the Levenberg-Marquardt optimizer.

// ===== COLUMN FITS =====

/// Floor applied to every fitted column width (tail/total units).
///
/// A few ratio bins wide; keeps the cut from collapsing onto a single bin
/// when a column is dominated by one value.
pub const MIN_STD_DEV: f64 = 0.005;

/// Width seed for the first column of the warm-start chain.
pub const INITIAL_STD_DEV: f64 = 0.1;

/// Offset seed for the first column of the warm-start chain.
pub const INITIAL_OFFSET: f64 = 0.0;

/// Default half-width of the cut in units of the fitted width.
pub const DEFAULT_NUM_STDDEVS: f64 = 2.0;

/// Full width at half maximum of a unit-width Gaussian, `2·√(2·ln 2)`.
pub const FWHM_PER_STDDEV: f64 = 2.354_820_045_030_949;

/// Half-width of the ratio range a column fit sees, in seed widths.
///
/// Bins further out only carry other bands and would be absorbed by the
/// offset.
pub const FIT_WINDOW_STDDEVS: f64 = 5.0;

/// Largest distance, in seed widths, between a fitted center and the
/// column maximum it was seeded from.
pub const MAX_CENTER_SHIFT_STDDEVS: f64 = 2.0;

/// Minimum column samples for a fit to be accepted (fixed calibration).
///
/// Source: empirical, with single-run statistics
pub const MIN_COLUMN_SAMPLES_FIXED: f64 = 100.0;

/// Minimum column samples for a fit to be accepted (drift calibration).
///
/// Drift-tracked runs are long and collect more events per column; the
/// higher threshold keeps the noisier edge columns out.
///
/// Source: empirical, with multi-hour runs
pub const MIN_COLUMN_SAMPLES_DRIFT: f64 = 500.0;

/// Accepted columns needed before a polygon has any area.
pub const MIN_ACCEPTED_COLUMNS: usize = 2;

// ===== SMOOTHING =====

/// Length of the trailing moving average over envelope points.
///
/// The current point plus up to four preceding accepted points.
pub const SMOOTHING_WINDOW: usize = 5;

// ===== PEAK SEARCH =====

/// Half-width (bins) of the neighborhood averaged around a peak maximum.
pub const PEAK_NEIGHBORHOOD_BINS: usize = 5;

// ===== OPTIMIZER =====

/// Iteration cap for the Levenberg-Marquardt loop.
pub const LM_MAX_ITERATIONS: usize = 500;

/// Relative deviance decrease that counts as converged.
pub const LM_TOLERANCE: f64 = 1e-9;

/// Initial damping factor.
pub const LM_INITIAL_LAMBDA: f64 = 1e-3;

/// Damping above which no downhill step exists and the fit is at a minimum.
pub const LM_MAX_LAMBDA: f64 = 1e12;

/// Columns between progress log lines.
pub const PROGRESS_LOG_INTERVAL: usize = 100;
