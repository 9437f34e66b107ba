//! Detector Constants
//!
//! Digitizer timing, default histogram ranges and the calibration lines
//! used by drift tracking.

// ===== DIGITIZER TIMING =====

/// Duration of one digitizer clock tick (s).
///
/// Event timestamps are counted in ticks of a 250 MHz sampling clock.
///
/// Source: digitizer sampling rate (250 MS/s)
pub const DEFAULT_TICK_SECONDS: f64 = 4.0e-9;

/// Width of one drift-tracking calibration window (s).
///
/// Long enough to collect clean calibration peaks at typical rates, short
/// enough that gain is roughly constant inside a window.
///
/// Source: operational experience with PMT gain drift
pub const DEFAULT_WINDOW_SECONDS: f64 = 60.0;

// ===== HISTOGRAM RANGES =====

/// Number of bins on the calibrated energy axis.
pub const ENERGY_AXIS_BINS: usize = 1024;

/// Lower edge of the calibrated energy axis (MeV).
pub const ENERGY_AXIS_MIN_MEV: f64 = 0.0;

/// Upper edge of the calibrated energy axis (MeV).
pub const ENERGY_AXIS_MAX_MEV: f64 = 10.0;

/// Number of bins on the tail/total axis.
pub const RATIO_AXIS_BINS: usize = 512;

/// Lower edge of the tail/total axis.
pub const RATIO_AXIS_MIN: f64 = 0.0;

/// Upper edge of the tail/total axis.
///
/// The tail integral is a subset of the total, so physical ratios lie
/// in [0, 1].
pub const RATIO_AXIS_MAX: f64 = 1.0;

/// Number of bins of the per-window raw integral histogram.
pub const ADC_AXIS_BINS: usize = 1024;

/// Lower edge of the raw integral axis (ADC units).
pub const ADC_AXIS_MIN: f64 = 0.0;

/// Upper edge of the raw integral axis (ADC units).
///
/// Covers the 4.4 MeV line with headroom at nominal gain.
pub const ADC_AXIS_MAX: f64 = 35000.0;

// ===== CALIBRATION PEAKS =====

/// Number of calibration peaks located per window.
pub const PEAK_COUNT: usize = 3;

/// Number of integers in a peak-bounds list (two per peak).
pub const PEAK_BOUND_VALUES: usize = 2 * PEAK_COUNT;

/// Built-in peak search ranges (ADC units), as `(upper, lower)` pairs.
///
/// In order: 4.438 MeV photopeak, its single-escape peak, 2.2 MeV
/// neutron-capture line. Used when no valid bounds are supplied.
pub const DEFAULT_PEAK_BOUNDS: [i64; PEAK_BOUND_VALUES] =
    [17000, 15000, 14500, 12000, 9000, 7000];

/// Reference energies matched to the peak ranges (MeV).
///
/// - 4.438 MeV: first excited state of ¹²C
/// - 3.927 MeV: single-escape peak of the 4.438 MeV line (4.438 − 0.511)
/// - 2.2 MeV: neutron capture on hydrogen (2.223 MeV, rounded)
///
/// Source: ENSDF evaluated nuclear structure data
pub const REFERENCE_ENERGIES_MEV: [f64; PEAK_COUNT] = [4.438, 3.927, 2.2];

// ===== BEAM CURRENT =====

/// Sampling period of the beam-current monitor (s).
///
/// Source: monitor readout at 20 Hz
pub const BEAM_SAMPLE_PERIOD_S: f64 = 0.05;

/// Zero-based column of the current (A) in a beam-current record.
pub const BEAM_CURRENT_COLUMN: usize = 2;
