//! Constants for PileGuard Core
//!
//! Centralized defaults used throughout the calibration and boundary
//! pipeline. Every value a caller can override through `PipelineConfig`
//! has its default here.
//!
//! ## Organization
//!
//! - **Detector**: digitizer clock, histogram ranges, calibration peaks
//! - **Fitting**: column-fit acceptance, smoothing, optimizer limits
//!
//! ## Usage Guidelines
//!
//! 1. Use these constants instead of magic numbers
//! 2. Include units in names where a unit applies
//! 3. State the source of every physical value

/// Digitizer, histogram and calibration-peak defaults.
pub mod detector;

/// Column fit, smoothing and optimizer parameters.
pub mod fitting;

pub use detector::{
    DEFAULT_TICK_SECONDS, DEFAULT_WINDOW_SECONDS,
    ENERGY_AXIS_BINS, ENERGY_AXIS_MIN_MEV, ENERGY_AXIS_MAX_MEV,
    RATIO_AXIS_BINS, RATIO_AXIS_MIN, RATIO_AXIS_MAX,
    ADC_AXIS_BINS, ADC_AXIS_MIN, ADC_AXIS_MAX,
    PEAK_COUNT, PEAK_BOUND_VALUES, DEFAULT_PEAK_BOUNDS, REFERENCE_ENERGIES_MEV,
    BEAM_SAMPLE_PERIOD_S, BEAM_CURRENT_COLUMN,
};

pub use fitting::{
    MIN_STD_DEV, INITIAL_STD_DEV, FWHM_PER_STDDEV, FIT_WINDOW_STDDEVS, MAX_CENTER_SHIFT_STDDEVS,
    INITIAL_OFFSET, DEFAULT_NUM_STDDEVS,
    MIN_COLUMN_SAMPLES_FIXED, MIN_COLUMN_SAMPLES_DRIFT, MIN_ACCEPTED_COLUMNS,
    SMOOTHING_WINDOW, PEAK_NEIGHBORHOOD_BINS,
};
