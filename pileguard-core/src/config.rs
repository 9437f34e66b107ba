//! Pipeline Configuration
//!
//! ## Overview
//!
//! `PipelineConfig` gathers every tunable of a run. All fields have
//! defaults from [`crate::constants`], so a JSON document only needs the
//! values that differ:
//!
//! ```json
//! {
//!   "channel": 2,
//!   "num_stddevs": 2.5,
//!   "calibration": { "mode": "drift_tracking", "window_seconds": 120.0 }
//! }
//! ```
//!
//! ## Calibration Modes
//!
//! | `mode`           | Fields                                                          |
//! |------------------|-----------------------------------------------------------------|
//! | `fixed`          | `slope`, `intercept`                                            |
//! | `drift_tracking` | `window_seconds`, `tick_seconds`, `peak_bounds`, `reference_energies` |
//!
//! `peak_bounds` must hold six integers; any other list falls back to the
//! built-in ranges with a warning rather than failing the load.
//!
//! ## Column Threshold
//!
//! `min_column_samples` is optional. When absent the threshold follows the
//! calibration mode: 100 for `fixed`, 500 for `drift_tracking`.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "std")]
use crate::errors::LoadError;

use alloc::vec::Vec;

use crate::boundary::BoundaryConfig;
use crate::constants::{
    ADC_AXIS_BINS, ADC_AXIS_MAX, ADC_AXIS_MIN, BEAM_SAMPLE_PERIOD_S, DEFAULT_NUM_STDDEVS,
    DEFAULT_TICK_SECONDS, DEFAULT_WINDOW_SECONDS, ENERGY_AXIS_BINS, ENERGY_AXIS_MAX_MEV,
    ENERGY_AXIS_MIN_MEV, PEAK_COUNT, RATIO_AXIS_BINS, RATIO_AXIS_MAX, RATIO_AXIS_MIN,
    REFERENCE_ENERGIES_MEV,
};
use crate::errors::{PipelineError, PipelineResult};
use crate::histogram::Axis;

/// Serializable axis definition
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AxisSpec {
    /// Number of bins
    pub bins: usize,
    /// Lower edge
    pub min: f64,
    /// Upper edge
    pub max: f64,
}

impl AxisSpec {
    /// Default calibrated energy axis (MeV)
    pub const fn energy() -> Self {
        Self {
            bins: ENERGY_AXIS_BINS,
            min: ENERGY_AXIS_MIN_MEV,
            max: ENERGY_AXIS_MAX_MEV,
        }
    }

    /// Default tail/total axis
    pub const fn ratio() -> Self {
        Self {
            bins: RATIO_AXIS_BINS,
            min: RATIO_AXIS_MIN,
            max: RATIO_AXIS_MAX,
        }
    }

    /// Default raw integral axis for drift windows (ADC units)
    pub const fn adc() -> Self {
        Self {
            bins: ADC_AXIS_BINS,
            min: ADC_AXIS_MIN,
            max: ADC_AXIS_MAX,
        }
    }

    /// Validated axis
    pub fn to_axis(&self) -> PipelineResult<Axis> {
        Axis::new(self.bins, self.min, self.max)
    }
}

#[cfg(feature = "serde")]
fn default_slope() -> f64 {
    1.0
}

#[cfg(feature = "serde")]
fn default_window_seconds() -> f64 {
    DEFAULT_WINDOW_SECONDS
}

#[cfg(feature = "serde")]
fn default_tick_seconds() -> f64 {
    DEFAULT_TICK_SECONDS
}

#[cfg(feature = "serde")]
fn default_reference_energies() -> [f64; PEAK_COUNT] {
    REFERENCE_ENERGIES_MEV
}

/// How raw integrals become energies
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "mode", rename_all = "snake_case"))]
pub enum CalibrationConfig {
    /// One affine law for the whole run
    Fixed {
        /// MeV per ADC unit
        #[cfg_attr(feature = "serde", serde(default = "default_slope"))]
        slope: f64,
        /// MeV
        #[cfg_attr(feature = "serde", serde(default))]
        intercept: f64,
    },
    /// One law fitted per time window
    DriftTracking {
        /// Window length (s)
        #[cfg_attr(feature = "serde", serde(default = "default_window_seconds"))]
        window_seconds: f64,
        /// Digitizer tick length (s)
        #[cfg_attr(feature = "serde", serde(default = "default_tick_seconds"))]
        tick_seconds: f64,
        /// Six raw-integral bounds, two per peak
        #[cfg_attr(feature = "serde", serde(default))]
        peak_bounds: Option<Vec<i64>>,
        /// Peak energies (MeV)
        #[cfg_attr(feature = "serde", serde(default = "default_reference_energies"))]
        reference_energies: [f64; PEAK_COUNT],
    },
}

impl CalibrationConfig {
    /// Drift tracking with every default
    pub fn drift_defaults() -> Self {
        Self::DriftTracking {
            window_seconds: DEFAULT_WINDOW_SECONDS,
            tick_seconds: DEFAULT_TICK_SECONDS,
            peak_bounds: None,
            reference_energies: REFERENCE_ENERGIES_MEV,
        }
    }

    /// Check if this is drift tracking
    pub fn is_drift_tracking(&self) -> bool {
        matches!(self, Self::DriftTracking { .. })
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self::Fixed {
            slope: 1.0,
            intercept: 0.0,
        }
    }
}

/// Complete run configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PipelineConfig {
    /// Digitizer channel to process
    pub channel: i32,
    /// Cut half-width in fitted widths
    pub num_stddevs: f64,
    /// Calibration mode
    pub calibration: CalibrationConfig,
    /// Column mass threshold; mode default when `None`
    pub min_column_samples: Option<f64>,
    /// Calibrated energy axis
    pub energy_axis: AxisSpec,
    /// Tail/total axis
    pub ratio_axis: AxisSpec,
    /// Raw integral axis of drift windows
    pub adc_axis: AxisSpec,
    /// Beam-current sample period (s)
    pub beam_sample_seconds: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channel: 0,
            num_stddevs: DEFAULT_NUM_STDDEVS,
            calibration: CalibrationConfig::default(),
            min_column_samples: None,
            energy_axis: AxisSpec::energy(),
            ratio_axis: AxisSpec::ratio(),
            adc_axis: AxisSpec::adc(),
            beam_sample_seconds: BEAM_SAMPLE_PERIOD_S,
        }
    }
}

impl PipelineConfig {
    /// Fixed calibration, other settings default
    pub fn fixed(slope: f64, intercept: f64) -> Self {
        Self {
            calibration: CalibrationConfig::Fixed { slope, intercept },
            ..Self::default()
        }
    }

    /// Drift tracking, other settings default
    pub fn drift_tracking() -> Self {
        Self {
            calibration: CalibrationConfig::drift_defaults(),
            ..Self::default()
        }
    }

    /// Set the channel
    pub fn with_channel(mut self, channel: i32) -> Self {
        self.channel = channel;
        self
    }

    /// Set the cut half-width
    pub fn with_num_stddevs(mut self, num_stddevs: f64) -> Self {
        self.num_stddevs = num_stddevs;
        self
    }

    /// Override the column mass threshold
    pub fn with_min_column_samples(mut self, samples: f64) -> Self {
        self.min_column_samples = Some(samples);
        self
    }

    /// Set the energy axis
    pub fn with_energy_axis(mut self, axis: AxisSpec) -> Self {
        self.energy_axis = axis;
        self
    }

    /// Set the ratio axis
    pub fn with_ratio_axis(mut self, axis: AxisSpec) -> Self {
        self.ratio_axis = axis;
        self
    }

    /// Set the drift-window raw integral axis
    pub fn with_adc_axis(mut self, axis: AxisSpec) -> Self {
        self.adc_axis = axis;
        self
    }

    /// Column fit settings implied by this configuration
    pub fn boundary_config(&self) -> BoundaryConfig {
        let base = if self.calibration.is_drift_tracking() {
            BoundaryConfig::drift_mode()
        } else {
            BoundaryConfig::fixed_mode()
        };
        let base = base.with_num_stddevs(self.num_stddevs);
        match self.min_column_samples {
            Some(samples) => base.with_min_column_samples(samples),
            None => base,
        }
    }

    /// Check every setting
    pub fn validate(&self) -> PipelineResult<()> {
        self.energy_axis.to_axis()?;
        self.ratio_axis.to_axis()?;
        self.adc_axis.to_axis()?;
        self.boundary_config().validate()?;
        if !(self.beam_sample_seconds > 0.0) || !self.beam_sample_seconds.is_finite() {
            return Err(PipelineError::InvalidConfig {
                reason: "beam sample period must be positive",
            });
        }
        Ok(())
    }

    /// Parse and validate a JSON document
    #[cfg(feature = "std")]
    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file
    #[cfg(feature = "std")]
    pub fn from_json_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, LoadError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
