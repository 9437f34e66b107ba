//! Energy-Dependent Pileup Boundary
//!
//! ## Overview
//!
//! Clean pulses form a narrow band in (energy, tail/total) space; pileup
//! smears to larger ratios. The boundary follows the band column by column:
//!
//! ```text
//! for each energy column (left to right):
//!     mass < threshold            → reject, chain unchanged
//!     seed σ ← min(chain σ, half-maximum width of the column)
//!     fit g(r) = h·exp(-½((r-c)/σ)²) + o over c_seed ± 5·σ_seed
//!     failed / center off-axis    → reject, chain unchanged
//!     |c − seed| > 2·σ_seed       → reject, chain unchanged
//!     σ ← max(σ, 0.005)
//!     upper = c + N·σ,  lower = c − N·σ
//!     chain ← (σ, o)
//!
//! smooth upper and lower with a trailing average of 5
//! close into a polygon, integrate the raw grid inside it
//! ```
//!
//! ## Thresholds
//!
//! The minimum column mass defaults to 100 for fixed calibrations and 500
//! for drift-tracked runs. Both defaults can be overridden.
//!
//! ## Outputs
//!
//! [`Boundary`] carries the polygon, the [`CorrectionFactor`] and the
//! per-column outcomes, so rejected columns can be inspected after the run.

pub mod chain;
pub mod correction;
pub mod polygon;
pub mod smoothing;

pub use chain::{ColumnFit, ColumnOutcome, FitChain};
pub use correction::CorrectionFactor;
pub use polygon::{BoundaryPolygon, Point};
pub use smoothing::trailing_average;

use alloc::vec::Vec;

use crate::constants::fitting::PROGRESS_LOG_INTERVAL;
use crate::constants::{
    DEFAULT_NUM_STDDEVS, FIT_WINDOW_STDDEVS, FWHM_PER_STDDEV, MAX_CENTER_SHIFT_STDDEVS, MIN_ACCEPTED_COLUMNS, MIN_COLUMN_SAMPLES_DRIFT,
    MIN_COLUMN_SAMPLES_FIXED, MIN_STD_DEV, SMOOTHING_WINDOW,
};
use crate::errors::{PipelineError, PipelineResult};
use crate::fit::{CurveFitter, LevenbergMarquardt};
use crate::histogram::DensityGrid;

/// Column acceptance and cut width
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryConfig {
    /// Half-width of the cut in fitted widths
    pub num_stddevs: f64,
    /// Minimum column mass for a fit
    pub min_column_samples: f64,
    /// Floor on fitted widths
    pub min_std_dev: f64,
    /// Accepted columns needed for a polygon
    pub min_columns: usize,
}

impl BoundaryConfig {
    /// Defaults for a fixed calibration
    pub fn fixed_mode() -> Self {
        Self {
            num_stddevs: DEFAULT_NUM_STDDEVS,
            min_column_samples: MIN_COLUMN_SAMPLES_FIXED,
            min_std_dev: MIN_STD_DEV,
            min_columns: MIN_ACCEPTED_COLUMNS,
        }
    }

    /// Defaults for a drift-tracked calibration
    pub fn drift_mode() -> Self {
        Self {
            min_column_samples: MIN_COLUMN_SAMPLES_DRIFT,
            ..Self::fixed_mode()
        }
    }

    /// Set the cut half-width
    pub fn with_num_stddevs(mut self, num_stddevs: f64) -> Self {
        self.num_stddevs = num_stddevs;
        self
    }

    /// Set the column mass threshold
    pub fn with_min_column_samples(mut self, samples: f64) -> Self {
        self.min_column_samples = samples;
        self
    }

    /// Check value domains
    pub fn validate(&self) -> PipelineResult<()> {
        if !(self.num_stddevs > 0.0) || !self.num_stddevs.is_finite() {
            return Err(PipelineError::InvalidConfig {
                reason: "num_stddevs must be positive",
            });
        }
        if !(self.min_column_samples >= 0.0) || !self.min_column_samples.is_finite() {
            return Err(PipelineError::InvalidConfig {
                reason: "min_column_samples must be non-negative",
            });
        }
        if !(self.min_std_dev > 0.0) || !self.min_std_dev.is_finite() {
            return Err(PipelineError::InvalidConfig {
                reason: "min_std_dev must be positive",
            });
        }
        if self.min_columns < MIN_ACCEPTED_COLUMNS {
            return Err(PipelineError::InvalidConfig {
                reason: "a polygon needs at least two columns",
            });
        }
        Ok(())
    }
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self::fixed_mode()
    }
}

/// Fitted boundary and its correction
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    /// Closed polygon around the clean band
    pub polygon: BoundaryPolygon,
    /// Pileup correction derived from the raw grid
    pub correction: CorrectionFactor,
    /// Accepted column fits in energy order
    pub columns: Vec<ColumnFit>,
    /// Outcome of every energy column
    pub outcomes: Vec<ColumnOutcome>,
}

impl Boundary {
    /// Number of rejected columns
    pub fn rejected_columns(&self) -> usize {
        self.outcomes.len() - self.columns.len()
    }
}

/// Fits the boundary of a raw PSD grid
#[derive(Debug, Clone)]
pub struct BoundaryFitter<F = LevenbergMarquardt> {
    config: BoundaryConfig,
    fitter: F,
}

impl BoundaryFitter<LevenbergMarquardt> {
    /// Fitter with the built-in optimizer
    pub fn new(config: BoundaryConfig) -> PipelineResult<Self> {
        Self::with_fitter(config, LevenbergMarquardt::default())
    }
}

impl<F: CurveFitter> BoundaryFitter<F> {
    /// Fitter with a custom optimizer
    pub fn with_fitter(config: BoundaryConfig, fitter: F) -> PipelineResult<Self> {
        config.validate()?;
        Ok(Self { config, fitter })
    }

    /// Configuration in use
    pub fn config(&self) -> &BoundaryConfig {
        &self.config
    }

    /// Fit every energy column, left to right
    pub fn fit_columns(&self, grid: &DensityGrid) -> Vec<ColumnOutcome> {
        let x_axis = grid.x_axis();
        let y_axis = grid.y_axis();
        let ratios: Vec<f64> = (0..y_axis.bins()).map(|bin| y_axis.bin_center(bin)).collect();

        let mut chain = FitChain::default();
        let mut outcomes = Vec::with_capacity(x_axis.bins());

        for column in 0..x_axis.bins() {
            if column > 0 && column % PROGRESS_LOG_INTERVAL == 0 {
                log_debug!("Fitting column {} of {}", column, x_axis.bins());
            }

            let counts = grid.column(column);
            let mass: f64 = counts.iter().sum();
            if mass < self.config.min_column_samples || mass <= 0.0 {
                outcomes.push(ColumnOutcome::TooFewSamples { count: mass });
                continue;
            }

            let mut peak = 0;
            for (bin, &count) in counts.iter().enumerate() {
                if count > counts[peak] {
                    peak = bin;
                }
            }
            let mut seed = chain.seed(counts[peak], y_axis.bin_center(peak));
            let peak_width = half_max_width(counts, peak) as f64 * y_axis.width() / FWHM_PER_STDDEV;
            seed.std_dev = libm::fabs(seed.std_dev).min(peak_width);

            let reach = FIT_WINDOW_STDDEVS * seed.std_dev;
            let (first, last) = y_axis
                .bin_range(seed.center - reach, seed.center + reach)
                .unwrap_or((peak, peak));
            let window = first..last + 1;

            let params = match self.fitter.fit_gaussian(&ratios[window.clone()], &counts[window], seed) {
                Ok(params) => params,
                Err(err) => {
                    outcomes.push(ColumnOutcome::FitFailed(err));
                    continue;
                }
            };
            let shift_limit = MAX_CENTER_SHIFT_STDDEVS * seed.std_dev;
            if !params.is_finite()
                || params.center < y_axis.min()
                || params.center >= y_axis.max()
                || libm::fabs(params.center - seed.center) > shift_limit
            {
                log_debug!(
                    "Column {}: center {:.4} rejected (seed {:.4})",
                    column,
                    params.center,
                    seed.center
                );
                outcomes.push(ColumnOutcome::Implausible { center: params.center });
                continue;
            }

            let fit = ColumnFit {
                column,
                energy: x_axis.bin_center(column),
                center: params.center,
                std_dev: params.std_dev.max(self.config.min_std_dev),
                offset: params.offset,
                height: params.height,
                sample_count: mass,
            };
            chain.advance(&fit);
            outcomes.push(ColumnOutcome::Accepted(fit));
        }

        outcomes
    }

    /// Fit columns, build the polygon and the correction factor
    ///
    /// Polygon vertices sit at the energy bin centers of the first and last
    /// accepted columns. Events in the outer half of those two columns lie
    /// outside the polygon and never count as clean, which lowers clean
    /// totals next to the ends of the accepted energy range.
    pub fn build(&self, grid: &DensityGrid) -> PipelineResult<Boundary> {
        let outcomes = self.fit_columns(grid);
        let columns: Vec<ColumnFit> = outcomes.iter().filter_map(|o| o.accepted().copied()).collect();

        if columns.len() < self.config.min_columns {
            return Err(PipelineError::InsufficientStatistics {
                required: self.config.min_columns,
                available: columns.len(),
            });
        }

        let energies: Vec<f64> = columns.iter().map(|c| c.energy).collect();
        let upper: Vec<f64> = columns
            .iter()
            .map(|c| c.center + c.std_dev * self.config.num_stddevs)
            .collect();
        let lower: Vec<f64> = columns
            .iter()
            .map(|c| c.center - c.std_dev * self.config.num_stddevs)
            .collect();

        let polygon = BoundaryPolygon::from_envelopes(
            &energies,
            &trailing_average::<SMOOTHING_WINDOW>(&upper),
            &trailing_average::<SMOOTHING_WINDOW>(&lower),
        );

        let num_clean = polygon.integrate(grid);
        let correction = CorrectionFactor::from_counts(num_clean, grid.total())?;

        log_info!(
            "Boundary: {} of {} columns accepted, clean fraction {:.4}, scale {:.4}",
            columns.len(),
            outcomes.len(),
            correction.fraction(),
            correction.scale_factor()
        );

        Ok(Boundary {
            polygon,
            correction,
            columns,
            outcomes,
        })
    }
}

/// Bins around `peak` whose counts stay above half of its count
fn half_max_width(counts: &[f64], peak: usize) -> usize {
    let half = counts[peak] / 2.0;
    let left = counts[..peak].iter().rev().take_while(|&&c| c > half).count();
    let right = counts[peak + 1..].iter().take_while(|&&c| c > half).count();
    left + right + 1
}
