//! Warm-start state for the column fits
//!
//! Neighboring energy columns have nearly the same ratio width and
//! background, so each fit starts from the width and offset of the last
//! accepted column. Rejected columns leave the chain untouched.

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::constants::{INITIAL_OFFSET, INITIAL_STD_DEV};
use crate::fit::{FitError, GaussianParams};

/// Width and offset carried from one accepted column to the next
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitChain {
    /// Width seed
    pub std_dev: f64,
    /// Background seed
    pub offset: f64,
}

impl Default for FitChain {
    fn default() -> Self {
        Self {
            std_dev: INITIAL_STD_DEV,
            offset: INITIAL_OFFSET,
        }
    }
}

impl FitChain {
    /// Seed for a column whose maximum is `height` at ratio `center`
    pub fn seed(&self, height: f64, center: f64) -> GaussianParams {
        GaussianParams {
            height,
            center,
            std_dev: self.std_dev,
            offset: self.offset,
        }
    }

    /// Carry an accepted fit forward
    pub fn advance(&mut self, fit: &ColumnFit) {
        self.std_dev = fit.std_dev;
        self.offset = fit.offset;
    }
}

/// Accepted Gaussian fit of one energy column
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ColumnFit {
    /// Energy bin index
    pub column: usize,
    /// Energy at the bin center (MeV)
    pub energy: f64,
    /// Fitted ratio center
    pub center: f64,
    /// Fitted width, already floored
    pub std_dev: f64,
    /// Fitted background
    pub offset: f64,
    /// Fitted height
    pub height: f64,
    /// Column mass
    pub sample_count: f64,
}

/// Per-column result of the boundary fit
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnOutcome {
    /// Fit kept for the envelope
    Accepted(ColumnFit),
    /// Column mass below the acceptance threshold
    TooFewSamples {
        /// Column mass
        count: f64,
    },
    /// Optimizer failed
    FitFailed(FitError),
    /// Fit converged to a center outside the ratio axis
    Implausible {
        /// Fitted center
        center: f64,
    },
}

impl ColumnOutcome {
    /// Accepted fit, if any
    pub fn accepted(&self) -> Option<&ColumnFit> {
        match self {
            Self::Accepted(fit) => Some(fit),
            _ => None,
        }
    }
}
