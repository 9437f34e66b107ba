//! Pileup correction factor
//!
//! With `f` the fraction of the raw PSD mass inside the boundary, the
//! clean spectrum is scaled by
//!
//! ```text
//! scale = (1 − ln f) / f
//! ```
//!
//! which restores the events lost to pileup assuming Poisson arrivals:
//! `1/f` undoes the cut and `−ln f / f` accounts for pulses that were
//! absorbed into a pileup partner.

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::errors::{PipelineError, PipelineResult};

/// Clean fraction and the scale it implies
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct CorrectionFactor {
    num_clean: f64,
    num_total: f64,
    fraction: f64,
    scale_factor: f64,
}

impl CorrectionFactor {
    /// Factor from the mass inside the boundary and the total mass
    ///
    /// Zero, negative or non-finite counts give `DegenerateCorrection`.
    pub fn from_counts(num_clean: f64, num_total: f64) -> PipelineResult<Self> {
        let degenerate = PipelineError::DegenerateCorrection { num_clean, num_total };
        if !(num_clean > 0.0) || !(num_total > 0.0) || !num_total.is_finite() {
            return Err(degenerate);
        }
        Self::from_fraction(num_clean / num_total)
            .map(|factor| Self {
                num_clean,
                num_total,
                ..factor
            })
            .map_err(|_| degenerate)
    }

    /// Factor from the clean fraction alone
    pub fn from_fraction(fraction: f64) -> PipelineResult<Self> {
        if !(fraction > 0.0) || !fraction.is_finite() {
            return Err(PipelineError::DegenerateCorrection {
                num_clean: fraction,
                num_total: 1.0,
            });
        }
        let scale_factor = (1.0 - libm::log(fraction)) / fraction;
        Ok(Self {
            num_clean: fraction,
            num_total: 1.0,
            fraction,
            scale_factor,
        })
    }

    /// Mass inside the boundary
    pub fn num_clean(&self) -> f64 {
        self.num_clean
    }

    /// Total mass
    pub fn num_total(&self) -> f64 {
        self.num_total
    }

    /// `num_clean / num_total`
    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    /// `(1 − ln fraction) / fraction`
    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }
}
