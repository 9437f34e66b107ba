//! Beam-charge normalization
//!
//! Runs with different beam exposure are compared per unit of delivered
//! charge. The beam-current monitor writes one comma-separated row per
//! sample; the third column is the current in amperes:
//!
//! ```text
//! 12:00:00.000,run42,1.95e-6
//! 12:00:00.050,run42,2.01e-6
//! ```
//!
//! The integrated charge is `Σ current · period`, and every output
//! histogram is scaled by `1 / charge`, giving counts per coulomb.

use alloc::vec::Vec;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::accumulator::SpectrumAccumulator;
use crate::constants::BEAM_CURRENT_COLUMN;
use crate::errors::{PipelineError, PipelineResult};

/// Beam current sampled at a fixed period
#[derive(Debug, Clone, PartialEq)]
pub struct BeamCurrentRecord {
    samples: Vec<f64>,
    sample_period: f64,
}

/// Beam current against time, for plotting next to the spectra
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ChargeCurve {
    /// Sample times (s), starting at zero
    pub time_s: Vec<f64>,
    /// Beam current (A)
    pub current_a: Vec<f64>,
}

impl BeamCurrentRecord {
    /// Record from samples already in memory
    pub fn new(samples: Vec<f64>, sample_period: f64) -> PipelineResult<Self> {
        if !(sample_period > 0.0) || !sample_period.is_finite() {
            return Err(PipelineError::InvalidConfig {
                reason: "beam sample period must be positive",
            });
        }
        Ok(Self {
            samples,
            sample_period,
        })
    }

    /// Parse comma-separated monitor rows
    ///
    /// Blank lines are skipped. A row without a numeric third column is
    /// `MalformedRecord` with its 1-based line number.
    pub fn parse(text: &str, sample_period: f64) -> PipelineResult<Self> {
        let mut samples = Vec::new();
        for (index, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let current = line
                .split(',')
                .nth(BEAM_CURRENT_COLUMN)
                .and_then(|field| field.trim().parse::<f64>().ok())
                .filter(|value| value.is_finite())
                .ok_or(PipelineError::MalformedRecord { line: index + 1 })?;
            samples.push(current);
        }
        Self::new(samples, sample_period)
    }

    /// Read and parse a monitor file
    #[cfg(feature = "std")]
    pub fn from_reader<R: std::io::Read>(
        mut reader: R,
        sample_period: f64,
    ) -> Result<Self, crate::errors::LoadError> {
        let mut text = alloc::string::String::new();
        reader.read_to_string(&mut text)?;
        Ok(Self::parse(&text, sample_period)?)
    }

    /// Current samples (A)
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Seconds between samples
    pub fn sample_period(&self) -> f64 {
        self.sample_period
    }

    /// Delivered charge (C)
    pub fn integrated_charge(&self) -> f64 {
        self.samples.iter().map(|current| current * self.sample_period).sum()
    }

    /// Current against time
    pub fn curve(&self) -> ChargeCurve {
        ChargeCurve {
            time_s: (0..self.samples.len())
                .map(|i| i as f64 * self.sample_period)
                .collect(),
            current_a: self.samples.clone(),
        }
    }
}

/// Scale every accumulator to counts per coulomb
///
/// Returns the applied factor `1 / charge`.
pub fn normalize_by_charge(
    record: &BeamCurrentRecord,
    targets: &mut [&mut SpectrumAccumulator],
) -> PipelineResult<f64> {
    let charge = record.integrated_charge();
    if !(charge > 0.0) || !charge.is_finite() {
        return Err(PipelineError::DegenerateNormalization { charge });
    }
    let factor = 1.0 / charge;
    for target in targets.iter_mut() {
        target.scale(factor);
    }
    log_info!("Normalized to {:.6e} C ({} samples)", charge, record.samples.len());
    Ok(factor)
}
