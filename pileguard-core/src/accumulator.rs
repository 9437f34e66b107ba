//! Calibrated Spectrum Accumulation
//!
//! Every event that reaches a histogram goes through the same three checks,
//! in order:
//!
//! 1. `total_integral == 0` (or non-finite integrals): no ratio, skipped
//! 2. no calibration segment covers the timestamp: skipped
//! 3. energy or ratio outside the axes: dropped
//!
//! Each outcome is returned as an [`AccumulateOutcome`] and tallied in
//! [`AccumulatorStats`], so nothing is lost silently.

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::calibration::SegmentCursor;
use crate::event::Event;
use crate::histogram::{Axis, DensityGrid, Histogram1D};

/// What happened to one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulateOutcome {
    /// Counted in the histograms
    Filled,
    /// Zero total integral; carries no ratio
    ZeroTotal,
    /// No calibration segment covers the timestamp
    Uncalibrated,
    /// Energy or ratio outside the histogram range
    OutOfRange,
    /// Calibrated point outside the clean-event boundary
    OutsideBoundary,
}

/// Event mapped to (energy, ratio)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibratedPoint {
    /// Calibrated energy (MeV)
    pub energy: f64,
    /// Tail-to-total ratio
    pub ratio: f64,
}

/// Calibrate one event, or say why it cannot be
pub fn calibrate_point(
    event: &Event,
    cursor: &mut SegmentCursor<'_>,
) -> Result<CalibratedPoint, AccumulateOutcome> {
    let ratio = event.ratio().ok_or(AccumulateOutcome::ZeroTotal)?;
    let segment = cursor
        .segment_for(event.timestamp)
        .ok_or(AccumulateOutcome::Uncalibrated)?;
    Ok(CalibratedPoint {
        energy: segment.apply(event.total_integral),
        ratio,
    })
}

/// Add one event to `grid`
pub fn accumulate(
    event: &Event,
    cursor: &mut SegmentCursor<'_>,
    grid: &mut DensityGrid,
) -> AccumulateOutcome {
    match calibrate_point(event, cursor) {
        Ok(point) if grid.fill(point.energy, point.ratio) => AccumulateOutcome::Filled,
        Ok(_) => AccumulateOutcome::OutOfRange,
        Err(outcome) => outcome,
    }
}

/// Outcome tallies of an accumulator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct AccumulatorStats {
    /// Events counted
    pub filled: u64,
    /// Events skipped for zero total integral
    pub zero_total: u64,
    /// Events outside every calibration segment
    pub uncalibrated: u64,
    /// Events outside the histogram ranges
    pub out_of_range: u64,
    /// Events rejected by the boundary cut
    pub outside_boundary: u64,
}

impl AccumulatorStats {
    /// Tally one outcome
    pub fn record(&mut self, outcome: AccumulateOutcome) {
        match outcome {
            AccumulateOutcome::Filled => self.filled += 1,
            AccumulateOutcome::ZeroTotal => self.zero_total += 1,
            AccumulateOutcome::Uncalibrated => self.uncalibrated += 1,
            AccumulateOutcome::OutOfRange => self.out_of_range += 1,
            AccumulateOutcome::OutsideBoundary => self.outside_boundary += 1,
        }
    }

    /// Events seen in total
    pub fn seen(&self) -> u64 {
        self.filled + self.zero_total + self.uncalibrated + self.out_of_range + self.outside_boundary
    }
}

/// Energy spectrum paired with its PSD grid
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SpectrumAccumulator {
    /// Calibrated energy spectrum
    pub energy: Histogram1D,
    /// Energy × ratio counts
    pub psd: DensityGrid,
    stats: AccumulatorStats,
}

impl SpectrumAccumulator {
    /// Empty accumulator
    pub fn new(energy_axis: Axis, ratio_axis: Axis) -> Self {
        Self {
            energy: Histogram1D::new(energy_axis),
            psd: DensityGrid::new(energy_axis, ratio_axis),
            stats: AccumulatorStats::default(),
        }
    }

    /// Calibrate and count one event
    pub fn accumulate(&mut self, event: &Event, cursor: &mut SegmentCursor<'_>) -> AccumulateOutcome {
        let outcome = match calibrate_point(event, cursor) {
            Ok(point) => self.fill(point),
            Err(outcome) => outcome,
        };
        self.stats.record(outcome);
        outcome
    }

    /// Count an already calibrated point
    ///
    /// The spectrum only counts points that also land in the grid, so both
    /// always hold the same events.
    pub fn fill(&mut self, point: CalibratedPoint) -> AccumulateOutcome {
        if self.psd.fill(point.energy, point.ratio) {
            self.energy.fill(point.energy);
            AccumulateOutcome::Filled
        } else {
            AccumulateOutcome::OutOfRange
        }
    }

    /// Tally an outcome decided elsewhere
    pub fn record(&mut self, outcome: AccumulateOutcome) {
        self.stats.record(outcome);
    }

    /// Outcome tallies
    pub fn stats(&self) -> &AccumulatorStats {
        &self.stats
    }

    /// Scale both histograms, switching on variance tracking
    pub fn scale(&mut self, factor: f64) {
        self.energy.scale(factor);
        self.psd.scale(factor);
    }

    /// Zero both histograms and the tallies
    pub fn reset(&mut self) {
        self.energy.reset();
        self.psd.reset();
        self.stats = AccumulatorStats::default();
    }
}
