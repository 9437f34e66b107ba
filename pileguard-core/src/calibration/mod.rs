//! Energy Calibration
//!
//! ## Overview
//!
//! A calibration maps a raw total integral to energy with an affine law,
//! `E = slope·total + intercept`, chosen by the event's timestamp. It is an
//! ordered list of [`CalibrationSegment`]s, each valid on a half-open time
//! interval.
//!
//! ```text
//! fixed:  [0 ──────────────────────────────── u64::MAX]   one segment
//! drift:  [t0 ── w1 ──)[── w2 ──)[── w3 ──) … [── wn ──)  one per window
//! ```
//!
//! ## Modes
//!
//! - **Fixed**: one segment over all time; no fitting. Timestamps equal to
//!   `u64::MAX` also map to it.
//! - **Drift tracking**: one segment per time window, each fitted from the
//!   calibration peaks seen in that window. See [`drift`].
//!
//! ## Lookup
//!
//! Events are processed in time order, so lookups go through a
//! [`SegmentCursor`] that first tries the current segment, then its
//! successor, and only falls back to a binary search on a jump.

pub mod drift;
pub mod peaks;

pub use drift::{DriftCalibrator, DriftConfig, WindowCondition, WindowReport};
pub use peaks::{PeakBounds, PeakRange};

use alloc::vec;
use alloc::vec::Vec;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::config::CalibrationConfig;
use crate::errors::{PipelineError, PipelineResult};
use crate::event::Timestamp;
use crate::fit::CurveFitter;
use crate::histogram::Axis;
use crate::source::EventSource;

/// Affine calibration valid on `[time_start, time_end)`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct CalibrationSegment {
    /// First covered tick
    pub time_start: Timestamp,
    /// First tick past the segment; `u64::MAX` is itself covered
    pub time_end: Timestamp,
    /// MeV per ADC unit
    pub slope: f64,
    /// MeV
    pub intercept: f64,
}

impl CalibrationSegment {
    /// Check if `timestamp` falls in this segment
    pub fn contains(&self, timestamp: Timestamp) -> bool {
        timestamp >= self.time_start
            && (timestamp < self.time_end || self.time_end == Timestamp::MAX)
    }

    /// Energy of a raw total integral
    pub fn apply(&self, total_integral: f64) -> f64 {
        self.slope * total_integral + self.intercept
    }
}

/// Time-ordered calibration segments
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Calibration {
    segments: Vec<CalibrationSegment>,
}

impl Calibration {
    /// One segment covering all time
    pub fn fixed(slope: f64, intercept: f64) -> Self {
        Self {
            segments: vec![CalibrationSegment {
                time_start: 0,
                time_end: Timestamp::MAX,
                slope,
                intercept,
            }],
        }
    }

    /// Validate and wrap drift segments
    ///
    /// Segments must be non-empty, each with `time_start < time_end`, and
    /// contiguous: every segment starts where the previous one ends.
    pub fn from_segments(segments: Vec<CalibrationSegment>) -> PipelineResult<Self> {
        if segments.is_empty() {
            return Err(PipelineError::InvalidConfig {
                reason: "calibration needs at least one segment",
            });
        }
        if segments.iter().any(|s| s.time_start >= s.time_end) {
            return Err(PipelineError::InvalidConfig {
                reason: "calibration segment is empty",
            });
        }
        if segments.windows(2).any(|pair| pair[0].time_end != pair[1].time_start) {
            return Err(PipelineError::InvalidConfig {
                reason: "calibration segments must be contiguous",
            });
        }
        Ok(Self { segments })
    }

    /// All segments in time order
    pub fn segments(&self) -> &[CalibrationSegment] {
        &self.segments
    }

    /// Segment covering `timestamp`
    pub fn segment_for(&self, timestamp: Timestamp) -> Option<&CalibrationSegment> {
        self.position_of(timestamp).map(|index| &self.segments[index])
    }

    fn position_of(&self, timestamp: Timestamp) -> Option<usize> {
        let index = self
            .segments
            .partition_point(|segment| segment.time_end <= timestamp && segment.time_end != Timestamp::MAX);
        let segment = self.segments.get(index)?;
        segment.contains(timestamp).then_some(index)
    }

    /// Forward lookup cursor starting at the first segment
    pub fn cursor(&self) -> SegmentCursor<'_> {
        SegmentCursor {
            calibration: self,
            index: 0,
        }
    }
}

/// Lookup cursor tuned for ascending timestamps
#[derive(Debug, Clone)]
pub struct SegmentCursor<'a> {
    calibration: &'a Calibration,
    index: usize,
}

impl<'a> SegmentCursor<'a> {
    /// Segment covering `timestamp`, `None` if uncovered
    pub fn segment_for(&mut self, timestamp: Timestamp) -> Option<&'a CalibrationSegment> {
        let segments = &self.calibration.segments;

        if let Some(segment) = segments.get(self.index) {
            if segment.contains(timestamp) {
                return Some(segment);
            }
        }
        if let Some(next) = segments.get(self.index + 1) {
            if next.contains(timestamp) {
                self.index += 1;
                return Some(next);
            }
        }

        let index = self.calibration.position_of(timestamp)?;
        self.index = index;
        segments.get(index)
    }
}

/// Calibration produced by one engine run
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationRun {
    /// Segments to apply
    pub calibration: Calibration,
    /// Per-window diagnostics; empty in fixed mode
    pub windows: Vec<WindowReport>,
}

/// Builds a calibration in fixed or drift-tracking mode
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationEngine {
    /// One affine law for the whole run
    Fixed {
        /// MeV per ADC unit
        slope: f64,
        /// MeV
        intercept: f64,
    },
    /// One fitted law per time window
    DriftTracking(DriftConfig),
}

impl CalibrationEngine {
    /// Engine for a calibration configuration
    ///
    /// `adc_axis` bins the raw integrals of each drift window.
    pub fn from_config(config: &CalibrationConfig, adc_axis: Axis) -> PipelineResult<Self> {
        match config {
            CalibrationConfig::Fixed { slope, intercept } => {
                if !slope.is_finite() || !intercept.is_finite() {
                    return Err(PipelineError::InvalidConfig {
                        reason: "fixed calibration must be finite",
                    });
                }
                Ok(Self::Fixed {
                    slope: *slope,
                    intercept: *intercept,
                })
            }
            CalibrationConfig::DriftTracking {
                window_seconds,
                tick_seconds,
                peak_bounds,
                reference_energies,
            } => {
                let bounds = match peak_bounds {
                    Some(values) => PeakBounds::from_values(values),
                    None => PeakBounds::defaults(),
                };
                let drift = DriftConfig::new(
                    *window_seconds,
                    *tick_seconds,
                    bounds,
                    *reference_energies,
                    adc_axis,
                )?;
                Ok(Self::DriftTracking(drift))
            }
        }
    }

    /// Check if the engine fits windows
    pub fn is_drift_tracking(&self) -> bool {
        matches!(self, Self::DriftTracking(_))
    }

    /// Calibrate `channel` of `source`
    ///
    /// Drift mode makes one forward pass over the source.
    pub fn run<S, F>(&self, source: &S, channel: i32, fitter: &F) -> PipelineResult<CalibrationRun>
    where
        S: EventSource + ?Sized,
        F: CurveFitter + ?Sized,
    {
        match self {
            Self::Fixed { slope, intercept } => Ok(CalibrationRun {
                calibration: Calibration::fixed(*slope, *intercept),
                windows: Vec::new(),
            }),
            Self::DriftTracking(config) => {
                let mut calibrator = DriftCalibrator::new(config.clone());
                calibrator.calibrate(source, channel, fitter)
            }
        }
    }
}
