//! Drift-Tracking Calibration
//!
//! ## Why Windows?
//!
//! Photomultiplier gain wanders with temperature and rate over a run, so a
//! single calibration smears every line. Splitting the run into fixed time
//! windows and re-locating the calibration peaks in each one follows the
//! drift at the cost of statistics per window.
//!
//! ## Per-Window Procedure
//!
//! ```text
//! events in [start, start + w) ─→ raw integral histogram (reused, reset)
//!                                        │
//!           for each peak range:  max bin ─→ mean of ±5 bins = centroid
//!                                        │
//!      (centroid₁, E₁) (centroid₂, E₂) (centroid₃, E₃) ─→ line fit
//! ```
//!
//! Windows start at the first event's timestamp and advance by exactly one
//! width until the last event is covered. Events are consumed in one forward
//! sweep; each window resumes where the previous one stopped.
//!
//! ## Failed Windows
//!
//! A window with no events of the channel (`NoEvents`) or with an empty
//! peak range (`EmptyPeak`) is a data condition. A line fit that fails or
//! yields a non-positive gain (`ImplausibleFit`) is a numerical condition.
//! Windows without usable coefficients borrow them from the nearest
//! reliable window, preferring the previous one. A finite implausible fit
//! keeps its own coefficients and is only flagged.

use alloc::vec::Vec;

#[cfg(feature = "serde")]
use serde::Serialize;

use super::peaks::{PeakBounds, PeakRange};
use super::{Calibration, CalibrationRun, CalibrationSegment};
use crate::constants::{PEAK_COUNT, PEAK_NEIGHBORHOOD_BINS};
use crate::errors::{PipelineError, PipelineResult};
use crate::event::Timestamp;
use crate::fit::{CurveFitter, LineParams};
use crate::histogram::{Axis, Histogram1D};
use crate::source::EventSource;

/// Windowing and peak parameters for drift tracking
#[derive(Debug, Clone, PartialEq)]
pub struct DriftConfig {
    window_ticks: u64,
    peak_bounds: PeakBounds,
    reference_energies: [f64; PEAK_COUNT],
    adc_axis: Axis,
}

impl DriftConfig {
    /// Window length in seconds converted with the digitizer tick length
    pub fn new(
        window_seconds: f64,
        tick_seconds: f64,
        peak_bounds: PeakBounds,
        reference_energies: [f64; PEAK_COUNT],
        adc_axis: Axis,
    ) -> PipelineResult<Self> {
        if !(tick_seconds > 0.0) || !tick_seconds.is_finite() {
            return Err(PipelineError::InvalidConfig {
                reason: "tick length must be positive",
            });
        }
        if !(window_seconds > 0.0) || !window_seconds.is_finite() {
            return Err(PipelineError::InvalidConfig {
                reason: "window length must be positive",
            });
        }
        if reference_energies.iter().any(|e| !e.is_finite()) {
            return Err(PipelineError::InvalidConfig {
                reason: "reference energies must be finite",
            });
        }
        let ticks = libm::round(window_seconds / tick_seconds);
        if !(ticks >= 1.0) || ticks >= u64::MAX as f64 {
            return Err(PipelineError::InvalidConfig {
                reason: "window must span at least one tick",
            });
        }
        Ok(Self {
            window_ticks: ticks as u64,
            peak_bounds,
            reference_energies,
            adc_axis,
        })
    }

    /// Window length in ticks
    pub fn window_ticks(&self) -> u64 {
        self.window_ticks
    }

    /// Peak search ranges
    pub fn peak_bounds(&self) -> &PeakBounds {
        &self.peak_bounds
    }

    /// Energies the peaks are matched to (MeV)
    pub fn reference_energies(&self) -> &[f64; PEAK_COUNT] {
        &self.reference_energies
    }
}

/// Outcome of one calibration window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum WindowCondition {
    /// All peaks found, plausible fit
    Reliable,
    /// No events of the channel in the window
    NoEvents,
    /// Peak range `peak` held no counts
    EmptyPeak {
        /// Zero-based peak index
        peak: usize,
    },
    /// Line fit failed or has non-positive gain
    ImplausibleFit,
}

impl WindowCondition {
    /// Check if the window produced its own coefficients
    pub fn is_reliable(&self) -> bool {
        matches!(self, Self::Reliable)
    }

    /// Check if the failure came from missing data rather than a bad fit
    pub fn is_data_condition(&self) -> bool {
        matches!(self, Self::NoEvents | Self::EmptyPeak { .. })
    }
}

/// Diagnostics for one calibration window
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct WindowReport {
    /// First tick of the window
    pub time_start: Timestamp,
    /// First tick past the window
    pub time_end: Timestamp,
    /// Channel events inside the window
    pub events: usize,
    /// Peak centroids (ADC units), `None` for empty ranges
    pub centroids: [Option<f64>; PEAK_COUNT],
    /// Classification of the window
    pub condition: WindowCondition,
    /// Fitted `(slope, intercept)` before any substitution
    pub fitted: Option<(f64, f64)>,
}

/// Windowed calibrator owning the reusable raw integral histogram
pub struct DriftCalibrator {
    config: DriftConfig,
    histogram: Histogram1D,
}

impl DriftCalibrator {
    /// Create a calibrator
    pub fn new(config: DriftConfig) -> Self {
        let histogram = Histogram1D::new(config.adc_axis);
        Self { config, histogram }
    }

    /// Configuration in use
    pub fn config(&self) -> &DriftConfig {
        &self.config
    }

    /// Fit one calibration per window of `channel`
    ///
    /// Errors with `NoEvents` when the source or the channel is empty. When
    /// no window produced a usable fit, errors with `PeaksNotFound` if every
    /// failure was missing data, and with `UnreliableCalibration` if any
    /// line fit failed.
    pub fn calibrate<S, F>(
        &mut self,
        source: &S,
        channel: i32,
        fitter: &F,
    ) -> PipelineResult<CalibrationRun>
    where
        S: EventSource + ?Sized,
        F: CurveFitter + ?Sized,
    {
        let (Some(time_first), Some(time_last)) =
            (source.first_timestamp(), source.last_timestamp())
        else {
            return Err(PipelineError::NoEvents {
                reason: "event source is empty",
            });
        };

        let width = self.config.window_ticks;
        let mut reports = Vec::new();
        let mut coefficients: Vec<Option<LineParams>> = Vec::new();
        let mut index = 0;
        let mut start = time_first;

        loop {
            let end = start.saturating_add(width);
            self.histogram.reset();
            let mut events = 0;

            while let Some(event) = source.get(index) {
                if event.timestamp >= end && end != Timestamp::MAX {
                    break;
                }
                index += 1;
                if event.channel != channel || event.timestamp < start {
                    continue;
                }
                self.histogram.fill(event.total_integral);
                events += 1;
            }

            let (report, fitted) = self.evaluate_window(start, end, events, fitter);
            match report.condition {
                WindowCondition::Reliable => {
                    log_debug!(
                        "Window {} [{}, {}): slope {:.6e}, intercept {:.4}",
                        reports.len(),
                        start,
                        end,
                        report.fitted.map_or(0.0, |(s, _)| s),
                        report.fitted.map_or(0.0, |(_, i)| i)
                    );
                }
                condition => {
                    log_warn!(
                        "Window {} [{}, {}) not reliable: {:?} ({} events)",
                        reports.len(),
                        start,
                        end,
                        condition,
                        events
                    );
                }
            }
            reports.push(report);
            coefficients.push(fitted);

            if end > time_last || end == Timestamp::MAX {
                break;
            }
            start = end;
        }

        let reliable = reports.iter().filter(|r| r.condition.is_reliable()).count();
        if reliable == 0 {
            if reports.iter().all(|r| r.condition == WindowCondition::NoEvents) {
                return Err(PipelineError::NoEvents {
                    reason: "selected channel has no events",
                });
            }
            let failed = reports
                .iter()
                .filter(|r| !r.condition.is_data_condition())
                .count();
            if failed == 0 {
                let empty = reports
                    .iter()
                    .filter(|r| matches!(r.condition, WindowCondition::EmptyPeak { .. }))
                    .count();
                return Err(PipelineError::PeaksNotFound {
                    windows: reports.len(),
                    empty,
                });
            }
            return Err(PipelineError::UnreliableCalibration {
                windows: reports.len(),
                failed,
            });
        }

        fill_from_neighbors(&reports, &mut coefficients);

        let mut segments = Vec::with_capacity(reports.len());
        for (report, line) in reports.iter().zip(&coefficients) {
            // Every gap was filled from a reliable window above
            let Some(line) = line else {
                return Err(PipelineError::UnreliableCalibration {
                    windows: reports.len(),
                    failed: reports.len() - reliable,
                });
            };
            segments.push(CalibrationSegment {
                time_start: report.time_start,
                time_end: report.time_end,
                slope: line.slope,
                intercept: line.intercept,
            });
        }

        log_info!(
            "Drift calibration: {} windows, {} reliable",
            reports.len(),
            reliable
        );

        Ok(CalibrationRun {
            calibration: Calibration::from_segments(segments)?,
            windows: reports,
        })
    }

    /// Locate peaks and fit the window; returns usable coefficients if any
    fn evaluate_window<F>(
        &self,
        time_start: Timestamp,
        time_end: Timestamp,
        events: usize,
        fitter: &F,
    ) -> (WindowReport, Option<LineParams>)
    where
        F: CurveFitter + ?Sized,
    {
        let mut report = WindowReport {
            time_start,
            time_end,
            events,
            centroids: [None; PEAK_COUNT],
            condition: WindowCondition::NoEvents,
            fitted: None,
        };
        if events == 0 {
            return (report, None);
        }

        for (peak, range) in self.config.peak_bounds.ranges().iter().enumerate() {
            report.centroids[peak] = peak_centroid(&self.histogram, range);
        }
        let mut centroids = [0.0; PEAK_COUNT];
        for (peak, centroid) in report.centroids.iter().enumerate() {
            match centroid {
                Some(value) => centroids[peak] = *value,
                None => {
                    report.condition = WindowCondition::EmptyPeak { peak };
                    return (report, None);
                }
            }
        }

        match fitter.fit_line(&centroids, &self.config.reference_energies) {
            Ok(line) => {
                report.fitted = Some((line.slope, line.intercept));
                report.condition = if line.slope > 0.0 {
                    WindowCondition::Reliable
                } else {
                    WindowCondition::ImplausibleFit
                };
                (report, Some(line))
            }
            Err(_) => {
                report.condition = WindowCondition::ImplausibleFit;
                (report, None)
            }
        }
    }
}

/// Mean of bin centers within ±5 bins of the range maximum
///
/// `None` when the range is off the axis or holds no counts.
pub fn peak_centroid(histogram: &Histogram1D, range: &PeakRange) -> Option<f64> {
    let axis = histogram.axis();
    let (first, last) = axis.bin_range(range.lower as f64, range.upper as f64)?;
    if histogram.integral_range(first, last) <= 0.0 {
        return None;
    }
    let peak = histogram.maximum_bin(first, last)?;
    let low = peak.saturating_sub(PEAK_NEIGHBORHOOD_BINS);
    let high = (peak + PEAK_NEIGHBORHOOD_BINS).min(axis.bins() - 1);
    histogram.mean_in(low, high)
}

/// Give every window without coefficients those of the nearest reliable one
fn fill_from_neighbors(reports: &[WindowReport], coefficients: &mut [Option<LineParams>]) {
    let mut previous = None;
    for (report, line) in reports.iter().zip(coefficients.iter_mut()) {
        if report.condition.is_reliable() {
            previous = *line;
        } else if line.is_none() {
            *line = previous;
        }
    }

    let mut next = None;
    for (report, line) in reports.iter().zip(coefficients.iter_mut()).rev() {
        if report.condition.is_reliable() {
            next = *line;
        } else if line.is_none() {
            *line = next;
        }
    }
}
