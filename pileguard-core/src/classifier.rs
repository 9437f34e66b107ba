//! Clean / pileup event classification
//!
//! Walks the source once with a fixed calibration:
//!
//! - no boundary yet: every calibrated event goes to the uncut (`dirty`)
//!   accumulator, which is the raw PSD the boundary is fitted on
//! - with a boundary: events inside the polygon go to the `clean`
//!   accumulator, events outside are only counted
//!
//! The correction factor is applied to the clean accumulator afterwards
//! with [`Classification::apply_correction`].

use crate::accumulator::{calibrate_point, AccumulateOutcome, SpectrumAccumulator};
use crate::boundary::{BoundaryPolygon, CorrectionFactor};
use crate::calibration::Calibration;
use crate::histogram::Axis;
use crate::source::EventSource;

/// Result of one classification pass
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Events inside the boundary
    pub clean: SpectrumAccumulator,
    /// Every calibrated event when no boundary was given
    pub dirty: SpectrumAccumulator,
    /// Events inside the boundary
    pub inside: u64,
    /// Events outside the boundary
    pub outside: u64,
}

impl Classification {
    /// Scale the clean accumulator by the pileup correction
    pub fn apply_correction(&mut self, correction: &CorrectionFactor) {
        self.clean.scale(correction.scale_factor());
    }
}

/// Sorts calibrated events of one channel by a boundary
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    calibration: &'a Calibration,
    boundary: Option<&'a BoundaryPolygon>,
    channel: i32,
}

impl<'a> Classifier<'a> {
    /// Classifier without a boundary; fills only the uncut accumulator
    pub fn new(calibration: &'a Calibration, channel: i32) -> Self {
        Self {
            calibration,
            boundary: None,
            channel,
        }
    }

    /// Use `boundary` to separate clean events
    pub fn with_boundary(mut self, boundary: &'a BoundaryPolygon) -> Self {
        self.boundary = Some(boundary);
        self
    }

    /// One pass over `source`
    pub fn classify<S>(&self, source: &S, energy_axis: Axis, ratio_axis: Axis) -> Classification
    where
        S: EventSource + ?Sized,
    {
        let mut result = Classification {
            clean: SpectrumAccumulator::new(energy_axis, ratio_axis),
            dirty: SpectrumAccumulator::new(energy_axis, ratio_axis),
            inside: 0,
            outside: 0,
        };
        let mut cursor = self.calibration.cursor();

        for event in source.iter().filter(|e| e.channel == self.channel) {
            let point = match calibrate_point(&event, &mut cursor) {
                Ok(point) => point,
                Err(outcome) => {
                    match self.boundary {
                        None => result.dirty.record(outcome),
                        Some(_) => result.clean.record(outcome),
                    }
                    continue;
                }
            };

            match self.boundary {
                None => {
                    let outcome = result.dirty.fill(point);
                    result.dirty.record(outcome);
                }
                Some(polygon) if polygon.contains(point.energy, point.ratio) => {
                    result.inside += 1;
                    let outcome = result.clean.fill(point);
                    result.clean.record(outcome);
                }
                Some(_) => {
                    result.outside += 1;
                    result.clean.record(AccumulateOutcome::OutsideBoundary);
                }
            }
        }

        log_info!(
            "Classified channel {}: {} inside, {} outside",
            self.channel,
            result.inside,
            result.outside
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::source::MemoryEventSource;

    fn axes() -> (Axis, Axis) {
        (Axis::new(10, 0.0, 10.0).unwrap(), Axis::new(100, 0.0, 1.0).unwrap())
    }

    fn events() -> Vec<Event> {
        vec![
            Event::new(0, 0, 2.0, 0.4),  // ratio 0.2
            Event::new(1, 0, 4.0, 0.8),  // ratio 0.2
            Event::new(2, 0, 3.0, 1.8),  // ratio 0.6
            Event::new(3, 1, 3.0, 0.6),  // other channel
            Event::new(4, 0, 0.0, 0.0),  // zero total
        ]
    }

    #[test]
    fn without_boundary_fills_dirty() {
        let (x, y) = axes();
        let calibration = Calibration::fixed(1.0, 0.0);
        let events = events();
        let source = MemoryEventSource::new(&events);

        let result = Classifier::new(&calibration, 0).classify(&source, x, y);
        assert_eq!(result.dirty.psd.total(), 3.0);
        assert_eq!(result.dirty.stats().zero_total, 1);
        assert_eq!(result.clean.psd.total(), 0.0);
        assert_eq!((result.inside, result.outside), (0, 0));
    }

    #[test]
    fn boundary_splits_clean_and_rejected() {
        let (x, y) = axes();
        let calibration = Calibration::fixed(1.0, 0.0);
        let polygon =
            BoundaryPolygon::from_envelopes(&[1.0, 5.0], &[0.3, 0.3], &[0.1, 0.1]);
        let events = events();
        let source = MemoryEventSource::new(&events);

        let result = Classifier::new(&calibration, 0)
            .with_boundary(&polygon)
            .classify(&source, x, y);

        assert_eq!(result.inside, 2);
        assert_eq!(result.outside, 1);
        assert_eq!(result.clean.energy.integral(), 2.0);

        let stats = result.clean.stats();
        assert_eq!(stats.filled, 2);
        assert_eq!(stats.outside_boundary, 1);
        assert_eq!(stats.out_of_range, 0);
        assert_eq!(stats.seen(), 4);
        assert_eq!(result.dirty.psd.total(), 0.0);
    }

    #[test]
    fn correction_scales_clean_only() {
        let (x, y) = axes();
        let calibration = Calibration::fixed(1.0, 0.0);
        let polygon =
            BoundaryPolygon::from_envelopes(&[1.0, 5.0], &[0.3, 0.3], &[0.1, 0.1]);
        let events = events();
        let source = MemoryEventSource::new(&events);

        let mut result = Classifier::new(&calibration, 0)
            .with_boundary(&polygon)
            .classify(&source, x, y);
        let correction = CorrectionFactor::from_fraction(0.5).unwrap();
        result.apply_correction(&correction);

        let expected = 2.0 * correction.scale_factor();
        assert!((result.clean.energy.integral() - expected).abs() < 1e-9);
        assert!(result.clean.energy.tracks_variance());
    }
}
