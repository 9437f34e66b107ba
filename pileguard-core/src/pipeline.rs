//! End-to-End Calibration and Pileup Correction
//!
//! ## Overview
//!
//! [`Pipeline`] runs the full chain on one channel of an [`EventSource`]:
//!
//! ```text
//! 1. calibrate      fixed law, or one fitted law per drift window
//! 2. raw pass       every calibrated event → uncut spectrum + PSD grid
//! 3. boundary       column fits on the raw grid → polygon + correction
//! 4. clean pass     events inside the polygon → clean spectrum + PSD grid
//! 5. correct        clean pair × scale_factor
//! 6. normalize      optional: all four histograms ÷ integrated beam charge
//! ```
//!
//! Passes 1, 2 and 4 are sequential scans of the source. A drift
//! calibration is computed once and shared by both classification passes.
//!
//! ## Output
//!
//! [`PipelineOutput`] holds every histogram and diagnostic. Hand it to any
//! [`OutputSink`] with [`Pipeline::run_into`]; [`MemorySink`] keeps outputs
//! in memory and, with `std`, [`JsonSink`] writes a one-line summary.

use alloc::vec::Vec;
use core::fmt;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::accumulator::SpectrumAccumulator;
use crate::boundary::{Boundary, BoundaryConfig, BoundaryFitter};
use crate::calibration::{Calibration, CalibrationEngine, WindowReport};
use crate::classifier::Classifier;
use crate::config::PipelineConfig;
use crate::errors::{PipelineError, PipelineResult};
use crate::fit::{CurveFitter, LevenbergMarquardt};
use crate::histogram::Axis;
use crate::normalization::{normalize_by_charge, BeamCurrentRecord, ChargeCurve};
use crate::source::EventSource;

/// Everything a run produces
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    /// Uncut spectrum and PSD of the channel
    pub calibrated: SpectrumAccumulator,
    /// Clean spectrum and PSD, scaled by the correction factor
    pub corrected: SpectrumAccumulator,
    /// Polygon, correction and per-column diagnostics
    pub boundary: Boundary,
    /// Calibration applied to both passes
    pub calibration: Calibration,
    /// Drift window diagnostics; empty for fixed calibrations
    pub windows: Vec<WindowReport>,
    /// Events inside the boundary
    pub accepted: u64,
    /// Events outside the boundary
    pub rejected: u64,
    /// `1 / charge` when normalized
    pub normalization: Option<f64>,
    /// Beam current against time when normalized
    pub charge_curve: Option<ChargeCurve>,
}

impl PipelineOutput {
    /// Headline numbers of the run
    pub fn summary(&self) -> PipelineSummary {
        PipelineSummary {
            events: self.calibrated.stats().seen(),
            filled: self.calibrated.stats().filled,
            zero_total: self.calibrated.stats().zero_total,
            out_of_range: self.calibrated.stats().out_of_range,
            accepted: self.accepted,
            rejected: self.rejected,
            accepted_columns: self.boundary.columns.len(),
            rejected_columns: self.boundary.rejected_columns(),
            clean_fraction: self.boundary.correction.fraction(),
            scale_factor: self.boundary.correction.scale_factor(),
            segments: self.calibration.segments().len(),
            reliable_windows: self
                .windows
                .iter()
                .filter(|w| w.condition.is_reliable())
                .count(),
            normalization: self.normalization,
        }
    }
}

/// Scalar digest of a [`PipelineOutput`]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct PipelineSummary {
    /// Channel events seen by the raw pass
    pub events: u64,
    /// Events in the raw histograms
    pub filled: u64,
    /// Events skipped for zero total integral
    pub zero_total: u64,
    /// Events outside the histogram ranges
    pub out_of_range: u64,
    /// Events inside the boundary
    pub accepted: u64,
    /// Events outside the boundary
    pub rejected: u64,
    /// Energy columns used for the boundary
    pub accepted_columns: usize,
    /// Energy columns left out of the boundary
    pub rejected_columns: usize,
    /// Raw mass fraction inside the boundary
    pub clean_fraction: f64,
    /// Factor applied to the clean histograms
    pub scale_factor: f64,
    /// Calibration segments
    pub segments: usize,
    /// Drift windows with their own fit
    pub reliable_windows: usize,
    /// `1 / charge` when normalized
    pub normalization: Option<f64>,
}

/// Consumer of pipeline results
pub trait OutputSink {
    /// Failure type of the sink
    type Error;

    /// Take one run's output
    fn accept(&mut self, output: &PipelineOutput) -> Result<(), Self::Error>;
}

/// Keeps every output in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    outputs: Vec<PipelineOutput>,
}

impl MemorySink {
    /// Empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Outputs received so far
    pub fn outputs(&self) -> &[PipelineOutput] {
        &self.outputs
    }
}

impl OutputSink for MemorySink {
    type Error = core::convert::Infallible;

    fn accept(&mut self, output: &PipelineOutput) -> Result<(), Self::Error> {
        self.outputs.push(output.clone());
        Ok(())
    }
}

/// Writes one JSON summary line per run
#[cfg(feature = "std")]
pub struct JsonSink<W: std::io::Write> {
    writer: W,
}

#[cfg(feature = "std")]
impl<W: std::io::Write> JsonSink<W> {
    /// Sink writing to `writer`
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(feature = "std")]
impl<W: std::io::Write> OutputSink for JsonSink<W> {
    type Error = crate::errors::LoadError;

    fn accept(&mut self, output: &PipelineOutput) -> Result<(), Self::Error> {
        serde_json::to_writer(&mut self.writer, &output.summary())?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Failure of [`Pipeline::run_into`]
#[derive(Debug)]
pub enum RunError<E> {
    /// The pipeline itself failed
    Pipeline(PipelineError),
    /// The sink rejected the output
    Sink(E),
}

impl<E> From<PipelineError> for RunError<E> {
    fn from(err: PipelineError) -> Self {
        Self::Pipeline(err)
    }
}

impl<E: fmt::Display> fmt::Display for RunError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pipeline(err) => write!(f, "Pipeline error: {}", err),
            Self::Sink(err) => write!(f, "Sink error: {}", err),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug + fmt::Display> std::error::Error for RunError<E> {}

/// Calibration, boundary fit and correction for one channel
#[derive(Debug, Clone)]
pub struct Pipeline<F = LevenbergMarquardt> {
    config: PipelineConfig,
    engine: CalibrationEngine,
    boundary: BoundaryConfig,
    energy_axis: Axis,
    ratio_axis: Axis,
    fitter: F,
    beam_current: Option<BeamCurrentRecord>,
}

impl Pipeline<LevenbergMarquardt> {
    /// Pipeline with the built-in optimizer
    pub fn new(config: PipelineConfig) -> PipelineResult<Self> {
        Self::with_fitter(config, LevenbergMarquardt::default())
    }
}

impl<F: CurveFitter> Pipeline<F> {
    /// Pipeline with a custom optimizer
    ///
    /// Validates the whole configuration up front.
    pub fn with_fitter(config: PipelineConfig, fitter: F) -> PipelineResult<Self> {
        config.validate()?;
        let engine = CalibrationEngine::from_config(&config.calibration, config.adc_axis.to_axis()?)?;
        Ok(Self {
            boundary: config.boundary_config(),
            energy_axis: config.energy_axis.to_axis()?,
            ratio_axis: config.ratio_axis.to_axis()?,
            engine,
            fitter,
            beam_current: None,
            config,
        })
    }

    /// Normalize outputs by the charge in `record`
    pub fn with_beam_current(mut self, record: BeamCurrentRecord) -> Self {
        self.beam_current = Some(record);
        self
    }

    /// Read a beam-current record sampled at the configured period
    #[cfg(feature = "std")]
    pub fn with_beam_current_reader<R: std::io::Read>(
        self,
        reader: R,
    ) -> Result<Self, crate::errors::LoadError> {
        let record = BeamCurrentRecord::from_reader(reader, self.config.beam_sample_seconds)?;
        Ok(self.with_beam_current(record))
    }

    /// Configuration in use
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage on `source`
    pub fn run<S>(&self, source: &S) -> PipelineResult<PipelineOutput>
    where
        S: EventSource + ?Sized,
    {
        if source.is_empty() {
            return Err(PipelineError::NoEvents {
                reason: "event source is empty",
            });
        }
        let channel = self.config.channel;

        let calibration_run = self.engine.run(source, channel, &self.fitter)?;
        let calibration = calibration_run.calibration;

        let raw = Classifier::new(&calibration, channel).classify(source, self.energy_axis, self.ratio_axis);
        if raw.dirty.stats().seen() == 0 {
            return Err(PipelineError::NoEvents {
                reason: "selected channel has no events",
            });
        }
        log_info!(
            "Raw pass: {} events filled, {} zero total, {} out of range",
            raw.dirty.stats().filled,
            raw.dirty.stats().zero_total,
            raw.dirty.stats().out_of_range
        );

        let boundary = BoundaryFitter::with_fitter(self.boundary, &self.fitter)?.build(&raw.dirty.psd)?;

        let mut classified = Classifier::new(&calibration, channel)
            .with_boundary(&boundary.polygon)
            .classify(source, self.energy_axis, self.ratio_axis);
        classified.apply_correction(&boundary.correction);

        let mut calibrated = raw.dirty;
        let mut corrected = classified.clean;

        let (normalization, charge_curve) = match &self.beam_current {
            Some(record) => {
                let factor = normalize_by_charge(record, &mut [&mut calibrated, &mut corrected])?;
                (Some(factor), Some(record.curve()))
            }
            None => (None, None),
        };

        Ok(PipelineOutput {
            calibrated,
            corrected,
            boundary,
            calibration,
            windows: calibration_run.windows,
            accepted: classified.inside,
            rejected: classified.outside,
            normalization,
            charge_curve,
        })
    }

    /// Run and hand the output to `sink`
    pub fn run_into<S, K>(&self, source: &S, sink: &mut K) -> Result<PipelineOutput, RunError<K::Error>>
    where
        S: EventSource + ?Sized,
        K: OutputSink,
    {
        let output = self.run(source)?;
        sink.accept(&output).map_err(RunError::Sink)?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AxisSpec;
    use crate::event::Event;
    use crate::source::MemoryEventSource;

    /// Deterministic band: ratio 0.2 ± small spread across energies 0.5-4.5
    fn band_events(count: usize) -> Vec<Event> {
        (0..count)
            .map(|i| {
                let energy = 0.5 + (i % 400) as f64 * 0.01;
                let ratio = 0.2 + ((i % 13) as f64 - 6.0) * 0.002;
                Event::new(i as u64, 0, energy, energy * ratio)
            })
            .collect()
    }

    fn small_config() -> PipelineConfig {
        PipelineConfig::fixed(1.0, 0.0)
            .with_energy_axis(AxisSpec { bins: 5, min: 0.0, max: 5.0 })
            .with_ratio_axis(AxisSpec { bins: 200, min: 0.0, max: 1.0 })
    }

    #[test]
    fn empty_source_is_rejected() {
        let pipeline = Pipeline::new(small_config()).unwrap();
        let events: [Event; 0] = [];
        let result = pipeline.run(&MemoryEventSource::new(&events));
        assert!(matches!(result, Err(PipelineError::NoEvents { .. })));
    }

    #[test]
    fn wrong_channel_is_rejected() {
        let pipeline = Pipeline::new(small_config().with_channel(7)).unwrap();
        let events = band_events(100);
        let result = pipeline.run(&MemoryEventSource::new(&events));
        assert_eq!(
            result.err(),
            Some(PipelineError::NoEvents { reason: "selected channel has no events" })
        );
    }

    #[test]
    fn invalid_config_fails_construction() {
        let config = small_config().with_num_stddevs(-2.0);
        assert!(Pipeline::new(config).is_err());
    }

    #[test]
    fn run_into_memory_sink() {
        let pipeline = Pipeline::new(small_config()).unwrap();
        let events = band_events(4000);
        let source = MemoryEventSource::new(&events);
        let mut sink = MemorySink::new();

        let output = pipeline.run_into(&source, &mut sink).unwrap();
        assert_eq!(sink.outputs().len(), 1);
        assert_eq!(output.accepted + output.rejected, 4000);
        assert!(output.accepted > output.rejected);

        let summary = output.summary();
        assert_eq!(summary.events, 4000);
        assert!(summary.scale_factor >= 1.0);
        assert_eq!(summary.segments, 1);
        assert!(summary.normalization.is_none());
    }

    #[test]
    fn beam_current_normalizes_all_outputs() {
        let events = band_events(4000);
        let source = MemoryEventSource::new(&events);

        let plain = Pipeline::new(small_config()).unwrap().run(&source).unwrap();
        let record = BeamCurrentRecord::new(vec![20.0; 10], 0.05).unwrap();
        let normalized = Pipeline::new(small_config())
            .unwrap()
            .with_beam_current(record)
            .run(&source)
            .unwrap();

        // 10 samples × 20 A × 0.05 s = 10 C
        let factor = normalized.normalization.unwrap();
        assert!((factor - 0.1).abs() < 1e-12);
        let ratio = normalized.calibrated.energy.integral() / plain.calibrated.energy.integral();
        assert!((ratio - 0.1).abs() < 1e-9);
        let ratio = normalized.corrected.psd.total() / plain.corrected.psd.total();
        assert!((ratio - 0.1).abs() < 1e-9);
        assert_eq!(normalized.charge_curve.map(|c| c.time_s.len()), Some(10));
    }

    #[cfg(feature = "std")]
    #[test]
    fn json_sink_writes_summary_line() {
        let pipeline = Pipeline::new(small_config()).unwrap();
        let events = band_events(4000);
        let mut sink = JsonSink::new(Vec::new());

        pipeline.run_into(&MemoryEventSource::new(&events), &mut sink).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert!(text.ends_with('\n'));
        assert!(text.contains("\"scale_factor\""));
    }
}
