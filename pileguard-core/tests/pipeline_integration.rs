//! End-to-end runs of the pipeline on synthetic two-band data
//!
//! Clean pulses sit in a narrow tail/total band, pileup in a wide band far
//! above it. A fixed unit calibration makes energy equal the total integral.

mod common;

use pileguard_core::{
    AxisSpec, BeamCurrentRecord, JsonSink, MemoryEventSource, MemorySink, Pipeline,
    PipelineConfig, PipelineError,
};

use common::{assert_close, interleave, EventGenerator};

const CLEAN_EVENTS: usize = 8000;
const PILEUP_EVENTS: usize = 2000;

fn two_band_events(seed: u64) -> (Vec<pileguard_core::Event>, Vec<pileguard_core::Event>) {
    let mut generator = EventGenerator::new(seed, 1);
    let clean = generator.band(CLEAN_EVENTS, (0.5, 4.5), 0.2, 0.01);
    let pileup = generator.band(PILEUP_EVENTS, (0.5, 4.5), 0.5, 0.05);
    (clean, pileup)
}

fn config() -> PipelineConfig {
    PipelineConfig::fixed(1.0, 0.0)
        .with_energy_axis(AxisSpec {
            bins: 5,
            min: 0.0,
            max: 5.0,
        })
        .with_ratio_axis(AxisSpec {
            bins: 512,
            min: 0.0,
            max: 1.0,
        })
}

#[test]
fn test_boundary_separates_bands() {
    for seed in [1, 7, 11, 42] {
        let (clean, pileup) = two_band_events(seed);
        let events = interleave(clean.clone(), pileup.clone(), 10);
        let source = MemoryEventSource::new(&events);

        let output = Pipeline::new(config()).unwrap().run(&source).unwrap();
        let polygon = &output.boundary.polygon;

        let inside =
            |e: &pileguard_core::Event| polygon.contains(e.total_integral, e.ratio().unwrap());
        let clean_inside = clean.iter().filter(|e| inside(e)).count();
        let pileup_outside = pileup.iter().filter(|e| !inside(e)).count();

        assert!(
            clean_inside as f64 >= 0.95 * CLEAN_EVENTS as f64,
            "seed {}: only {} clean events inside",
            seed,
            clean_inside
        );
        assert!(
            pileup_outside as f64 >= 0.90 * PILEUP_EVENTS as f64,
            "seed {}: only {} pileup events outside",
            seed,
            pileup_outside
        );
        assert_eq!(output.accepted + output.rejected, (CLEAN_EVENTS + PILEUP_EVENTS) as u64);
        assert_eq!(output.boundary.columns.len(), 5, "seed {}", seed);
        assert_eq!(polygon.vertices().len(), 2 * 5 + 1);
    }
}

#[test]
fn test_columns_stay_on_the_clean_band() {
    let (clean, pileup) = two_band_events(1);
    let events = interleave(clean, pileup, 10);
    let source = MemoryEventSource::new(&events);

    let output = Pipeline::new(config()).unwrap().run(&source).unwrap();
    assert_eq!(output.boundary.columns.len(), 5);
    for column in &output.boundary.columns {
        assert!(
            (column.center - 0.2).abs() < 0.005,
            "column {} center {}",
            column.column,
            column.center
        );
        assert!(
            column.std_dev < 0.02,
            "column {} width {}",
            column.column,
            column.std_dev
        );
    }
}

#[test]
fn test_correction_matches_clean_fraction() {
    let (clean, pileup) = two_band_events(11);
    let events = interleave(clean, pileup, 10);
    let source = MemoryEventSource::new(&events);

    let output = Pipeline::new(config()).unwrap().run(&source).unwrap();
    let correction = output.boundary.correction;

    // 80% clean events, about 95% of them inside a 2σ cut
    let fraction = correction.fraction();
    assert!(fraction > 0.74 && fraction < 0.8, "fraction {}", fraction);
    let f = correction.fraction();
    assert_close(correction.scale_factor(), (1.0 - f.ln()) / f, 1e-12);

    // Clean spectrum is counted inside events times the factor
    assert_close(
        output.corrected.energy.integral(),
        output.accepted as f64 * correction.scale_factor(),
        1e-9,
    );
    // Uncut spectrum keeps every event
    assert_close(
        output.calibrated.energy.integral(),
        (CLEAN_EVENTS + PILEUP_EVENTS) as f64,
        1e-12,
    );
}

#[test]
fn test_runs_are_deterministic() {
    let (clean, pileup) = two_band_events(3);
    let events = interleave(clean, pileup, 10);
    let source = MemoryEventSource::new(&events);
    let pipeline = Pipeline::new(config()).unwrap();

    let first = pipeline.run(&source).unwrap();
    let second = pipeline.run(&source).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_other_channel_has_no_events() {
    let (clean, pileup) = two_band_events(5);
    let events = interleave(clean, pileup, 10);
    let source = MemoryEventSource::new(&events);

    let result = Pipeline::new(config().with_channel(3)).unwrap().run(&source);
    assert!(matches!(result, Err(PipelineError::NoEvents { .. })));

    let empty = MemoryEventSource::new(&[]);
    let result = Pipeline::new(config()).unwrap().run(&empty);
    assert!(matches!(result, Err(PipelineError::NoEvents { .. })));
}

#[test]
fn test_sparse_columns_are_insufficient() {
    let mut generator = EventGenerator::new(13, 1);
    let events = generator.band(150, (0.5, 4.5), 0.2, 0.02);
    let source = MemoryEventSource::new(&events);

    let result = Pipeline::new(config()).unwrap().run(&source);
    assert!(matches!(result, Err(PipelineError::InsufficientStatistics { .. })));
}

#[test]
fn test_beam_normalization() {
    let (clean, pileup) = two_band_events(17);
    let events = interleave(clean, pileup, 10);
    let source = MemoryEventSource::new(&events);

    let plain = Pipeline::new(config()).unwrap().run(&source).unwrap();

    // 20 samples of 1 µA at 50 ms: 1 µC
    let record = BeamCurrentRecord::new(vec![1.0e-6; 20], 0.05).unwrap();
    let normalized = Pipeline::new(config())
        .unwrap()
        .with_beam_current(record)
        .run(&source)
        .unwrap();

    let factor = normalized.normalization.unwrap();
    assert_close(factor, 1.0e6, 1e-9);
    assert_close(
        normalized.calibrated.energy.integral(),
        plain.calibrated.energy.integral() * factor,
        1e-9,
    );
    assert_close(
        normalized.corrected.psd.total(),
        plain.corrected.psd.total() * factor,
        1e-9,
    );
    assert_eq!(normalized.charge_curve.unwrap().time_s.len(), 20);
}

#[test]
fn test_sinks_receive_output() {
    let (clean, pileup) = two_band_events(19);
    let events = interleave(clean, pileup, 10);
    let source = MemoryEventSource::new(&events);
    let pipeline = Pipeline::new(config()).unwrap();

    let mut memory = MemorySink::new();
    let output = pipeline.run_into(&source, &mut memory).unwrap();
    assert_eq!(memory.outputs().len(), 1);
    assert_eq!(memory.outputs()[0], output);

    let mut json = JsonSink::new(Vec::new());
    pipeline.run_into(&source, &mut json).unwrap();
    let bytes = json.into_inner();
    let text = String::from_utf8(bytes).unwrap();
    let line: serde_json::Value = serde_json::from_str(text.trim_end()).unwrap();

    assert_eq!(line["accepted"], output.accepted);
    assert_eq!(line["segments"], 1);
    assert!(line["normalization"].is_null());
}
