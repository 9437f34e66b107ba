//! Shared generators for the integration tests
//!
//! Every generator is seeded so a failing run reproduces exactly.

#![allow(dead_code)]

use pileguard_core::{Axis, Event};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Ticks per second at the default 4 ns digitizer clock
pub const TICKS_PER_SECOND: u64 = 250_000_000;

/// Seeded event generator
pub struct EventGenerator {
    rng: StdRng,
    timestamp: u64,
    step: u64,
}

impl EventGenerator {
    /// Generator starting at tick 0, one event every `step` ticks
    pub fn new(seed: u64, step: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            timestamp: 0,
            step,
        }
    }

    /// Move the clock to `timestamp`
    pub fn jump_to(&mut self, timestamp: u64) {
        self.timestamp = timestamp;
    }

    /// Normal deviate by Box-Muller
    pub fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1: f64 = self.rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = self.rng.gen_range(0.0..1.0);
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    /// Uniform deviate in `[low, high)`
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        self.rng.gen_range(low..high)
    }

    /// Event with the given total integral and tail/total ratio
    pub fn event(&mut self, channel: i32, total: f64, ratio: f64) -> Event {
        let event = Event::new(self.timestamp, channel, total, total * ratio);
        self.timestamp += self.step;
        event
    }

    /// Pulse-shape band: uniform energies, normal ratios
    pub fn band(
        &mut self,
        count: usize,
        energy: (f64, f64),
        ratio_mean: f64,
        ratio_std_dev: f64,
    ) -> Vec<Event> {
        (0..count)
            .map(|_| {
                let total = self.uniform(energy.0, energy.1);
                let ratio = self.normal(ratio_mean, ratio_std_dev);
                self.event(0, total, ratio)
            })
            .collect()
    }
}

/// Interleave two event lists and restamp them in ascending order
pub fn interleave(first: Vec<Event>, second: Vec<Event>, step: u64) -> Vec<Event> {
    let mut merged = Vec::with_capacity(first.len() + second.len());
    let mut a = first.into_iter();
    let mut b = second.into_iter();
    loop {
        match (a.next(), b.next()) {
            (None, None) => break,
            (x, y) => merged.extend(x.into_iter().chain(y)),
        }
    }
    for (index, event) in merged.iter_mut().enumerate() {
        event.timestamp = index as u64 * step;
    }
    merged
}

/// Default raw-integral axis of drift windows
pub fn adc_axis() -> Axis {
    Axis::new(1024, 0.0, 35000.0).unwrap()
}

/// Events for one drift window: `per_peak` events on the bin center nearest
/// each `raw` position, scaled by `gain`
pub fn peak_window(
    start: u64,
    raw: [f64; 3],
    gain: f64,
    per_peak: usize,
    step: u64,
) -> Vec<Event> {
    let axis = adc_axis();
    let mut events = Vec::with_capacity(raw.len() * per_peak);
    let mut timestamp = start;
    for position in raw {
        let center = axis.bin_center(axis.find_bin(position * gain).unwrap());
        for _ in 0..per_peak {
            events.push(Event::new(timestamp, 0, center, 0.2 * center));
            timestamp += step;
        }
    }
    events
}

/// Closed-form least-squares line through `(x, y)`
pub fn least_squares(xs: &[f64], ys: &[f64]) -> (f64, f64) {
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;
    let sxy: f64 = xs.iter().zip(ys).map(|(x, y)| (x - mean_x) * (y - mean_y)).sum();
    let sxx: f64 = xs.iter().map(|x| (x - mean_x) * (x - mean_x)).sum();
    let slope = sxy / sxx;
    (slope, mean_y - slope * mean_x)
}

/// Relative closeness
pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    let scale = expected.abs().max(1e-12);
    assert!(
        ((actual - expected) / scale).abs() < tolerance,
        "{} not within {} of {}",
        actual,
        tolerance,
        expected
    );
}
