//! Boundary fitting and classification throughput
//!
//! ```bash
//! cargo bench -p pileguard-core --bench column_fit
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use pileguard_core::{
    Axis, BoundaryConfig, BoundaryFitter, Calibration, Classifier, CurveFitter, DensityGrid,
    Event, LevenbergMarquardt, MemoryEventSource,
};
use pileguard_core::fit::GaussianParams;

fn normal(rng: &mut StdRng, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    mean + std_dev * (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn banded_grid(columns: usize, per_column: usize) -> DensityGrid {
    let mut rng = StdRng::seed_from_u64(42);
    let x = Axis::new(columns, 0.0, columns as f64).unwrap();
    let y = Axis::new(512, 0.0, 1.0).unwrap();
    let mut grid = DensityGrid::new(x, y);
    for column in 0..columns {
        for _ in 0..per_column {
            grid.fill(column as f64 + 0.5, normal(&mut rng, 0.2, 0.02));
        }
    }
    grid
}

fn bench_single_gaussian(c: &mut Criterion) {
    let grid = banded_grid(1, 5000);
    let y = grid.y_axis();
    let ratios: Vec<f64> = (0..y.bins()).map(|bin| y.bin_center(bin)).collect();
    let counts = grid.column(0).to_vec();
    let fitter = LevenbergMarquardt::default();
    let seed = GaussianParams {
        height: counts.iter().cloned().fold(0.0, f64::max),
        center: 0.2,
        std_dev: 0.1,
        offset: 0.0,
    };

    c.bench_function("fit/gaussian_512", |b| {
        b.iter(|| fitter.fit_gaussian(black_box(&ratios), black_box(&counts), seed))
    });
}

fn bench_boundary(c: &mut Criterion) {
    let mut group = c.benchmark_group("boundary/build");
    for columns in [64, 256, 1024] {
        let grid = banded_grid(columns, 200);
        let fitter = BoundaryFitter::new(BoundaryConfig::fixed_mode()).unwrap();
        group.bench_function(BenchmarkId::from_parameter(columns), |b| {
            b.iter(|| fitter.build(black_box(&grid)))
        });
    }
    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let events: Vec<Event> = (0..100_000u64)
        .map(|t| {
            let total = rng.gen_range(100.0..30000.0);
            Event::new(t * 1000, 0, total, total * normal(&mut rng, 0.2, 0.02))
        })
        .collect();
    let source = MemoryEventSource::new(&events);
    let calibration = Calibration::fixed(2.8e-4, 0.0);
    let energy = Axis::new(1024, 0.0, 10.0).unwrap();
    let ratio = Axis::new(512, 0.0, 1.0).unwrap();

    c.bench_function("classify/100k_events", |b| {
        b.iter(|| Classifier::new(&calibration, 0).classify(black_box(&source), energy, ratio))
    });
}

criterion_group!(benches, bench_single_gaussian, bench_boundary, bench_classify);
criterion_main!(benches);
