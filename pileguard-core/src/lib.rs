//! Energy calibration and pileup discrimination for PSD detector events
//!
//! Turns raw per-pulse charge integrals into energy-calibrated spectra and
//! separates clean single-pulse events from pileup using an energy-dependent
//! boundary in (energy, tail/total) space.
//!
//! ## Processing Stages
//!
//! ```text
//! EventSource ─→ Calibration ─→ raw PSD grid ─→ BoundaryFitter ─→ Classifier
//!                 (fixed or       (energy ×       (column fits,     (clean PSD,
//!                  drift windows)  ratio counts)   polygon, factor)  corrected spectrum)
//! ```
//!
//! 1. **Calibration** maps raw integrals to MeV, either with one fixed affine
//!    mapping or with one mapping per time window to follow gain drift.
//! 2. **Accumulation** bins every calibrated event of the selected channel.
//! 3. **Boundary fitting** fits a Gaussian to every energy column of the raw
//!    grid, smooths the ±N·σ envelopes and closes them into a polygon.
//! 4. **Classification** re-walks the events, keeps the ones inside the
//!    polygon and scales the clean spectrum by the pileup correction factor.
//!
//! Key constraints:
//! - One sequential scan of the events per pass
//! - Deterministic output for a fixed input
//! - `no_std` + `alloc` capable; `std` adds logging and JSON configuration
//!
//! ```no_run
//! use pileguard_core::{MemoryEventSource, Pipeline, PipelineConfig};
//!
//! let events = Vec::new();
//! let source = MemoryEventSource::new(&events);
//! let pipeline = Pipeline::new(PipelineConfig::fixed(0.00027, 0.0)).unwrap();
//!
//! match pipeline.run(&source) {
//!     Ok(output) => {
//!         let factor = output.boundary.correction.scale_factor();
//!         let _ = factor;
//!     }
//!     Err(e) => {
//!         let _ = e; // Not enough statistics for a boundary
//!     }
//! }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

extern crate alloc;

#[macro_use]
mod macros;

pub mod accumulator;
pub mod boundary;
pub mod buffer;
pub mod calibration;
pub mod classifier;
pub mod config;
pub mod constants;
pub mod errors;
pub mod event;
pub mod fit;
pub mod histogram;
pub mod normalization;
pub mod pipeline;
pub mod source;

// Public API
pub use accumulator::{AccumulateOutcome, SpectrumAccumulator};
pub use boundary::{Boundary, BoundaryConfig, BoundaryFitter, BoundaryPolygon, CorrectionFactor};
pub use calibration::{Calibration, CalibrationEngine, CalibrationSegment, PeakBounds};
pub use classifier::{Classification, Classifier};
pub use config::{AxisSpec, CalibrationConfig, PipelineConfig};
pub use errors::{PipelineError, PipelineResult};
pub use event::{Event, Timestamp};
pub use fit::{CurveFitter, FitError, LevenbergMarquardt};
pub use histogram::{Axis, DensityGrid, Histogram1D};
pub use normalization::{BeamCurrentRecord, ChargeCurve};
pub use pipeline::{MemorySink, OutputSink, Pipeline, PipelineOutput, PipelineSummary, RunError};
pub use source::{EventSource, MemoryEventSource};

#[cfg(feature = "std")]
pub use errors::LoadError;
#[cfg(feature = "std")]
pub use pipeline::JsonSink;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
