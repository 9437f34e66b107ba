//! Error Types for Calibration and Pileup Discrimination
//!
//! ## Design Philosophy
//!
//! 1. **Copy Semantics**: `PipelineError` is `Copy` and carries only numbers
//!    and `&'static str` reasons, so it can be returned from hot loops and
//!    stored in diagnostics without allocation.
//!
//! 2. **Data vs. Numerical Conditions**: a run or window that saw no events,
//!    or whose calibration peaks were empty, is a *data* condition
//!    (`NoEvents`, `PeaksNotFound`), while a fit that converged to values
//!    that cannot describe a detector is a *numerical* condition
//!    (`UnreliableCalibration`, `DegenerateCorrection`). Callers can tell
//!    them apart with [`PipelineError::is_data_condition`].
//!
//! 3. **Recoverable Conditions Are Not Errors**: zero-charge events, rejected
//!    energy columns and malformed peak bounds are handled in place and
//!    reported through counters, diagnostics and warnings.
//!
//! ## Error Categories
//!
//! ### Statistics
//! - `InsufficientStatistics`: fewer accepted energy columns than a polygon needs
//! - `DegenerateCorrection`: nothing inside the boundary, the correction would divide by zero
//! - `NoEvents`: the source (or the selected channel) is empty
//! - `PeaksNotFound`: no time window had counts in every peak range
//! - `UnreliableCalibration`: no time window produced a usable fit, and at
//!   least one line fit failed or came out implausible
//!
//! ### Configuration
//! - `InvalidAxis`, `InvalidConfig`: rejected at construction time
//!
//! ### Normalization
//! - `DegenerateNormalization`, `MalformedRecord`: beam-current record problems
//!
//! ```rust
//! use pileguard_core::{PipelineError, CorrectionFactor};
//!
//! match CorrectionFactor::from_counts(0.0, 1000.0) {
//!     Err(PipelineError::DegenerateCorrection { num_clean, .. }) => assert_eq!(num_clean, 0.0),
//!     _ => unreachable!(),
//! }
//! ```

use thiserror_no_std::Error;

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Pipeline errors - small and `Copy`
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum PipelineError {
    /// Too few energy columns survived fitting to build a boundary
    #[error("Insufficient statistics: need {required} accepted columns, have {available}")]
    InsufficientStatistics {
        /// Minimum number of accepted columns
        required: usize,
        /// Columns that were actually accepted
        available: usize,
    },

    /// Clean fraction is zero (or total is zero), correction is undefined
    #[error("Degenerate correction: {num_clean} clean of {num_total} total")]
    DegenerateCorrection {
        /// Grid mass inside the boundary
        num_clean: f64,
        /// Total grid mass
        num_total: f64,
    },

    /// A pass produced no events to work with
    #[error("No events: {reason}")]
    NoEvents {
        /// Which pass came up empty
        reason: &'static str,
    },

    /// No calibration window had counts in all of its peak ranges
    #[error("Peaks not found: {empty} of {windows} windows had an empty peak range")]
    PeaksNotFound {
        /// Number of windows scanned
        windows: usize,
        /// Windows with an empty peak range
        empty: usize,
    },

    /// No calibration window produced a usable line fit
    #[error("Unreliable calibration: {failed} of {windows} window fits failed")]
    UnreliableCalibration {
        /// Number of windows scanned
        windows: usize,
        /// Windows whose line fit failed or was implausible
        failed: usize,
    },

    /// Histogram axis cannot be built
    #[error("Invalid axis: {reason}")]
    InvalidAxis {
        /// What is wrong with the axis
        reason: &'static str,
    },

    /// Configuration value out of its domain
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Offending setting
        reason: &'static str,
    },

    /// Integrated beam charge is zero or not a number
    #[error("Degenerate normalization: integrated charge {charge}")]
    DegenerateNormalization {
        /// Integrated charge in coulombs
        charge: f64,
    },

    /// Beam-current record could not be parsed
    #[error("Malformed record at line {line}")]
    MalformedRecord {
        /// 1-based line number
        line: usize,
    },
}

impl PipelineError {
    /// Check if the input data, not the numerics, caused the error
    pub fn is_data_condition(&self) -> bool {
        matches!(
            self,
            Self::NoEvents { .. } | Self::PeaksNotFound { .. } | Self::InsufficientStatistics { .. }
        )
    }
}

/// Errors raised while loading configuration or records from disk
#[cfg(feature = "std")]
#[derive(Error, Debug)]
pub enum LoadError {
    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON did not match the configuration schema
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Content parsed but is not valid
    #[error("{0}")]
    Pipeline(#[from] PipelineError),
}
