//! Curve Fitting for Calibration and Column Models
//!
//! ## Overview
//!
//! Two models are fitted in this crate:
//!
//! - **Straight line** through the (centroid, reference energy) pairs of a
//!   calibration window. Closed-form least squares, see [`linear`].
//! - **Gaussian plus offset** to the ratio distribution of every energy
//!   column. Nonlinear; solved by Levenberg-Marquardt, see [`levenberg`].
//!
//! ```text
//! line:      E(x) = slope·x + intercept
//! gaussian:  g(r) = height·exp(-½((r - center)/σ)²) + offset
//! ```
//!
//! ## Pluggable Optimizer
//!
//! Boundary fitting and calibration only depend on the [`CurveFitter`]
//! trait. The built-in [`LevenbergMarquardt`] is the default; any
//! implementation meeting the same contract (fit from a seed, report
//! failure as a [`FitError`]) can be substituted, for instance to compare
//! against a reference fitter in tests.
//!
//! ## Numerical Safeguards
//!
//! - Normal equations are solved with partial pivoting and a relative
//!   pivot threshold; a near-singular system is `FitError::Singular`
//! - Every accepted parameter vector is checked for finiteness
//! - The optimizer never accepts a step that increases its objective

pub mod levenberg;
pub mod linear;

pub use levenberg::LevenbergMarquardt;
pub use linear::least_squares_line;

use thiserror_no_std::Error;

/// Result type for fits
pub type FitResult<T> = Result<T, FitError>;

/// Why a fit produced no usable parameters
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum FitError {
    /// Not enough points to constrain the model
    #[error("Too few points: need {required}, have {available}")]
    TooFewPoints {
        /// Minimum number of points
        required: usize,
        /// Points supplied
        available: usize,
    },

    /// Normal equations have no unique solution
    #[error("Singular system")]
    Singular,

    /// Iteration cap reached without meeting the tolerance
    #[error("Not converged after {iterations} iterations")]
    NotConverged {
        /// Iterations performed
        iterations: usize,
    },

    /// A parameter or residual became NaN or infinite
    #[error("Non-finite value during fit")]
    NonFinite,

    /// Abscissa and ordinate slices differ in length
    #[error("Length mismatch: {xs} x values, {ys} y values")]
    LengthMismatch {
        /// Number of x values
        xs: usize,
        /// Number of y values
        ys: usize,
    },
}

/// Parameters of `height·exp(-½((x - center)/std_dev)²) + offset`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianParams {
    /// Peak height above the offset
    pub height: f64,
    /// Location of the maximum
    pub center: f64,
    /// Width (σ)
    pub std_dev: f64,
    /// Constant background
    pub offset: f64,
}

impl GaussianParams {
    /// Evaluate the model at `x`
    pub fn evaluate(&self, x: f64) -> f64 {
        let z = (x - self.center) / self.std_dev;
        self.height * libm::exp(-0.5 * z * z) + self.offset
    }

    /// Check if every parameter is a finite number
    pub fn is_finite(&self) -> bool {
        self.height.is_finite()
            && self.center.is_finite()
            && self.std_dev.is_finite()
            && self.offset.is_finite()
    }
}

/// Parameters of `slope·x + intercept`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineParams {
    /// Gain
    pub slope: f64,
    /// Offset
    pub intercept: f64,
}

impl LineParams {
    /// Evaluate the line at `x`
    pub fn evaluate(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Curve fitting backend
///
/// `fit_gaussian` must start from `seed` and return either finite
/// parameters or an error; it must not panic on degenerate input.
pub trait CurveFitter {
    /// Fit `height·exp(-½((x - center)/σ)²) + offset` to `(xs, ys)`
    fn fit_gaussian(&self, xs: &[f64], ys: &[f64], seed: GaussianParams)
        -> FitResult<GaussianParams>;

    /// Least-squares straight line through `(xs, ys)`
    fn fit_line(&self, xs: &[f64], ys: &[f64]) -> FitResult<LineParams> {
        least_squares_line(xs, ys)
    }
}

impl<F: CurveFitter + ?Sized> CurveFitter for &F {
    fn fit_gaussian(
        &self,
        xs: &[f64],
        ys: &[f64],
        seed: GaussianParams,
    ) -> FitResult<GaussianParams> {
        (**self).fit_gaussian(xs, ys, seed)
    }

    fn fit_line(&self, xs: &[f64], ys: &[f64]) -> FitResult<LineParams> {
        (**self).fit_line(xs, ys)
    }
}

/// Small dense linear algebra for normal equations
pub mod matrix {
    /// Square matrix type
    pub type SquareMatrix<const N: usize> = [[f64; N]; N];

    /// Vector type
    pub type Vector<const N: usize> = [f64; N];

    /// Pivots smaller than this fraction of the largest diagonal are singular
    const RELATIVE_PIVOT_EPSILON: f64 = 1e-14;

    /// Solve `A·x = b` by Gaussian elimination with partial pivoting
    ///
    /// `None` when the system is singular or numerically close to it.
    pub fn solve<const N: usize>(
        a: &SquareMatrix<N>,
        b: &Vector<N>,
    ) -> Option<Vector<N>> {
        let mut m = *a;
        let mut rhs = *b;

        let mut scale = 0.0_f64;
        for (i, row) in m.iter().enumerate() {
            scale = scale.max(libm::fabs(row[i]));
        }
        if scale == 0.0 || !scale.is_finite() {
            return None;
        }
        let threshold = scale * RELATIVE_PIVOT_EPSILON;

        for col in 0..N {
            let mut pivot = col;
            for row in col + 1..N {
                if libm::fabs(m[row][col]) > libm::fabs(m[pivot][col]) {
                    pivot = row;
                }
            }
            if libm::fabs(m[pivot][col]) <= threshold {
                return None;
            }
            m.swap(col, pivot);
            rhs.swap(col, pivot);

            for row in col + 1..N {
                let factor = m[row][col] / m[col][col];
                if factor == 0.0 {
                    continue;
                }
                for k in col..N {
                    m[row][k] -= factor * m[col][k];
                }
                rhs[row] -= factor * rhs[col];
            }
        }

        let mut x = [0.0; N];
        for row in (0..N).rev() {
            let mut sum = rhs[row];
            for k in row + 1..N {
                sum -= m[row][k] * x[k];
            }
            x[row] = sum / m[row][row];
        }

        if x.iter().all(|v| v.is_finite()) {
            Some(x)
        } else {
            None
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn solves_small_system() {
            // 2x + y = 5, x + 3y = 10  →  x = 1, y = 3
            let a = [[2.0, 1.0], [1.0, 3.0]];
            let b = [5.0, 10.0];
            let x = solve(&a, &b).unwrap();
            assert!((x[0] - 1.0).abs() < 1e-12);
            assert!((x[1] - 3.0).abs() < 1e-12);
        }

        #[test]
        fn pivots_on_zero_diagonal() {
            let a = [[0.0, 1.0], [1.0, 0.0]];
            let b = [2.0, 3.0];
            let x = solve(&a, &b).unwrap();
            assert!((x[0] - 3.0).abs() < 1e-12);
            assert!((x[1] - 2.0).abs() < 1e-12);
        }

        #[test]
        fn singular_is_none() {
            let a = [[1.0, 2.0], [2.0, 4.0]];
            assert!(solve(&a, &[1.0, 2.0]).is_none());
            assert!(solve(&[[0.0; 3]; 3], &[0.0; 3]).is_none());
        }
    }
}
