//! Levenberg-Marquardt Gaussian Fitting
//!
//! ## Algorithm
//!
//! Fits `μ(x) = height·exp(-½z²) + offset`, `z = (x − center)/σ`, to
//! counted bins by minimizing the Poisson deviance:
//!
//! ```text
//! D(p)  = 2·Σ [ μᵢ − yᵢ + yᵢ·ln(yᵢ/μᵢ) ]      (yᵢ·ln(yᵢ/μᵢ) = 0 when yᵢ = 0)
//! (JᵀWJ + λ·diag(JᵀWJ))·δ = JᵀW·(y − μ)        Wᵢ = 1/μᵢ
//! accept δ if D(p + δ) ≤ D(p), then λ ← λ/10
//! reject δ otherwise,          then λ ← λ·10
//! ```
//!
//! Weights come from the model, never from the data, so empty and sparse
//! bins enter through `μᵢ`. The model value is floored at `MODEL_FLOOR`.
//! The offset is a background count: every trial step is projected back to
//! `offset ≥ 0`, and a step the projection cancels counts as converged.
//!
//! ## Termination
//!
//! - **Converged**: an accepted step improves the deviance by less than
//!   `tolerance` relative to the previous value
//! - **At a minimum**: no downhill step exists even with λ above
//!   `LM_MAX_LAMBDA`; the current parameters are returned
//! - **Not converged**: `max_iterations` accepted steps without meeting the
//!   tolerance
//!
//! The returned σ is always non-negative; the model only depends on σ².

use super::matrix::{self, SquareMatrix, Vector};
use super::{CurveFitter, FitError, FitResult, GaussianParams};
use crate::constants::fitting::{
    LM_INITIAL_LAMBDA, LM_MAX_ITERATIONS, LM_MAX_LAMBDA, LM_TOLERANCE,
};

const PARAMS: usize = 4;

/// Index of the offset in the parameter vector
const OFFSET: usize = 3;

/// Damping never drops below this, so the diagonal stays regularized
const MIN_LAMBDA: f64 = 1e-12;

/// Smallest model value (counts) used in the deviance and the weights
const MODEL_FLOOR: f64 = 1e-6;

/// Levenberg-Marquardt optimizer for the Gaussian column model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevenbergMarquardt {
    /// Cap on accepted steps
    pub max_iterations: usize,
    /// Relative deviance improvement that counts as converged
    pub tolerance: f64,
    /// Starting damping factor
    pub initial_lambda: f64,
}

impl Default for LevenbergMarquardt {
    fn default() -> Self {
        Self {
            max_iterations: LM_MAX_ITERATIONS,
            tolerance: LM_TOLERANCE,
            initial_lambda: LM_INITIAL_LAMBDA,
        }
    }
}

impl LevenbergMarquardt {
    /// Create with explicit limits
    pub fn new(max_iterations: usize, tolerance: f64) -> Self {
        Self {
            max_iterations,
            tolerance,
            ..Self::default()
        }
    }
}

fn to_array(p: &GaussianParams) -> Vector<PARAMS> {
    [p.height, p.center, p.std_dev, p.offset]
}

fn from_array(p: &Vector<PARAMS>) -> GaussianParams {
    GaussianParams {
        height: p[0],
        center: p[1],
        std_dev: p[2],
        offset: p[3],
    }
}

fn expected(model: f64) -> f64 {
    model.max(MODEL_FLOOR)
}

/// Poisson deviance of the bins at `p`
fn deviance(xs: &[f64], ys: &[f64], p: &Vector<PARAMS>) -> f64 {
    let model = from_array(p);
    xs.iter()
        .zip(ys)
        .map(|(&x, &y)| {
            let mu = expected(model.evaluate(x));
            let y = y.max(0.0);
            let log_term = if y > 0.0 { y * libm::log(y / mu) } else { 0.0 };
            2.0 * (mu - y + log_term)
        })
        .sum()
}

/// Accumulate `JᵀWJ` and `JᵀW·(y − μ)` at `p`
fn normal_equations(
    xs: &[f64],
    ys: &[f64],
    p: &Vector<PARAMS>,
) -> (SquareMatrix<PARAMS>, Vector<PARAMS>) {
    let [height, center, std_dev, offset] = *p;
    let mut jtj = [[0.0; PARAMS]; PARAMS];
    let mut jtr = [0.0; PARAMS];

    for (&x, &y) in xs.iter().zip(ys) {
        let z = (x - center) / std_dev;
        let e = libm::exp(-0.5 * z * z);
        let mu = expected(height * e + offset);
        let residual = y.max(0.0) - mu;
        let w = 1.0 / mu;
        let grad = [e, height * e * z / std_dev, height * e * z * z / std_dev, 1.0];

        for i in 0..PARAMS {
            jtr[i] += w * grad[i] * residual;
            for j in i..PARAMS {
                jtj[i][j] += w * grad[i] * grad[j];
            }
        }
    }
    for i in 0..PARAMS {
        for j in 0..i {
            jtj[i][j] = jtj[j][i];
        }
    }
    (jtj, jtr)
}

fn finish(p: &Vector<PARAMS>) -> FitResult<GaussianParams> {
    let mut params = from_array(p);
    params.std_dev = libm::fabs(params.std_dev);
    if params.is_finite() {
        Ok(params)
    } else {
        Err(FitError::NonFinite)
    }
}

impl CurveFitter for LevenbergMarquardt {
    fn fit_gaussian(
        &self,
        xs: &[f64],
        ys: &[f64],
        seed: GaussianParams,
    ) -> FitResult<GaussianParams> {
        if xs.len() != ys.len() {
            return Err(FitError::LengthMismatch { xs: xs.len(), ys: ys.len() });
        }
        if xs.len() < PARAMS {
            return Err(FitError::TooFewPoints { required: PARAMS, available: xs.len() });
        }
        if !seed.is_finite() || seed.std_dev == 0.0 {
            return Err(FitError::NonFinite);
        }

        let mut params = to_array(&seed);
        let mut current = deviance(xs, ys, &params);
        if !current.is_finite() {
            return Err(FitError::NonFinite);
        }
        let mut lambda = self.initial_lambda.max(MIN_LAMBDA);

        for _ in 0..self.max_iterations {
            let (jtj, jtr) = normal_equations(xs, ys, &params);

            loop {
                let mut damped = jtj;
                for (i, row) in damped.iter_mut().enumerate() {
                    row[i] += lambda * jtj[i][i].max(f64::MIN_POSITIVE);
                }

                if let Some(delta) = matrix::solve(&damped, &jtr) {
                    let mut trial = params;
                    for (t, d) in trial.iter_mut().zip(delta.iter()) {
                        *t += d;
                    }
                    trial[OFFSET] = trial[OFFSET].max(0.0);
                    let trial_deviance = deviance(xs, ys, &trial);

                    if trial_deviance.is_finite() && trial_deviance <= current {
                        let improvement = current - trial_deviance;
                        let converged =
                            improvement <= self.tolerance * current.max(f64::MIN_POSITIVE);
                        params = trial;
                        current = trial_deviance;
                        lambda = (lambda / 10.0).max(MIN_LAMBDA);
                        if converged {
                            return finish(&params);
                        }
                        break;
                    }
                }

                lambda *= 10.0;
                if lambda > LM_MAX_LAMBDA {
                    return finish(&params);
                }
            }
        }

        Err(FitError::NotConverged { iterations: self.max_iterations })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(truth: &GaussianParams, bins: usize) -> (Vec<f64>, Vec<f64>) {
        let width = 1.0 / bins as f64;
        let xs: Vec<f64> = (0..bins).map(|i| (i as f64 + 0.5) * width).collect();
        let ys = xs.iter().map(|&x| truth.evaluate(x)).collect();
        (xs, ys)
    }

    #[test]
    fn recovers_noise_free_gaussian() {
        let truth = GaussianParams { height: 200.0, center: 0.25, std_dev: 0.02, offset: 1.0 };
        let (xs, ys) = sample(&truth, 512);
        let seed = GaussianParams { height: 190.0, center: 0.2495, std_dev: 0.1, offset: 0.0 };

        let fit = LevenbergMarquardt::default().fit_gaussian(&xs, &ys, seed).unwrap();
        assert!((fit.center - 0.25).abs() < 1e-6);
        assert!((fit.std_dev - 0.02).abs() < 1e-6);
        assert!((fit.height - 200.0).abs() < 1e-3);
        assert!((fit.offset - 1.0).abs() < 1e-3);
    }

    #[test]
    fn negative_width_seed_reports_positive_sigma() {
        let truth = GaussianParams { height: 50.0, center: 0.5, std_dev: 0.05, offset: 0.0 };
        let (xs, ys) = sample(&truth, 128);
        let seed = GaussianParams { height: 50.0, center: 0.5, std_dev: -0.04, offset: 0.0 };

        let fit = LevenbergMarquardt::default().fit_gaussian(&xs, &ys, seed).unwrap();
        assert!(fit.std_dev > 0.0);
        assert!((fit.std_dev - 0.05).abs() < 1e-4);
    }

    #[test]
    fn sparse_background_does_not_pull_the_peak() {
        // Narrow counted peak at 0.2 plus a low, broad bump around 0.5
        let xs: Vec<f64> = (0..512).map(|i| (i as f64 + 0.5) / 512.0).collect();
        let ys: Vec<f64> = xs
            .iter()
            .enumerate()
            .map(|(i, &x)| {
                let z = (x - 0.2) / 0.01;
                let peak = (62.0 * (-0.5 * z * z).exp()).round();
                let bump = if (0.35..0.65).contains(&x) { [0.0, 1.0, 3.0, 2.0, 1.0][i % 5] } else { 0.0 };
                peak + bump
            })
            .collect();
        let seed = GaussianParams { height: 62.0, center: 0.2002, std_dev: 0.1, offset: 0.0 };

        let fit = LevenbergMarquardt::default().fit_gaussian(&xs, &ys, seed).unwrap();
        assert!((fit.center - 0.2).abs() < 0.001, "center {}", fit.center);
        assert!((fit.std_dev - 0.01).abs() < 0.001, "std_dev {}", fit.std_dev);
    }

    #[test]
    fn empty_bins_are_not_weighted_as_counts() {
        let truth = GaussianParams { height: 40.0, center: 0.5, std_dev: 0.03, offset: 0.0 };
        let xs: Vec<f64> = (0..256).map(|i| (i as f64 + 0.5) / 256.0).collect();
        let ys: Vec<f64> = xs.iter().map(|&x| truth.evaluate(x).round()).collect();
        assert!(ys.iter().filter(|&&y| y == 0.0).count() > 100);

        let seed = GaussianParams { height: 40.0, center: 0.5, std_dev: 0.1, offset: 0.0 };
        let fit = LevenbergMarquardt::default().fit_gaussian(&xs, &ys, seed).unwrap();
        // Rounded counts keep the width within a percent or two
        assert!((fit.std_dev - 0.03).abs() < 0.001, "std_dev {}", fit.std_dev);
    }

    #[test]
    fn offset_stays_non_negative() {
        // Counted peak seen through a narrow window with empty edges
        let truth = GaussianParams { height: 74.0, center: 0.2, std_dev: 0.01, offset: 0.0 };
        let xs: Vec<f64> = (75..130).map(|i| (i as f64 + 0.5) / 512.0).collect();
        let ys: Vec<f64> = xs.iter().map(|&x| truth.evaluate(x).round()).collect();
        let seed = GaussianParams { height: 74.0, center: 0.1982, std_dev: 0.0108, offset: 0.0 };

        let fit = LevenbergMarquardt::default().fit_gaussian(&xs, &ys, seed).unwrap();
        assert!(fit.offset >= 0.0, "offset {}", fit.offset);
        assert!((fit.center - 0.2).abs() < 0.0005, "center {}", fit.center);
        assert!((fit.std_dev - 0.01).abs() < 0.0005, "std_dev {}", fit.std_dev);
    }

    #[test]
    fn flat_data_does_not_panic() {
        let xs: Vec<f64> = (0..16).map(|i| i as f64 / 16.0).collect();
        let ys = vec![0.0; 16];
        let seed = GaussianParams { height: 0.0, center: 0.5, std_dev: 0.1, offset: 0.0 };
        let result = LevenbergMarquardt::default().fit_gaussian(&xs, &ys, seed);
        if let Ok(params) = result {
            assert!(params.is_finite());
        }
    }

    #[test]
    fn rejects_short_or_mismatched_input() {
        let seed = GaussianParams { height: 1.0, center: 0.0, std_dev: 1.0, offset: 0.0 };
        let fitter = LevenbergMarquardt::default();
        assert_eq!(
            fitter.fit_gaussian(&[0.0, 1.0], &[1.0, 1.0], seed),
            Err(FitError::TooFewPoints { required: 4, available: 2 })
        );
        assert_eq!(
            fitter.fit_gaussian(&[0.0; 5], &[1.0; 4], seed),
            Err(FitError::LengthMismatch { xs: 5, ys: 4 })
        );
        let bad_seed = GaussianParams { std_dev: 0.0, ..seed };
        assert_eq!(
            fitter.fit_gaussian(&[0.0; 5], &[1.0; 5], bad_seed),
            Err(FitError::NonFinite)
        );
    }
}
