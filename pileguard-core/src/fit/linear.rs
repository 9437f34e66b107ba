//! Closed-form linear least squares
//!
//! ```text
//! slope     = (n·Σxy − Σx·Σy) / (n·Σx² − (Σx)²)
//! intercept = (Σy − slope·Σx) / n
//! ```
//!
//! Computed on mean-centered values so that raw ADC centroids in the tens
//! of thousands do not cancel catastrophically.

use super::{FitError, FitResult, LineParams};

/// Fit `y = slope·x + intercept` to at least two points
pub fn least_squares_line(xs: &[f64], ys: &[f64]) -> FitResult<LineParams> {
    if xs.len() != ys.len() {
        return Err(FitError::LengthMismatch { xs: xs.len(), ys: ys.len() });
    }
    if xs.len() < 2 {
        return Err(FitError::TooFewPoints { required: 2, available: xs.len() });
    }
    if xs.iter().chain(ys.iter()).any(|v| !v.is_finite()) {
        return Err(FitError::NonFinite);
    }

    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (&x, &y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        sxx += dx * dx;
        sxy += dx * (y - mean_y);
    }
    if sxx == 0.0 {
        return Err(FitError::Singular);
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    if !slope.is_finite() || !intercept.is_finite() {
        return Err(FitError::NonFinite);
    }
    Ok(LineParams { slope, intercept })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_line_through_calibration_peaks() {
        let centroids = [16000.0, 14160.0, 7932.0];
        let energies: Vec<f64> = centroids.iter().map(|c| 0.00027 * c + 0.1).collect();
        let line = least_squares_line(&centroids, &energies).unwrap();
        assert!((line.slope - 0.00027).abs() < 1e-12);
        assert!((line.intercept - 0.1).abs() < 1e-9);
    }

    #[test]
    fn two_points_define_line() {
        let line = least_squares_line(&[1.0, 3.0], &[2.0, 6.0]).unwrap();
        assert!((line.slope - 2.0).abs() < 1e-12);
        assert!(line.intercept.abs() < 1e-12);
    }

    #[test]
    fn rejects_degenerate_input() {
        assert_eq!(
            least_squares_line(&[1.0], &[1.0]),
            Err(FitError::TooFewPoints { required: 2, available: 1 })
        );
        assert_eq!(least_squares_line(&[2.0, 2.0], &[1.0, 3.0]), Err(FitError::Singular));
        assert_eq!(
            least_squares_line(&[1.0, 2.0], &[1.0]),
            Err(FitError::LengthMismatch { xs: 2, ys: 1 })
        );
        assert_eq!(
            least_squares_line(&[1.0, f64::NAN], &[1.0, 2.0]),
            Err(FitError::NonFinite)
        );
    }
}
