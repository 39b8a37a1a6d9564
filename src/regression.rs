//! Simple linear least-squares regression and Pearson correlation.

use crate::error::{Result, StatsError};
use crate::stats::{covariance, mean, variance};

/// Fitted line `y = intercept + slope·x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    /// Value of the fitted line at `x`.
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Ordinary least-squares line through the points `(x[i], y[i])`.
///
/// # Errors
/// - [`StatsError::LengthMismatch`] if the slices differ in length.
/// - [`StatsError::InsufficientData`] for fewer than two points.
/// - [`StatsError::Degenerate`] if the data contain NaN/Inf or all `x` are
///   equal.
///
/// # Examples
/// ```
/// use u_probdist::regression::lsq;
/// let fit = lsq(&[1.0, 2.0, 3.0], &[3.0, 5.0, 7.0]).unwrap();
/// assert!((fit.slope - 2.0).abs() < 1e-12);
/// assert!((fit.predict(10.0) - 21.0).abs() < 1e-12);
/// ```
pub fn lsq(x: &[f64], y: &[f64]) -> Result<LinearFit> {
    let (var_x, _, cov) = moments(x, y)?;
    if var_x == 0.0 {
        return Err(StatsError::Degenerate("x values are all equal"));
    }
    let slope = cov / var_x;
    let (mx, my) = means(x, y)?;
    Ok(LinearFit {
        slope,
        intercept: my - slope * mx,
    })
}

/// Pearson correlation coefficient R of `x` and `y`, in `[-1, 1]`.
///
/// # Errors
/// As [`lsq`], and [`StatsError::Degenerate`] if either variable is
/// constant.
pub fn correlation(x: &[f64], y: &[f64]) -> Result<f64> {
    let (var_x, var_y, cov) = moments(x, y)?;
    if var_x == 0.0 || var_y == 0.0 {
        return Err(StatsError::Degenerate("a variable is constant"));
    }
    Ok((cov / (var_x * var_y).sqrt()).clamp(-1.0, 1.0))
}

/// Coefficient of determination R² of the least-squares line.
pub fn r_squared(x: &[f64], y: &[f64]) -> Result<f64> {
    correlation(x, y).map(|r| r * r)
}

/// Sample variances of `x` and `y` and their covariance.
fn moments(x: &[f64], y: &[f64]) -> Result<(f64, f64, f64)> {
    if x.len() != y.len() {
        return Err(StatsError::LengthMismatch {
            left: x.len(),
            right: y.len(),
        });
    }
    if x.len() < 2 {
        return Err(StatsError::InsufficientData {
            needed: 2,
            got: x.len(),
        });
    }
    let non_finite = || StatsError::Degenerate("data contain NaN or Inf");
    let var_x = variance(x).ok_or_else(non_finite)?;
    let var_y = variance(y).ok_or_else(non_finite)?;
    let cov = covariance(x, y).ok_or_else(non_finite)?;
    Ok((var_x, var_y, cov))
}

fn means(x: &[f64], y: &[f64]) -> Result<(f64, f64)> {
    match (mean(x), mean(y)) {
        (Some(mx), Some(my)) => Ok((mx, my)),
        _ => Err(StatsError::Degenerate("data contain NaN or Inf")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const AGE: [f64; 6] = [43.0, 21.0, 25.0, 42.0, 57.0, 59.0];
    const GLUCOSE: [f64; 6] = [99.0, 65.0, 79.0, 75.0, 87.0, 81.0];

    #[test]
    fn test_lsq_reference() {
        let fit = lsq(&AGE, &GLUCOSE).unwrap();
        assert_relative_eq!(fit.slope, 0.3852249832102082, max_relative = 1e-12);
        assert_relative_eq!(fit.intercept, 65.1415715245131, max_relative = 1e-12);
        assert_relative_eq!(fit.predict(55.0), 86.3289456, max_relative = 1e-9);
    }

    #[test]
    fn test_correlation_reference() {
        assert_relative_eq!(
            correlation(&AGE, &GLUCOSE).unwrap(),
            0.5298089018901744,
            max_relative = 1e-12
        );
        assert_relative_eq!(
            r_squared(&AGE, &GLUCOSE).unwrap(),
            0.28069747252207244,
            max_relative = 1e-12
        );
        let x = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let y = [2.1, 3.9, 6.2, 7.8, 10.1, 11.9];
        assert_relative_eq!(correlation(&x, &y).unwrap(), 0.9991907325046985, max_relative = 1e-12);
        let fit = lsq(&x, &y).unwrap();
        assert_relative_eq!(fit.slope, 1.9771428571428573, max_relative = 1e-12);
        assert!((fit.intercept - 0.08).abs() < 1e-12);
    }

    #[test]
    fn test_perfect_lines() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let up = [1.0, 3.0, 5.0, 7.0];
        let down = [7.0, 5.0, 3.0, 1.0];
        assert_relative_eq!(correlation(&x, &up).unwrap(), 1.0, max_relative = 1e-15);
        assert_relative_eq!(correlation(&x, &down).unwrap(), -1.0, max_relative = 1e-15);
        assert_relative_eq!(r_squared(&x, &down).unwrap(), 1.0, max_relative = 1e-15);
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            lsq(&[1.0, 2.0], &[1.0]),
            Err(StatsError::LengthMismatch { left: 2, right: 1 })
        );
        assert_eq!(
            lsq(&[1.0], &[1.0]),
            Err(StatsError::InsufficientData { needed: 2, got: 1 })
        );
        assert!(matches!(lsq(&[2.0, 2.0], &[1.0, 3.0]), Err(StatsError::Degenerate(_))));
        assert!(matches!(
            correlation(&[1.0, 2.0], &[3.0, 3.0]),
            Err(StatsError::Degenerate(_))
        ));
        assert!(matches!(
            lsq(&[1.0, f64::NAN], &[1.0, 2.0]),
            Err(StatsError::Degenerate(_))
        ));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn recovers_exact_line(
            slope in -50.0_f64..50.0,
            intercept in -100.0_f64..100.0,
            x in proptest::collection::vec(-100.0_f64..100.0, 3..40),
        ) {
            prop_assume!(crate::stats::variance(&x).unwrap() > 1e-3);
            let y: Vec<f64> = x.iter().map(|&v| intercept + slope * v).collect();
            let fit = lsq(&x, &y).unwrap();
            prop_assert!((fit.slope - slope).abs() < 1e-8 * slope.abs().max(1.0));
            prop_assert!((fit.intercept - intercept).abs() < 1e-6 * intercept.abs().max(1.0));
        }

        #[test]
        fn fitted_line_passes_through_means(
            pts in proptest::collection::vec((-100.0_f64..100.0, -100.0_f64..100.0), 3..40),
        ) {
            let (x, y): (Vec<f64>, Vec<f64>) = pts.into_iter().unzip();
            prop_assume!(crate::stats::variance(&x).unwrap() > 1e-3);
            let fit = lsq(&x, &y).unwrap();
            let mx = crate::stats::mean(&x).unwrap();
            let my = crate::stats::mean(&y).unwrap();
            prop_assert!((fit.predict(mx) - my).abs() < 1e-8);
        }

        #[test]
        fn correlation_is_symmetric_and_bounded(
            pts in proptest::collection::vec((-100.0_f64..100.0, -100.0_f64..100.0), 3..40),
        ) {
            let (x, y): (Vec<f64>, Vec<f64>) = pts.into_iter().unzip();
            if let (Ok(rxy), Ok(ryx)) = (correlation(&x, &y), correlation(&y, &x)) {
                prop_assert!((-1.0..=1.0).contains(&rxy));
                prop_assert!((rxy - ryx).abs() < 1e-12);
            }
        }
    }
}
