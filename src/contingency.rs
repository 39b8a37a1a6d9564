//! Pearson chi-square tests: goodness of fit and independence in a
//! contingency table.
//!
//! # Examples
//! ```
//! use u_probdist::contingency::{chi_square_critical, goodness_of_fit};
//! let observed = [22.0, 38.0, 51.0, 20.0, 9.0];
//! let expected = [14.0, 35.0, 56.0, 21.0, 14.0];
//! let res = goodness_of_fit(&observed, &expected).unwrap();
//! assert_eq!(res.df, 4.0);
//! // below the 2% critical value: the grade distribution fits
//! assert!(res.statistic < chi_square_critical(0.02, 4.0).unwrap());
//! ```

use crate::chisq::{p_chisq_upper, q_chisq};
use crate::error::{check, check_alpha, Result, StatsError};
use crate::inference::TestResult;

/// Pearson statistic `Σ (O − E)² / E`.
///
/// # Errors
/// - [`StatsError::EmptyInput`] / [`StatsError::LengthMismatch`] for
///   unusable slices.
/// - [`StatsError::InvalidParameter`] for a negative or non-finite count,
///   or an expected count that is not positive.
pub fn find_chi_square(observed: &[f64], expected: &[f64]) -> Result<f64> {
    if observed.is_empty() {
        return Err(StatsError::EmptyInput);
    }
    if observed.len() != expected.len() {
        return Err(StatsError::LengthMismatch {
            left: observed.len(),
            right: expected.len(),
        });
    }
    let mut sum = 0.0;
    for (&o, &e) in observed.iter().zip(expected) {
        check("observed", o, o >= 0.0)?;
        check("expected", e, e > 0.0)?;
        let d = o - e;
        sum += d * d / e;
    }
    Ok(sum)
}

/// Expected counts under independence: `row_total · col_total / grand_total`.
///
/// # Errors
/// [`StatsError::NotRectangular`] for ragged rows and
/// [`StatsError::Degenerate`] when a row or column sums to zero.
pub fn build_expected_matrix<R: AsRef<[f64]>>(table: &[R]) -> Result<Vec<Vec<f64>>> {
    let cols = table_width(table)?;
    let mut row_totals = Vec::with_capacity(table.len());
    let mut col_totals = vec![0.0; cols];
    for row in table {
        let row = row.as_ref();
        let mut total = 0.0;
        for (j, &v) in row.iter().enumerate() {
            check("count", v, v >= 0.0)?;
            total += v;
            col_totals[j] += v;
        }
        row_totals.push(total);
    }
    if row_totals.contains(&0.0) || col_totals.contains(&0.0) {
        return Err(StatsError::Degenerate("a row or column total is zero"));
    }
    let grand: f64 = row_totals.iter().sum();
    Ok(row_totals
        .iter()
        .map(|&r| col_totals.iter().map(|&c| r * c / grand).collect())
        .collect())
}

/// Goodness-of-fit test of observed counts against expected counts, with
/// `k − 1` degrees of freedom for `k` categories.
pub fn goodness_of_fit(observed: &[f64], expected: &[f64]) -> Result<TestResult> {
    let statistic = find_chi_square(observed, expected)?;
    if observed.len() < 2 {
        return Err(StatsError::InsufficientData {
            needed: 2,
            got: observed.len(),
        });
    }
    let df = (observed.len() - 1) as f64;
    Ok(TestResult {
        statistic,
        df,
        p_value: p_chisq_upper(statistic, df),
    })
}

/// Test of independence of the row and column factors of a contingency
/// table, with `(r − 1)(c − 1)` degrees of freedom.
///
/// # Examples
/// ```
/// use u_probdist::contingency::independence;
/// let table = [[30.0, 10.0, 20.0], [15.0, 25.0, 20.0]];
/// let res = independence(&table).unwrap();
/// assert_eq!(res.df, 2.0);
/// assert!(res.p_value < 0.01);
/// ```
pub fn independence<R: AsRef<[f64]>>(table: &[R]) -> Result<TestResult> {
    let expected = build_expected_matrix(table)?;
    let rows = table.len();
    let cols = expected[0].len();
    if rows < 2 || cols < 2 {
        return Err(StatsError::InsufficientData {
            needed: 2,
            got: rows.min(cols),
        });
    }
    let mut statistic = 0.0;
    for (row, exp) in table.iter().zip(&expected) {
        statistic += find_chi_square(row.as_ref(), exp)?;
    }
    let df = ((rows - 1) * (cols - 1)) as f64;
    Ok(TestResult {
        statistic,
        df,
        p_value: p_chisq_upper(statistic, df),
    })
}

/// Critical value `q_chisq(1 − alpha, df)`: the statistic beyond which a
/// test at level `alpha` rejects.
///
/// # Examples
/// ```
/// use u_probdist::contingency::chi_square_critical;
/// assert!((chi_square_critical(0.02, 4.0).unwrap() - 11.668).abs() < 1e-3);
/// ```
pub fn chi_square_critical(alpha: f64, df: f64) -> Result<f64> {
    let alpha = check_alpha(alpha)?;
    let df = check("df", df, df > 0.0)?;
    Ok(q_chisq(1.0 - alpha, df))
}

fn table_width<R: AsRef<[f64]>>(table: &[R]) -> Result<usize> {
    let first = table.first().ok_or(StatsError::EmptyInput)?.as_ref().len();
    if first == 0 {
        return Err(StatsError::EmptyInput);
    }
    for (row, r) in table.iter().enumerate() {
        let got = r.as_ref().len();
        if got != first {
            return Err(StatsError::NotRectangular {
                row,
                expected: first,
                got,
            });
        }
    }
    Ok(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::Decision;
    use approx::assert_relative_eq;

    #[test]
    fn test_find_chi_square() {
        let obs = [22.0, 38.0, 51.0, 20.0, 9.0];
        let exp = [14.0, 35.0, 56.0, 21.0, 14.0];
        assert_relative_eq!(
            find_chi_square(&obs, &exp).unwrap(),
            7.1083333333333325,
            max_relative = 1e-14
        );
        assert_eq!(find_chi_square(&exp, &exp).unwrap(), 0.0);
    }

    #[test]
    fn test_find_chi_square_errors() {
        assert_eq!(find_chi_square(&[], &[]), Err(StatsError::EmptyInput));
        assert_eq!(
            find_chi_square(&[1.0, 2.0], &[1.0]),
            Err(StatsError::LengthMismatch { left: 2, right: 1 })
        );
        assert_eq!(
            find_chi_square(&[1.0], &[0.0]),
            Err(StatsError::InvalidParameter {
                name: "expected",
                value: 0.0
            })
        );
        assert!(find_chi_square(&[-1.0], &[1.0]).is_err());
    }

    #[test]
    fn test_goodness_of_fit() {
        let obs = [22.0, 38.0, 51.0, 20.0, 9.0];
        let exp = [14.0, 35.0, 56.0, 21.0, 14.0];
        let res = goodness_of_fit(&obs, &exp).unwrap();
        assert_eq!(res.df, 4.0);
        assert_relative_eq!(res.p_value, 0.13027286042718355, max_relative = 1e-10);
        assert_eq!(res.decide(0.02).unwrap(), Decision::DontReject);
        assert_eq!(
            goodness_of_fit(&[3.0], &[3.0]),
            Err(StatsError::InsufficientData { needed: 2, got: 1 })
        );
    }

    #[test]
    fn test_expected_matrix() {
        let table = [[30.0, 10.0, 20.0], [15.0, 25.0, 20.0]];
        let e = build_expected_matrix(&table).unwrap();
        assert_eq!(e, vec![vec![22.5, 17.5, 20.0], vec![22.5, 17.5, 20.0]]);
        // margins of the expected matrix equal the observed margins
        let col0: f64 = e.iter().map(|r| r[0]).sum();
        assert_relative_eq!(col0, 45.0);
    }

    #[test]
    fn test_expected_matrix_errors() {
        let ragged: Vec<Vec<f64>> = vec![vec![1.0, 2.0], vec![3.0]];
        assert_eq!(
            build_expected_matrix(&ragged),
            Err(StatsError::NotRectangular {
                row: 1,
                expected: 2,
                got: 1
            })
        );
        let empty: [[f64; 0]; 0] = [];
        assert_eq!(build_expected_matrix(&empty), Err(StatsError::EmptyInput));
        assert!(matches!(
            build_expected_matrix(&[[1.0, 0.0], [2.0, 0.0]]),
            Err(StatsError::Degenerate(_))
        ));
    }

    #[test]
    fn test_independence() {
        let table = [[30.0, 10.0, 20.0], [15.0, 25.0, 20.0]];
        let res = independence(&table).unwrap();
        assert_relative_eq!(res.statistic, 11.42857142857143, max_relative = 1e-13);
        assert_eq!(res.df, 2.0);
        assert_relative_eq!(res.p_value, 0.0032985057559390883, max_relative = 1e-10);
        assert!(res.decide(0.05).unwrap().is_reject());
        assert!(matches!(
            independence(&[[1.0, 2.0, 3.0]]),
            Err(StatsError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_critical_values() {
        assert_relative_eq!(
            chi_square_critical(0.02, 4.0).unwrap(),
            11.667843403834779,
            max_relative = 1e-10
        );
        assert_relative_eq!(
            chi_square_critical(0.05, 1.0).unwrap(),
            3.8414588206941245,
            max_relative = 1e-10
        );
        assert!(chi_square_critical(0.0, 4.0).is_err());
        assert!(chi_square_critical(0.05, 0.0).is_err());
    }
}
