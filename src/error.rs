//! Error type for the interval, test and regression helpers.
//!
//! The distribution functions themselves never fail: they return `NaN` for
//! invalid parameters. Functions that take whole samples or tables report
//! what was wrong with them instead.

use thiserror::Error;

/// Errors from functions that work on samples, tables or test settings.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    /// No observations
    #[error("input is empty")]
    EmptyInput,

    /// Paired inputs of different lengths
    #[error("length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    /// Fewer observations than the statistic needs
    #[error("need at least {needed} observations, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Parameter outside its domain, or not finite
    #[error("invalid {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    /// The statistic is undefined for this data (zero variance, zero totals)
    #[error("degenerate input: {0}")]
    Degenerate(&'static str),

    /// Contingency table row of the wrong width
    #[error("row {row} has {got} columns, expected {expected}")]
    NotRectangular {
        row: usize,
        expected: usize,
        got: usize,
    },
}

/// Result alias for this crate's fallible helpers.
pub type Result<T> = std::result::Result<T, StatsError>;

/// Checks `value` is finite and satisfies `valid`, naming it in the error.
pub(crate) fn check(name: &'static str, value: f64, valid: bool) -> Result<f64> {
    if value.is_finite() && valid {
        Ok(value)
    } else {
        Err(StatsError::InvalidParameter { name, value })
    }
}

/// Checks `alpha` is a significance level in `(0, 1)`.
pub(crate) fn check_alpha(alpha: f64) -> Result<f64> {
    check("alpha", alpha, alpha > 0.0 && alpha < 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(StatsError::EmptyInput.to_string(), "input is empty");
        assert_eq!(
            StatsError::LengthMismatch { left: 3, right: 4 }.to_string(),
            "length mismatch: 3 vs 4"
        );
        assert_eq!(
            StatsError::InvalidParameter {
                name: "alpha",
                value: 1.5
            }
            .to_string(),
            "invalid alpha: 1.5"
        );
        assert_eq!(
            StatsError::NotRectangular {
                row: 1,
                expected: 3,
                got: 2
            }
            .to_string(),
            "row 1 has 2 columns, expected 3"
        );
    }

    #[test]
    fn test_check() {
        assert_eq!(check("n", 4.0, true), Ok(4.0));
        assert!(check("n", f64::NAN, true).is_err());
        assert!(check("n", f64::INFINITY, true).is_err());
        assert_eq!(
            check_alpha(0.0),
            Err(StatsError::InvalidParameter {
                name: "alpha",
                value: 0.0
            })
        );
        assert_eq!(check_alpha(0.05), Ok(0.05));
    }
}
