//! Sampling distributions, confidence intervals and hypothesis tests.
//!
//! The closed-form helpers (`q_sigma_clt`, `proportion_moe`, ...) are plain
//! formulas over `f64` and propagate NaN like the distribution functions.
//! Everything that takes a sample, a confidence level or a significance
//! level validates it and returns [`Result`].
//!
//! # Examples
//! ```
//! use u_probdist::inference::ConfidenceInterval;
//! // 137 of 238 polled voters approve
//! let ci = ConfidenceInterval::proportion(137, 238, 0.95).unwrap();
//! assert!((ci.lower() - 0.513).abs() < 1e-3);
//! assert!((ci.upper() - 0.638).abs() < 1e-3);
//! ```

use std::fmt;

use crate::error::{check, check_alpha, Result, StatsError};
use crate::normal::{p_norm, p_norm_upper, q_norm};
use crate::stats::{mean, variance};
use crate::student::{p_t, p_t_upper, q_t};

/// Two-sided 95% normal critical value, rounded to five decimals.
pub const Z_95: f64 = 1.95996;

/// Two-sided 90% normal critical value, rounded to five decimals.
pub const Z_90: f64 = 1.64485;

// ---------------------------------------------------------------------------
// Central limit theorem
// ---------------------------------------------------------------------------

/// Standard error `σ/√n` of a sample mean.
pub fn q_sigma_clt(n: f64, sigma: f64) -> f64 {
    sigma / n.sqrt()
}

/// Standard error `√(p(1−p)/n)` of a sample proportion.
pub fn p_sigma_clt(n: f64, p: f64) -> f64 {
    (p * (1.0 - p) / n).sqrt()
}

/// Standardizes `x`: `(x − μ)/σ`.
pub fn z_clt(x: f64, mu: f64, sigma: f64) -> f64 {
    (x - mu) / sigma
}

/// Inverse of [`z_clt`]: `μ + zσ`.
pub fn x_clt(z: f64, mu: f64, sigma: f64) -> f64 {
    mu + z * sigma
}

/// z statistic of an observed proportion `phat` against population `p`.
///
/// # Examples
/// ```
/// use u_probdist::inference::z_phat;
/// use u_probdist::normal::p_norm;
/// // P(p̂ ≤ 0.80) when p = 0.81, n = 100
/// let prob = p_norm(z_phat(100.0, 0.81, 0.80), 0.0, 1.0);
/// assert!((prob - 0.3994).abs() < 1e-4);
/// ```
pub fn z_phat(n: f64, p: f64, phat: f64) -> f64 {
    (phat - p) / p_sigma_clt(n, p)
}

// ---------------------------------------------------------------------------
// Margins of error and sample sizes
// ---------------------------------------------------------------------------

/// Margin of error `z·√(p̂(1−p̂)/n)` of a proportion.
pub fn proportion_moe(n: f64, z: f64, phat: f64) -> f64 {
    z * p_sigma_clt(n, phat)
}

/// Margin of error `t·σ/√n` of a mean.
pub fn mean_moe(n: f64, t: f64, sigma: f64) -> f64 {
    t * q_sigma_clt(n, sigma)
}

/// Sample size `p̂(1−p̂)(z/E)²` for a proportion margin of error `moe`.
///
/// The result is not rounded; round it up to get a whole sample size. With
/// no prior estimate use `phat = 0.5`, the worst case.
pub fn proportion_n(moe: f64, z: f64, phat: f64) -> f64 {
    phat * (1.0 - phat) * (z / moe).powi(2)
}

/// Sample size `(zσ/E)²` for a mean margin of error `moe`.
pub fn mean_n(moe: f64, z: f64, sigma: f64) -> f64 {
    (z * sigma / moe).powi(2)
}

// ---------------------------------------------------------------------------
// Critical values
// ---------------------------------------------------------------------------

/// Two-sided standard normal critical value for `confidence` in `(0, 1)`.
///
/// # Examples
/// ```
/// use u_probdist::inference::z_critical;
/// assert!((z_critical(0.95).unwrap() - 1.959963984540054).abs() < 1e-12);
/// ```
pub fn z_critical(confidence: f64) -> Result<f64> {
    let c = check_confidence(confidence)?;
    Ok(q_norm(0.5 + 0.5 * c, 0.0, 1.0))
}

/// Two-sided Student t critical value for `confidence` and `df > 0`.
pub fn t_critical(confidence: f64, df: f64) -> Result<f64> {
    let c = check_confidence(confidence)?;
    let df = check("df", df, df > 0.0)?;
    Ok(q_t(0.5 + 0.5 * c, df))
}

fn check_confidence(confidence: f64) -> Result<f64> {
    check("confidence", confidence, confidence > 0.0 && confidence < 1.0)
}

// ---------------------------------------------------------------------------
// Confidence intervals
// ---------------------------------------------------------------------------

/// Symmetric interval `estimate ± margin`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceInterval {
    pub estimate: f64,
    pub margin: f64,
    pub confidence: f64,
}

impl ConfidenceInterval {
    /// Wald interval for a proportion of `successes` out of `n` trials.
    pub fn proportion(successes: u64, n: u64, confidence: f64) -> Result<Self> {
        if n == 0 {
            return Err(StatsError::EmptyInput);
        }
        if successes > n {
            return Err(StatsError::InvalidParameter {
                name: "successes",
                value: successes as f64,
            });
        }
        let z = z_critical(confidence)?;
        let nf = n as f64;
        let phat = successes as f64 / nf;
        Ok(Self {
            estimate: phat,
            margin: proportion_moe(nf, z, phat),
            confidence,
        })
    }

    /// t interval for the mean of `data`, using the sample standard deviation.
    pub fn mean(data: &[f64], confidence: f64) -> Result<Self> {
        let (xbar, sd, n) = summarize(data)?;
        let t = t_critical(confidence, n - 1.0)?;
        Ok(Self {
            estimate: xbar,
            margin: mean_moe(n, t, sd),
            confidence,
        })
    }

    /// z interval for a mean from `n` observations with known `sigma`.
    pub fn mean_known_sigma(xbar: f64, sigma: f64, n: u64, confidence: f64) -> Result<Self> {
        if n == 0 {
            return Err(StatsError::EmptyInput);
        }
        let xbar = check("xbar", xbar, true)?;
        let sigma = check("sigma", sigma, sigma > 0.0)?;
        let z = z_critical(confidence)?;
        Ok(Self {
            estimate: xbar,
            margin: mean_moe(n as f64, z, sigma),
            confidence,
        })
    }

    pub fn lower(&self) -> f64 {
        self.estimate - self.margin
    }

    pub fn upper(&self) -> f64 {
        self.estimate + self.margin
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lower() <= value && value <= self.upper()
    }
}

// ---------------------------------------------------------------------------
// Test statistics
// ---------------------------------------------------------------------------

/// One-proportion z statistic `(p̂ − p₀)/√(p₀(1−p₀)/n)`.
pub fn proportion_hypothesis_z(n: u64, phat: f64, p0: f64) -> f64 {
    (phat - p0) / p_sigma_clt(n as f64, p0)
}

/// One-sample statistic `(x̄ − μ)/(σ/√n)`; a t statistic when `sigma` is
/// the sample standard deviation.
pub fn mean_hypothesis_t(n: u64, xbar: f64, mu: f64, sigma: f64) -> f64 {
    (xbar - mu) / q_sigma_clt(n as f64, sigma)
}

/// Pooled two-proportion z statistic for `x1/n1 − x2/n2`.
pub fn two_proportion_z(x1: u64, n1: u64, x2: u64, n2: u64) -> Result<f64> {
    if n1 == 0 || n2 == 0 {
        return Err(StatsError::EmptyInput);
    }
    for &(name, x, n) in &[("x1", x1, n1), ("x2", x2, n2)] {
        if x > n {
            return Err(StatsError::InvalidParameter {
                name,
                value: x as f64,
            });
        }
    }
    let (n1f, n2f) = (n1 as f64, n2 as f64);
    let pooled = (x1 + x2) as f64 / (n1f + n2f);
    let se = (pooled * (1.0 - pooled) * (1.0 / n1f + 1.0 / n2f)).sqrt();
    if se == 0.0 {
        return Err(StatsError::Degenerate("pooled proportion is 0 or 1"));
    }
    Ok((x1 as f64 / n1f - x2 as f64 / n2f) / se)
}

/// Welch's t statistic for `mean(a) − mean(b)` and its
/// Welch–Satterthwaite degrees of freedom, as `(t, df)`.
pub fn welch_t(a: &[f64], b: &[f64]) -> Result<(f64, f64)> {
    let (ma, sa, na) = summarize(a)?;
    let (mb, sb, nb) = summarize(b)?;
    let va = sa * sa / na;
    let vb = sb * sb / nb;
    let se2 = va + vb;
    if se2 == 0.0 {
        return Err(StatsError::Degenerate("both samples are constant"));
    }
    let df = se2 * se2 / (va * va / (na - 1.0) + vb * vb / (nb - 1.0));
    Ok(((ma - mb) / se2.sqrt(), df))
}

/// Mean, sample standard deviation and size of a sample with `n ≥ 2`.
fn summarize(data: &[f64]) -> Result<(f64, f64, f64)> {
    match data.len() {
        0 => return Err(StatsError::EmptyInput),
        1 => return Err(StatsError::InsufficientData { needed: 2, got: 1 }),
        _ => {}
    }
    let m = mean(data).ok_or(StatsError::Degenerate("sample contains NaN or Inf"))?;
    let v = variance(data).ok_or(StatsError::Degenerate("sample contains NaN or Inf"))?;
    Ok((m, v.sqrt(), data.len() as f64))
}

// ---------------------------------------------------------------------------
// p-values and decisions
// ---------------------------------------------------------------------------

/// Alternative hypothesis of a test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alternative {
    /// The parameter differs from the null value.
    TwoSided,
    /// The parameter is below the null value.
    Less,
    /// The parameter is above the null value.
    Greater,
}

/// p-value of a standard normal statistic `z`.
pub fn z_p_value(z: f64, alternative: Alternative) -> f64 {
    match alternative {
        Alternative::TwoSided => (2.0 * p_norm_upper(z.abs(), 0.0, 1.0)).min(1.0),
        Alternative::Less => p_norm(z, 0.0, 1.0),
        Alternative::Greater => p_norm_upper(z, 0.0, 1.0),
    }
}

/// p-value of a Student t statistic with `df` degrees of freedom.
pub fn t_p_value(t: f64, df: f64, alternative: Alternative) -> f64 {
    match alternative {
        Alternative::TwoSided => (2.0 * p_t_upper(t.abs(), df)).min(1.0),
        Alternative::Less => p_t(t, df),
        Alternative::Greater => p_t_upper(t, df),
    }
}

/// Outcome of comparing a p-value with a significance level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Reject,
    DontReject,
}

impl Decision {
    /// Rejects the null hypothesis when `p_value < alpha`.
    ///
    /// # Examples
    /// ```
    /// use u_probdist::inference::Decision;
    /// assert_eq!(Decision::from_p_value(0.01, 0.05), Decision::Reject);
    /// assert_eq!(Decision::from_p_value(0.05, 0.05).to_string(), "don't reject H0");
    /// ```
    pub fn from_p_value(p_value: f64, alpha: f64) -> Self {
        if p_value < alpha {
            Decision::Reject
        } else {
            Decision::DontReject
        }
    }

    pub fn is_reject(self) -> bool {
        self == Decision::Reject
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Reject => f.write_str("reject H0"),
            Decision::DontReject => f.write_str("don't reject H0"),
        }
    }
}

/// Statistic, degrees of freedom and p-value of a completed test.
///
/// z tests report `df = ∞`, the limit in which Student's t is normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestResult {
    pub statistic: f64,
    pub df: f64,
    pub p_value: f64,
}

impl TestResult {
    /// Decision at significance level `alpha` in `(0, 1)`.
    pub fn decide(&self, alpha: f64) -> Result<Decision> {
        let alpha = check_alpha(alpha)?;
        Ok(Decision::from_p_value(self.p_value, alpha))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// One-proportion z test of `successes/n` against `p0`.
pub fn one_proportion_z_test(
    successes: u64,
    n: u64,
    p0: f64,
    alternative: Alternative,
) -> Result<TestResult> {
    if n == 0 {
        return Err(StatsError::EmptyInput);
    }
    let p0 = check("p0", p0, p0 > 0.0 && p0 < 1.0)?;
    if successes > n {
        return Err(StatsError::InvalidParameter {
            name: "successes",
            value: successes as f64,
        });
    }
    let z = proportion_hypothesis_z(n, successes as f64 / n as f64, p0);
    Ok(TestResult {
        statistic: z,
        df: f64::INFINITY,
        p_value: z_p_value(z, alternative),
    })
}

/// One-sample t test of `mean(data) = mu0`.
///
/// # Examples
/// ```
/// use u_probdist::inference::{one_sample_t_test, Alternative};
/// let data = [5.1, 4.9, 5.6, 5.8, 6.0, 5.3, 5.5];
/// let res = one_sample_t_test(&data, 5.0, Alternative::TwoSided).unwrap();
/// assert_eq!(res.df, 6.0);
/// assert!((res.p_value - 0.02038).abs() < 1e-5);
/// ```
pub fn one_sample_t_test(data: &[f64], mu0: f64, alternative: Alternative) -> Result<TestResult> {
    let mu0 = check("mu0", mu0, true)?;
    let (xbar, sd, n) = summarize(data)?;
    if sd == 0.0 {
        return Err(StatsError::Degenerate("sample is constant"));
    }
    let t = mean_hypothesis_t(data.len() as u64, xbar, mu0, sd);
    let df = n - 1.0;
    Ok(TestResult {
        statistic: t,
        df,
        p_value: t_p_value(t, df, alternative),
    })
}

/// Welch two-sample t test of `mean(a) = mean(b)`; variances need not be
/// equal.
pub fn two_sample_t_test(a: &[f64], b: &[f64], alternative: Alternative) -> Result<TestResult> {
    let (t, df) = welch_t(a, b)?;
    Ok(TestResult {
        statistic: t,
        df,
        p_value: t_p_value(t, df, alternative),
    })
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn two_sided_is_twice_smaller_tail(z in -8.0_f64..8.0) {
            let two = z_p_value(z, Alternative::TwoSided);
            let one = z_p_value(z, Alternative::Less).min(z_p_value(z, Alternative::Greater));
            prop_assert!((two - 2.0 * one).abs() < 1e-14);
        }

        #[test]
        fn t_p_value_tails_sum_to_one(t in -20.0_f64..20.0, df in 1.0_f64..200.0) {
            let s = t_p_value(t, df, Alternative::Less) + t_p_value(t, df, Alternative::Greater);
            prop_assert!((s - 1.0).abs() < 1e-12);
        }

        #[test]
        fn interval_covers_estimate_and_widens(
            x in 1_u64..99,
            c1 in 0.5_f64..0.9,
            dc in 0.01_f64..0.09,
        ) {
            let narrow = ConfidenceInterval::proportion(x, 100, c1).unwrap();
            let wide = ConfidenceInterval::proportion(x, 100, c1 + dc).unwrap();
            prop_assert!(narrow.contains(narrow.estimate));
            prop_assert!(wide.margin > narrow.margin);
        }

        #[test]
        fn z_critical_inverts_two_sided_p(c in 0.01_f64..0.999) {
            let z = z_critical(c).unwrap();
            let p = z_p_value(z, Alternative::TwoSided);
            prop_assert!((p - (1.0 - c)).abs() < 1e-10);
        }
    }
}
