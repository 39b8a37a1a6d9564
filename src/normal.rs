//! Normal distribution: density, distribution and quantile functions.
//!
//! `p_norm` sits on `libm`'s full-precision `erfc`; `q_norm` inverts through
//! `erfc⁻¹` and polishes with one Newton step on that CDF. `q_norm_cdf` is an
//! independent AS241 implementation that needs nothing but `ln` and `sqrt`.
//!
//! # References
//!
//! - Wichura, M. J. (1988). "Algorithm AS 241: The Percentage Points of the
//!   Normal Distribution". *Applied Statistics* 37(3), 477–484.
//! - Abramowitz & Stegun (1964), formula 7.1.26.

use libm::erfc;
use statrs::function::erf::erfc_inv;
use std::f64::consts::SQRT_2;

use crate::special::{FRAC_1_SQRT_2PI, LN_SQRT_2PI};

// ============================================================================
// Density
// ============================================================================

/// Density of N(μ, σ²) at `x`.
///
/// # Returns
/// - `NaN` if any argument is NaN, if `σ < 0`, or if `x` and `μ` are the
///   same infinity.
/// - `0` for infinite `σ` or an infinite standardized `x`.
/// - For `σ = 0`, a point mass: `+∞` at `x = μ`, else `0`.
///
/// # Examples
/// ```
/// use u_probdist::normal::d_norm;
/// assert!((d_norm(0.0, 0.0, 1.0) - 0.3989422804014327).abs() < 1e-16);
/// assert_eq!(d_norm(1.0, 1.0, 0.0), f64::INFINITY);
/// ```
pub fn d_norm(x: f64, mu: f64, sigma: f64) -> f64 {
    match standardize_for_density(x, mu, sigma) {
        Standardized::Value(z) => FRAC_1_SQRT_2PI * (-0.5 * z * z).exp() / sigma,
        Standardized::Fixed(v) => v,
    }
}

/// Log-density of N(μ, σ²) at `x`; same edge cases as [`d_norm`] on log scale.
pub fn ln_d_norm(x: f64, mu: f64, sigma: f64) -> f64 {
    match standardize_for_density(x, mu, sigma) {
        Standardized::Value(z) => -(LN_SQRT_2PI + 0.5 * z * z + sigma.ln()),
        Standardized::Fixed(v) => v.ln(),
    }
}

enum Standardized {
    Value(f64),
    Fixed(f64),
}

fn standardize_for_density(x: f64, mu: f64, sigma: f64) -> Standardized {
    if x.is_nan() || mu.is_nan() || sigma.is_nan() {
        return Standardized::Fixed(x + mu + sigma);
    }
    if sigma < 0.0 {
        return Standardized::Fixed(f64::NAN);
    }
    if sigma.is_infinite() {
        return Standardized::Fixed(0.0);
    }
    if x.is_infinite() && mu == x {
        return Standardized::Fixed(f64::NAN);
    }
    if sigma == 0.0 {
        return Standardized::Fixed(if x == mu { f64::INFINITY } else { 0.0 });
    }

    let z = ((x - mu) / sigma).abs();
    if !z.is_finite() || z >= 2.0 * f64::MAX.sqrt() {
        return Standardized::Fixed(0.0);
    }
    Standardized::Value(z)
}

// ============================================================================
// Distribution function
// ============================================================================

/// P(X ≤ x) for X ~ N(μ, σ²), computed as `erfc(−z/√2)/2`.
///
/// # Returns
/// `NaN` for NaN arguments or `σ < 0`. `σ = 0` is a step at `μ`.
///
/// # Examples
/// ```
/// use u_probdist::normal::p_norm;
/// // Waiting time ~ N(2.58, 0.76²): P(wait ≤ 4 min)
/// assert!((p_norm(4.0, 2.58, 0.76) - 0.969).abs() < 1e-3);
/// ```
pub fn p_norm(x: f64, mu: f64, sigma: f64) -> f64 {
    match standardize(x, mu, sigma) {
        Ok(z) => pnorm_both(z, true, false),
        Err(v) => v,
    }
}

/// P(X > x) for X ~ N(μ, σ²), accurate in the far upper tail.
pub fn p_norm_upper(x: f64, mu: f64, sigma: f64) -> f64 {
    match standardize(x, mu, sigma) {
        Ok(z) => pnorm_both(z, false, false),
        Err(v) => 0.5 - v + 0.5,
    }
}

/// ln P(X ≤ x), finite far into the lower tail where `p_norm` underflows.
///
/// # Examples
/// ```
/// use u_probdist::normal::ln_p_norm;
/// assert!((ln_p_norm(-40.0, 0.0, 1.0) + 804.6084420137538).abs() < 1e-9);
/// ```
pub fn ln_p_norm(x: f64, mu: f64, sigma: f64) -> f64 {
    match standardize(x, mu, sigma) {
        Ok(z) => pnorm_both(z, true, true),
        Err(v) => v.ln(),
    }
}

/// Standardized `z`, or the CDF value itself for the degenerate cases.
fn standardize(x: f64, mu: f64, sigma: f64) -> Result<f64, f64> {
    if x.is_nan() || mu.is_nan() || sigma.is_nan() {
        return Err(x + mu + sigma);
    }
    if !x.is_finite() && mu == x {
        return Err(f64::NAN);
    }
    if sigma < 0.0 {
        return Err(f64::NAN);
    }
    if sigma == 0.0 {
        return Err(if x < mu { 0.0 } else { 1.0 });
    }
    let z = (x - mu) / sigma;
    if z.is_infinite() {
        return Err(if z < 0.0 { 0.0 } else { 1.0 });
    }
    Ok(z)
}

/// Beyond this many standard deviations the log tail switches from `erfc`
/// to the Mills-ratio series, well before `erfc` goes subnormal.
const ASYMPTOTIC_LOG_TAIL: f64 = 35.0;

/// Standard normal CDF for either tail, optionally on log scale.
///
/// The small tail is read straight off `erfc`; its complement goes through
/// `ln_1p`.
pub(crate) fn pnorm_both(z: f64, lower_tail: bool, log_p: bool) -> f64 {
    if z.is_nan() {
        return f64::NAN;
    }
    // `u` is the point whose upper tail Q(u) is wanted.
    let u = if lower_tail { -z } else { z };
    let tail = 0.5 * erfc(u / SQRT_2);
    if !log_p {
        return tail;
    }

    if u <= 0.0 {
        return (-0.5 * erfc(-u / SQRT_2)).ln_1p();
    }
    if u < ASYMPTOTIC_LOG_TAIL {
        return tail.ln();
    }

    // ln Q(u) = −u²/2 − ln u − ln√(2π) + ln(1 − 1/u² + 3/u⁴ − 15/u⁶ + …)
    let u2 = u * u;
    let series = 1.0 - (1.0 - (3.0 - (15.0 - (105.0 - 945.0 / u2) / u2) / u2) / u2) / u2;
    -0.5 * u2 - u.ln() - LN_SQRT_2PI + series.ln()
}

/// Low-precision normal CDF from Abramowitz & Stegun 7.1.26.
///
/// Maximum absolute error ≈ 1.5 × 10⁻⁷. Kept for reproducing hand-worked
/// table lookups; prefer [`p_norm`] everywhere else.
///
/// # Examples
/// ```
/// use u_probdist::normal::p_norm_cdf;
/// assert!((p_norm_cdf(-0.25) - 0.4013).abs() < 1e-4);
/// ```
pub fn p_norm_cdf(x: f64) -> f64 {
    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    if x.is_nan() {
        return f64::NAN;
    }

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs() / SQRT_2;
    let t = 1.0 / (1.0 + P * x);
    let poly = ((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t;
    let y = 1.0 - poly * (-x * x).exp();

    0.5 * (1.0 + sign * y)
}

// ============================================================================
// Quantile
// ============================================================================

/// Quantile of N(μ, σ²) through the inverse complementary error function:
/// `μ + σ·(−√2 · erfc⁻¹(2p))`, refined by one Newton step on [`p_norm`].
///
/// # Returns
/// - `−∞` at `p = 0`, `+∞` at `p = 1`, `μ` when `σ = 0`.
/// - `NaN` for `p ∉ [0, 1]`, `σ < 0`, or NaN arguments.
///
/// # Examples
/// ```
/// use u_probdist::normal::q_norm;
/// // Cholesterol ~ N(201, 46²): level separating the lowest 22%
/// assert!((q_norm(0.22, 201.0, 46.0) - 165.479).abs() < 1e-3);
/// assert_eq!(q_norm(0.5, 3.0, 2.0), 3.0);
/// ```
pub fn q_norm(p: f64, mu: f64, sigma: f64) -> f64 {
    if let Some(v) = quantile_boundaries(p, mu, sigma) {
        return v;
    }
    if p == 0.5 {
        return mu;
    }
    let z = -SQRT_2 * erfc_inv(2.0 * p);
    // residual taken in the smaller tail, where 1 − p is exact
    let resid = if p < 0.5 {
        pnorm_both(z, true, false) - p
    } else {
        (0.5 - p + 0.5) - pnorm_both(z, false, false)
    };
    let dens = FRAC_1_SQRT_2PI * (-0.5 * z * z).exp();
    let z = if dens > 0.0 && resid.is_finite() {
        z - resid / dens
    } else {
        z
    };
    mu + sigma * z
}

/// Shared argument checks for both quantile implementations.
fn quantile_boundaries(p: f64, mu: f64, sigma: f64) -> Option<f64> {
    if p.is_nan() || mu.is_nan() || sigma.is_nan() {
        return Some(p + mu + sigma);
    }
    if !(0.0..=1.0).contains(&p) || sigma < 0.0 {
        return Some(f64::NAN);
    }
    if p == 0.0 {
        return Some(f64::NEG_INFINITY);
    }
    if p == 1.0 {
        return Some(f64::INFINITY);
    }
    if sigma == 0.0 {
        return Some(mu);
    }
    None
}

/// Quantile of N(μ, σ²) by Wichura's AS241 (PPND16).
///
/// # Algorithm
/// Three rational minimax approximations keyed on `q = p − ½`:
/// - `|q| ≤ 0.425`: degree 7/7 rational in `r = 0.180625 − q²`.
/// - otherwise `r = √(−ln min(p, 1−p))`, with one fit for `r ≤ 5`
///   and another beyond.
///
/// # Accuracy
/// About 1 part in 10¹⁶ over the whole range.
///
/// # Returns
/// Invalid `p` or `σ < 0` give `NaN`; nothing here aborts the caller.
///
/// # Examples
/// ```
/// use u_probdist::normal::q_norm_cdf;
/// assert!((q_norm_cdf(0.975, 0.0, 1.0) - 1.959963984540054).abs() < 1e-15);
/// assert!(q_norm_cdf(1.5, 0.0, 1.0).is_nan());
/// ```
#[allow(clippy::excessive_precision)]
pub fn q_norm_cdf(p: f64, mu: f64, sigma: f64) -> f64 {
    if let Some(v) = quantile_boundaries(p, mu, sigma) {
        return v;
    }

    let q = p - 0.5;
    let val = if q.abs() <= 0.425 {
        let r = 0.180625 - q * q;
        q * (((((((r * 2509.0809287301226727 + 33430.575583588128105) * r
            + 67265.770927008700853)
            * r
            + 45921.953931549871457)
            * r
            + 13731.693765509461125)
            * r
            + 1971.5909503065514427)
            * r
            + 133.14166789178437745)
            * r
            + 3.387132872796366608)
            / (((((((r * 5226.495278852854561 + 28729.085735721942674) * r
                + 39307.89580009271061)
                * r
                + 21213.794301586595867)
                * r
                + 5394.1960214247511077)
                * r
                + 687.1870074920579083)
                * r
                + 42.313330701600911252)
                * r
                + 1.0)
    } else {
        let tail = if q > 0.0 { 1.0 - p } else { p };
        let mut r = (-tail.ln()).sqrt();

        let val = if r <= 5.0 {
            r -= 1.6;
            (((((((r * 7.7454501427834140764e-4 + 0.0227238449892691845833) * r
                + 0.24178072517745061177)
                * r
                + 1.27045825245236838258)
                * r
                + 3.64784832476320460504)
                * r
                + 5.7694972214606914055)
                * r
                + 4.6303378461565452959)
                * r
                + 1.42343711074968357734)
                / (((((((r * 1.05075007164441684324e-9 + 5.475938084995344946e-4) * r
                    + 0.0151986665636164571966)
                    * r
                    + 0.14810397642748007459)
                    * r
                    + 0.68976733498510000455)
                    * r
                    + 1.6763848301838038494)
                    * r
                    + 2.05319162663775882187)
                    * r
                    + 1.0)
        } else {
            r -= 5.0;
            (((((((r * 2.01033439929228813265e-7 + 2.71155556874348757815e-5) * r
                + 0.0012426609473880784386)
                * r
                + 0.026532189526576123093)
                * r
                + 0.29656057182850489123)
                * r
                + 1.7848265399172913358)
                * r
                + 5.4637849111641143699)
                * r
                + 6.6579046435011037772)
                / (((((((r * 2.04426310338993978564e-15 + 1.4215117583164458887e-7) * r
                    + 1.8463183175100546818e-5)
                    * r
                    + 7.868691311456132591e-4)
                    * r
                    + 0.0148753612908506148525)
                    * r
                    + 0.13692988092273580531)
                    * r
                    + 0.59983220655588793769)
                    * r
                    + 1.0)
        };

        if q < 0.0 {
            -val
        } else {
            val
        }
    };

    mu + sigma * val
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        #[test]
        fn cdf_in_zero_one(x in -40.0_f64..40.0) {
            let c = p_norm(x, 0.0, 1.0);
            prop_assert!((0.0..=1.0).contains(&c), "CDF({x}) = {c} out of [0,1]");
        }

        #[test]
        fn cdf_is_monotonic(x1 in -10.0_f64..10.0, x2 in -10.0_f64..10.0) {
            let (lo, hi) = if x1 <= x2 { (x1, x2) } else { (x2, x1) };
            prop_assert!(p_norm(lo, 0.0, 1.0) <= p_norm(hi, 0.0, 1.0));
        }

        #[test]
        fn tails_sum_to_one(x in -8.0_f64..8.0, mu in -5.0_f64..5.0, sigma in 0.1_f64..10.0) {
            let s = p_norm(x, mu, sigma) + p_norm_upper(x, mu, sigma);
            prop_assert!((s - 1.0).abs() < 1e-15);
        }

        #[test]
        fn quantiles_agree(p in 1e-12_f64..(1.0 - 1e-12)) {
            let a = q_norm(p, 0.0, 1.0);
            let b = q_norm_cdf(p, 0.0, 1.0);
            prop_assert!((a - b).abs() < 1e-9 * b.abs().max(1.0), "{a} vs {b} at p={p}");
        }

        #[test]
        fn inverse_roundtrip(p in 0.001_f64..0.999) {
            let z = q_norm_cdf(p, 0.0, 1.0);
            prop_assert!((p_norm(z, 0.0, 1.0) - p).abs() < 1e-13);
        }

        #[test]
        fn log_cdf_matches_cdf(x in -30.0_f64..8.0) {
            let direct = p_norm(x, 0.0, 1.0).ln();
            let logged = ln_p_norm(x, 0.0, 1.0);
            prop_assert!((direct - logged).abs() < 1e-12 * direct.abs().max(1e-3));
        }
    }
}
