//! Poisson distribution: probability mass, distribution and quantile
//! functions.
//!
//! The mass function is Loader's saddle point [`dpois_raw`]; the distribution
//! function goes through the upper incomplete gamma identity
//! `P(X ≤ x) = Q(⌊x⌋ + 1, λ)`, and the quantile is a Cornish–Fisher seeded
//! discrete search.

use std::f64::consts::LN_2;

use crate::gamma::pgamma;
use crate::search::{cornish_fisher, DiscreteQuantile};
use crate::special::ln_gamma;

pub use crate::special::dpois_raw;

/// Poisson probability at `x_plus_1 − 1`, accurate when `x_plus_1` is close
/// to or below 1 where forming `x` first would lose digits.
///
/// Used as the leading factor of the incomplete gamma series, where the
/// shape `α` plays the role of `x + 1`.
pub fn dpois_wrap(x_plus_1: f64, lambda: f64, log_p: bool) -> f64 {
    const M_CUTOFF: f64 = LN_2 * f64::MAX_EXP as f64 / f64::EPSILON;

    if !lambda.is_finite() {
        return if log_p { f64::NEG_INFINITY } else { 0.0 };
    }
    if x_plus_1 > 1.0 {
        return dpois_raw(x_plus_1 - 1.0, lambda, log_p);
    }
    if lambda > (x_plus_1 - 1.0).abs() * M_CUTOFF {
        let v = -lambda - ln_gamma(x_plus_1);
        return if log_p { v } else { v.exp() };
    }
    let d = dpois_raw(x_plus_1, lambda, log_p);
    if log_p {
        d + (x_plus_1 / lambda).ln()
    } else {
        d * (x_plus_1 / lambda)
    }
}

fn dpois(x: f64, lambda: f64, log_p: bool) -> f64 {
    if x.is_nan() || lambda.is_nan() {
        return x + lambda;
    }
    if lambda < 0.0 {
        return f64::NAN;
    }
    if x < 0.0 || !x.is_finite() {
        return if log_p { f64::NEG_INFINITY } else { 0.0 };
    }
    dpois_raw(x.round(), lambda, log_p)
}

/// `P(X = x)` for `X ~ Poisson(λ)`.
///
/// Non-integer `x` is rounded to the nearest count. Returns NaN for `λ < 0`,
/// `0` for negative or infinite `x`; `λ = 0` is a point mass at zero.
///
/// # Examples
/// ```
/// use u_probdist::poisson::d_pois;
/// assert!((d_pois(3.0, 1.2) - 0.0867439330307142).abs() < 1e-15);
/// assert_eq!(d_pois(0.0, 0.0), 1.0);
/// ```
pub fn d_pois(x: f64, lambda: f64) -> f64 {
    dpois(x, lambda, false)
}

/// `ln P(X = x)`, finite far beyond where [`d_pois`] underflows.
pub fn ln_d_pois(x: f64, lambda: f64) -> f64 {
    dpois(x, lambda, true)
}

/// Argument checks shared by both tails: `Ok(k)` is the count for the gamma
/// identity, `Err(v)` the lower-tail value at a boundary.
fn ppois_bounds(x: f64, lambda: f64) -> Result<f64, f64> {
    if x.is_nan() || lambda.is_nan() {
        return Err(x + lambda);
    }
    if lambda < 0.0 {
        return Err(f64::NAN);
    }
    if x < 0.0 {
        return Err(0.0);
    }
    if lambda == 0.0 || !x.is_finite() {
        return Err(1.0);
    }
    // near-integers arriving from upstream rounding count as that integer
    Ok((x + 1e-7).floor())
}

/// `P(X ≤ x)` for `X ~ Poisson(λ)`.
///
/// # Examples
/// ```
/// use u_probdist::poisson::p_pois;
/// assert!((p_pois(10.0, 15.0) - 0.118464411529015).abs() < 1e-14);
/// assert_eq!(p_pois(4.0, 0.0), 1.0);
/// ```
pub fn p_pois(x: f64, lambda: f64) -> f64 {
    match ppois_bounds(x, lambda) {
        Ok(k) => pgamma(lambda, k + 1.0, 1.0, false, false),
        Err(v) => v,
    }
}

/// `P(X > x)` for `X ~ Poisson(λ)`, accurate deep in the upper tail.
pub fn p_pois_upper(x: f64, lambda: f64) -> f64 {
    match ppois_bounds(x, lambda) {
        Ok(k) => pgamma(lambda, k + 1.0, 1.0, true, false),
        Err(v) => 1.0 - v,
    }
}

/// Smallest count `y` with `P(X ≤ y) ≥ p` for `X ~ Poisson(λ)`.
///
/// # Returns
/// - `0` for `λ = 0` or `p = 0`; `+∞` for `p = 1` (or `p` within rounding
///   of 1).
/// - `NaN` for `p ∉ [0, 1]`, `λ < 0` or infinite `λ`.
///
/// # Examples
/// ```
/// use u_probdist::poisson::q_pois;
/// assert_eq!(q_pois(0.95, 15.0), 22.0);
/// ```
pub fn q_pois(p: f64, lambda: f64) -> f64 {
    if p.is_nan() || lambda.is_nan() {
        return p + lambda;
    }
    if !lambda.is_finite() || lambda < 0.0 {
        return f64::NAN;
    }
    if lambda == 0.0 {
        return 0.0;
    }
    if !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if p == 0.0 {
        return 0.0;
    }
    if p + 1.01 * f64::EPSILON >= 1.0 {
        return f64::INFINITY;
    }

    let sigma = lambda.sqrt();
    let seed = cornish_fisher(p, lambda, sigma, 1.0 / sigma).round();
    let search = DiscreteQuantile::new(|y| p_pois(y, lambda), f64::INFINITY);
    search.find(seed, p, lambda, seed * 0.001)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // (k, λ, P(X = k), P(X ≤ k), P(X > k))
    const REFERENCE: [(f64, f64, f64, f64, f64); 7] = [
        (3.0, 1.2, 0.086743933030714198055, 0.96623103181434432989, 0.033768968185655670111),
        (10.0, 15.0, 0.048610750829605320461, 0.11846441152901508815, 0.88153558847098491185),
        (5.0, 3.25, 0.11715976520559537937, 0.88881320176291069755, 0.11118679823708930245),
        (0.0, 5.0, 0.0067379469990854670966, 0.0067379469990854670966, 0.9932620530009145329),
        (1000.0, 1000.0, 0.012614611348721499718, 0.50840936716850599121, 0.49159063283149400879),
        (60.0, 15.0, 1.3517098091145866979e-18, 0.99999999999999999956, 4.3777677144297800741e-19),
        (2.0, 170.0 / 104.0, 0.26055338932662677858, 0.77437549190458917876, 0.22562450809541082124),
    ];

    #[test]
    fn test_reference_values() {
        for &(k, lambda, d, p, q) in &REFERENCE {
            assert_relative_eq!(d_pois(k, lambda), d, max_relative = 1e-13);
            assert_relative_eq!(ln_d_pois(k, lambda), d.ln(), max_relative = 1e-13);
            assert_relative_eq!(p_pois(k, lambda), p, max_relative = 1e-13);
            assert_relative_eq!(p_pois_upper(k, lambda), q, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_mass_sums_to_cdf() {
        let total: f64 = (0..=60).map(|k| d_pois(k as f64, 15.0)).sum();
        assert!((total - 1.0).abs() < 1e-14, "sum = {total}");
        assert!((total - p_pois(60.0, 15.0)).abs() < 1e-14);
    }

    #[test]
    fn test_deep_log_mass() {
        // tiny but still a normal f64
        assert_relative_eq!(d_pois(50.0, 1e-3), 3.2846631106433820453e-215, max_relative = 1e-12);
        let far = ln_d_pois(5000.0, 1e-3);
        assert!(far.is_finite() && far < -40_000.0);
        assert_eq!(d_pois(5000.0, 1e-3), 0.0);
    }

    #[test]
    fn test_non_integer_and_edge_arguments() {
        assert_eq!(d_pois(2.6, 1.5), d_pois(3.0, 1.5));
        assert_eq!(d_pois(-1.0, 1.5), 0.0);
        assert_eq!(d_pois(f64::INFINITY, 1.5), 0.0);
        assert!(d_pois(1.0, -1.0).is_nan());
        assert_eq!(d_pois(0.0, 0.0), 1.0);
        assert_eq!(d_pois(1.0, 0.0), 0.0);

        assert_eq!(p_pois(-0.5, 2.0), 0.0);
        assert_eq!(p_pois(3.0, 0.0), 1.0);
        assert_eq!(p_pois(f64::INFINITY, 2.0), 1.0);
        assert_eq!(p_pois_upper(-0.5, 2.0), 1.0);
        assert_eq!(p_pois_upper(3.0, 0.0), 0.0);
        assert!(p_pois(1.0, -2.0).is_nan());
        assert!(p_pois_upper(1.0, -2.0).is_nan());
        // a count just below an integer is that integer
        assert_eq!(p_pois(3.0 - 1e-9, 2.0), p_pois(3.0, 2.0));
    }

    #[test]
    fn test_dpois_wrap_near_zero() {
        assert_relative_eq!(dpois_wrap(1.0, 2.0, false), (-2.0_f64).exp(), max_relative = 1e-14);
        assert_relative_eq!(
            dpois_wrap(0.5, 2.0, true),
            dpois_raw(0.5, 2.0, true) + 0.25_f64.ln(),
            max_relative = 1e-15
        );
        assert_relative_eq!(dpois_wrap(4.0, 2.0, false), dpois_raw(3.0, 2.0, false));
        assert_eq!(dpois_wrap(3.0, f64::INFINITY, false), 0.0);
    }

    #[test]
    fn test_quantiles() {
        assert_eq!(q_pois(0.5, 3.2), 3.0);
        assert_eq!(q_pois(0.95, 15.0), 22.0);
        assert_eq!(q_pois(0.01, 100.0), 77.0);
        assert_eq!(q_pois(0.999, 0.5), 4.0);
        assert_eq!(q_pois(0.3, 0.01), 0.0);
    }

    #[test]
    fn test_quantile_edges() {
        assert_eq!(q_pois(0.0, 4.0), 0.0);
        assert_eq!(q_pois(1.0, 4.0), f64::INFINITY);
        assert_eq!(q_pois(0.5, 0.0), 0.0);
        assert!(q_pois(1.5, 4.0).is_nan());
        assert!(q_pois(0.5, -4.0).is_nan());
        assert!(q_pois(0.5, f64::INFINITY).is_nan());
    }

    #[test]
    fn test_quantile_large_lambda_uses_coarse_search() {
        let lambda = 2e6_f64;
        for &p in &[0.01_f64, 0.5, 0.99] {
            let y = q_pois(p, lambda);
            assert!(p_pois(y, lambda) >= p * (1.0 - 64.0 * f64::EPSILON));
            assert!(p_pois(y - 1.0, lambda) < p);
        }
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn quantile_of_cdf_is_identity(k in 0u32..400, lambda in 0.5_f64..300.0) {
            let k = k as f64;
            let p = p_pois(k, lambda);
            // interior only: flat CDF regions map to the left end
            prop_assume!(p > 1e-12 && p < 1.0 - 1e-9 && d_pois(k, lambda) > 1e-12);
            prop_assert_eq!(q_pois(p, lambda), k);
        }

        #[test]
        fn cdf_is_monotone(k in 0u32..500, lambda in 0.01_f64..500.0) {
            let k = k as f64;
            prop_assert!(p_pois(k, lambda) <= p_pois(k + 1.0, lambda) + 1e-15);
        }

        #[test]
        fn tails_are_complementary(k in 0u32..500, lambda in 0.01_f64..500.0) {
            let s = p_pois(k as f64, lambda) + p_pois_upper(k as f64, lambda);
            prop_assert!((s - 1.0).abs() < 1e-13);
        }

        #[test]
        fn mass_sums_to_one(lambda in 0.01_f64..200.0) {
            // beyond λ + 40√λ + 40 the remaining mass is far below 1e-16
            let last = (lambda + 40.0 * lambda.sqrt() + 40.0).ceil() as u32;
            let s: f64 = (0..=last).map(|k| d_pois(f64::from(k), lambda)).sum();
            prop_assert!((s - 1.0).abs() < 1e-12, "sum = {s}");
        }

        #[test]
        fn quantile_is_smallest_count_reaching_p(lambda in 0.01_f64..1000.0, p in 0.0001_f64..0.9999) {
            let q = q_pois(p, lambda);
            prop_assert!(q >= 0.0 && q.fract() == 0.0, "q = {q}");
            prop_assert!(p_pois(q, lambda) >= p * (1.0 - 64.0 * f64::EPSILON));
            if q > 0.0 {
                prop_assert!(p_pois(q - 1.0, lambda) < p);
            }
        }
    }
}
