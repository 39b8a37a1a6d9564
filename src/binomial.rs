//! Binomial distribution: probability mass, distribution and quantile
//! functions for `X ~ Bin(n, p)`.
//!
//! The mass function uses Loader's saddle point decomposition so `n` in the
//! millions costs the same as `n = 10` and does not overflow. The CDF sums
//! mass terms outward from `k` on whichever side of the mode is the small
//! tail, stopping once terms no longer change the sum.
//!
//! # References
//!
//! Loader, C. (2000). "Fast and Accurate Computation of Binomial
//! Probabilities".

use std::f64::consts::TAU;

use crate::search::{cornish_fisher, DiscreteQuantile};
use crate::special::{bd0, ln_gamma, stirlerr};

/// `ln C(n, k)`; `−∞` when `k > n`.
///
/// # Examples
/// ```
/// use u_probdist::binomial::log_choose;
/// assert!((log_choose(10, 3) - 120.0_f64.ln()).abs() < 1e-13);
/// assert_eq!(log_choose(3, 5), f64::NEG_INFINITY);
/// ```
pub fn log_choose(n: u64, k: u64) -> f64 {
    if k > n {
        return f64::NEG_INFINITY;
    }
    if k == 0 || k == n {
        return 0.0;
    }
    let (n, k) = (n as f64, k as f64);
    ln_gamma(n + 1.0) - ln_gamma(k + 1.0) - ln_gamma(n - k + 1.0)
}

/// `ln P(X = k)` for `X ~ Bin(n, p)`.
///
/// # Returns
/// - `NaN` if `p` is NaN or outside `[0, 1]`.
/// - `−∞` for `k > n` and for counts impossible under `p = 0` or `p = 1`.
pub fn ln_d_binom(k: u64, n: u64, p: f64) -> f64 {
    if !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if k > n {
        return f64::NEG_INFINITY;
    }
    if p == 0.0 {
        return if k == 0 { 0.0 } else { f64::NEG_INFINITY };
    }
    if p == 1.0 {
        return if k == n { 0.0 } else { f64::NEG_INFINITY };
    }

    let q = 1.0 - p;
    let nf = n as f64;
    if k == 0 {
        return nf * (-p).ln_1p();
    }
    if k == n {
        return nf * p.ln();
    }

    let kf = k as f64;
    let rest = nf - kf;
    let lc = stirlerr(nf) - stirlerr(kf) - stirlerr(rest) - bd0(kf, nf * p) - bd0(rest, nf * q);
    // ln(2πk(n−k)/n)
    let lf = TAU.ln() + kf.ln() + (-kf / nf).ln_1p();
    lc - 0.5 * lf
}

/// `P(X = k)` for `X ~ Bin(n, p)`.
///
/// # Examples
/// ```
/// use u_probdist::binomial::d_binom;
/// assert!((d_binom(7, 10, 0.44) - 0.0672843501863436).abs() < 1e-15);
/// assert_eq!(d_binom(0, 5, 0.0), 1.0);
/// assert_eq!(d_binom(2, 5, 0.0), 0.0);
/// ```
pub fn d_binom(k: u64, n: u64, p: f64) -> f64 {
    ln_d_binom(k, n, p).exp()
}

/// The mode `⌊(n + 1)p⌋`, capped at `n`.
fn mode(n: u64, p: f64) -> u64 {
    (((n as f64) + 1.0) * p).floor().min(n as f64) as u64
}

/// `P(X ≤ k)` for `k` below the mode, summed downward from `k`.
fn lower_sum(k: u64, n: u64, p: f64) -> f64 {
    let ln_q_over_p = (-p).ln_1p() - p.ln();
    let nf = n as f64;
    let mut log_term = ln_d_binom(k, n, p);
    let mut sum = 0.0;
    let mut j = k;
    loop {
        let term = log_term.exp();
        sum += term;
        if j == 0 || term <= sum * f64::EPSILON {
            return sum;
        }
        let jf = j as f64;
        // ratio of mass at j−1 to mass at j
        log_term += (jf / (nf - jf + 1.0)).ln() + ln_q_over_p;
        j -= 1;
    }
}

/// `P(X > k)` for `k` at or above the mode, summed upward from `k + 1`.
fn upper_sum(k: u64, n: u64, p: f64) -> f64 {
    let ln_p_over_q = p.ln() - (-p).ln_1p();
    let nf = n as f64;
    let mut j = k + 1;
    let mut log_term = ln_d_binom(j, n, p);
    let mut sum = 0.0;
    loop {
        let term = log_term.exp();
        sum += term;
        if j == n || term <= sum * f64::EPSILON {
            return sum;
        }
        let jf = j as f64;
        log_term += ((nf - jf) / (jf + 1.0)).ln() + ln_p_over_q;
        j += 1;
    }
}

/// Splits the CDF into the tail that is summed directly; `Err` carries a
/// closed-form lower-tail value.
fn tail_split(k: u64, n: u64, p: f64) -> Result<bool, f64> {
    if !(0.0..=1.0).contains(&p) {
        return Err(f64::NAN);
    }
    if k >= n || p == 0.0 {
        return Err(1.0);
    }
    if p == 1.0 {
        return Err(0.0);
    }
    Ok(k < mode(n, p))
}

/// `P(X ≤ k)` for `X ~ Bin(n, p)`, counting `k = 0`.
///
/// # Examples
/// ```
/// use u_probdist::binomial::p_binom;
/// assert!((p_binom(17, 25, 0.63) - 0.7626331489257697).abs() < 1e-14);
/// assert_eq!(p_binom(10, 10, 0.3), 1.0);
/// ```
pub fn p_binom(k: u64, n: u64, p: f64) -> f64 {
    match tail_split(k, n, p) {
        Ok(true) => lower_sum(k, n, p).min(1.0),
        Ok(false) => (1.0 - upper_sum(k, n, p)).max(0.0),
        Err(v) => v,
    }
}

/// `P(X > k)` for `X ~ Bin(n, p)`, without cancellation in the upper tail.
pub fn p_binom_upper(k: u64, n: u64, p: f64) -> f64 {
    match tail_split(k, n, p) {
        Ok(true) => (1.0 - lower_sum(k, n, p)).max(0.0),
        Ok(false) => upper_sum(k, n, p).min(1.0),
        Err(v) => 1.0 - v,
    }
}

/// Smallest `y` with `P(X ≤ y) ≥ p` for `X ~ Bin(n, pr)`.
///
/// `n` is taken as `f64` so callers can pass counts computed in floating
/// point; it must be a non-negative integer value.
///
/// # Returns
/// - `NaN` for NaN arguments, non-integral or negative `n`, infinite `n`,
///   `pr ∉ [0, 1]` or `p ∉ [0, 1]`.
/// - `0` for `p = 0`, `pr = 0` or `n = 0`; `n` for `p = 1` or `pr = 1`.
///
/// # Examples
/// ```
/// use u_probdist::binomial::q_binom;
/// assert_eq!(q_binom(0.95, 100.0, 0.3), 38.0);
/// ```
pub fn q_binom(p: f64, n: f64, pr: f64) -> f64 {
    if p.is_nan() || n.is_nan() || pr.is_nan() {
        return p + n + pr;
    }
    if !n.is_finite() || !pr.is_finite() || !p.is_finite() {
        return f64::NAN;
    }
    if n != (n + 0.5).floor() || n < 0.0 || !(0.0..=1.0).contains(&pr) {
        return f64::NAN;
    }
    if !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if p == 0.0 || pr == 0.0 || n == 0.0 {
        return 0.0;
    }
    if p == 1.0 {
        return n;
    }
    let q = 1.0 - pr;
    if q == 0.0 {
        return n;
    }
    if p + 1.01 * f64::EPSILON >= 1.0 {
        return n;
    }

    let mu = n * pr;
    let sigma = (mu * q).sqrt();
    let gamma = (q - pr) / sigma;
    let seed = (cornish_fisher(p, mu, sigma, gamma) + 0.5).floor().min(n);

    let size = n as u64;
    let search = DiscreteQuantile::new(|y: f64| p_binom(y.max(0.0) as u64, size, pr), n);
    search.find(seed, p, n, n * 0.001)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // (k, n, p, P(X = k), P(X ≤ k), P(X > k))
    const REFERENCE: [(u64, u64, f64, f64, f64, f64); 13] = [
        (7, 10, 0.44, 0.0672843501863436288, 0.97644169090945777664, 0.02355830909054222336),
        (16, 20, 0.79, 0.21687246761097307073, 0.63104918325998621702, 0.36895081674001378298),
        (0, 12, 0.08, 0.36766638765488224181, 0.36766638765488224181, 0.63233361234511775819),
        (5000, 10000, 0.5, 0.0079786461393821537604, 0.50398932306969107688, 0.49601067693030892312),
        (3, 1_000_000, 1e-6, 0.061313209538546202382, 0.981011904437096605, 0.018988095562903394998),
        (17, 25, 0.63, 0.14738720173005045833, 0.76263314892576968475, 0.23736685107423031525),
        (19, 60, 0.25, 0.056107803472769583359, 0.90751572943872159782, 0.09248427056127840218),
        (46, 50, 0.9, 0.18090450087575401545, 0.74970609404669232971, 0.25029390595330767029),
        (155, 160, 0.95, 0.090370365775557261235, 0.90614607004406681614, 0.093853929955933183862),
        (14, 30, 0.63, 0.027837319016634541818, 0.050063101570269749264, 0.94993689842973025074),
        (108, 530, 0.25, 0.0018251240865667410496, 0.0071000751274477792682, 0.99289992487255222073),
        (0, 10, 0.3, 0.0282475249, 0.0282475249, 0.9717524751),
        (1, 400, 0.5, 1.5490367659397273091e-118, 1.5529093578545766274e-118, 1.0),
    ];

    #[test]
    fn test_reference_values() {
        for &(k, n, p, d, lower, upper) in &REFERENCE {
            assert_relative_eq!(d_binom(k, n, p), d, max_relative = 1e-12);
            assert_relative_eq!(p_binom(k, n, p), lower, max_relative = 1e-12);
            assert_relative_eq!(p_binom_upper(k, n, p), upper, max_relative = 1e-11);
        }
    }

    #[test]
    fn test_saddle_point_matches_log_choose() {
        for &(k, n, p) in &[(3_u64, 9_u64, 0.2_f64), (40, 100, 0.37), (250, 300, 0.9)] {
            let direct = log_choose(n, k) + k as f64 * p.ln() + (n - k) as f64 * (-p).ln_1p();
            assert_relative_eq!(ln_d_binom(k, n, p), direct, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_edge_cases() {
        assert_eq!(d_binom(0, 7, 0.0), 1.0);
        assert_eq!(d_binom(1, 7, 0.0), 0.0);
        assert_eq!(d_binom(7, 7, 1.0), 1.0);
        assert_eq!(d_binom(6, 7, 1.0), 0.0);
        assert_eq!(d_binom(8, 7, 0.5), 0.0);
        assert_eq!(d_binom(0, 0, 0.5), 1.0);
        assert_relative_eq!(d_binom(12, 12, 0.08), 6.8719476736e-14, max_relative = 1e-13);
        assert!(d_binom(1, 7, 1.5).is_nan());
        assert!(d_binom(1, 7, f64::NAN).is_nan());

        assert_eq!(p_binom(3, 7, 0.0), 1.0);
        assert_eq!(p_binom(3, 7, 1.0), 0.0);
        assert_eq!(p_binom(7, 7, 1.0), 1.0);
        assert_eq!(p_binom(9, 7, 0.4), 1.0);
        assert_eq!(p_binom_upper(9, 7, 0.4), 0.0);
        assert!(p_binom(1, 7, -0.1).is_nan());
        assert!(p_binom_upper(1, 7, -0.1).is_nan());
    }

    #[test]
    fn test_zero_count_is_included() {
        assert_eq!(p_binom(0, 10, 0.3), d_binom(0, 10, 0.3));
    }

    #[test]
    fn test_far_upper_tail_by_symmetry() {
        assert_relative_eq!(p_binom_upper(390, 400, 0.5), p_binom(9, 400, 0.5), max_relative = 1e-12);
    }

    #[test]
    fn test_mass_sums_to_one() {
        let total: f64 = (0..=40).map(|k| d_binom(k, 40, 0.23)).sum();
        assert!((total - 1.0).abs() < 1e-14, "sum = {total}");
    }

    #[test]
    fn test_quantiles() {
        assert_eq!(q_binom(0.5, 10.0, 0.44), 4.0);
        assert_eq!(q_binom(0.95, 100.0, 0.3), 38.0);
        assert_eq!(q_binom(0.01, 1000.0, 0.5), 463.0);
        assert_eq!(q_binom(0.999, 20.0, 0.05), 5.0);
        assert_eq!(q_binom(0.2, 5.0, 0.9), 4.0);
    }

    #[test]
    fn test_quantile_edges() {
        assert_eq!(q_binom(0.0, 10.0, 0.5), 0.0);
        assert_eq!(q_binom(1.0, 10.0, 0.5), 10.0);
        assert_eq!(q_binom(0.5, 10.0, 0.0), 0.0);
        assert_eq!(q_binom(0.5, 10.0, 1.0), 10.0);
        assert_eq!(q_binom(0.5, 0.0, 0.5), 0.0);
        assert!(q_binom(0.5, 10.5, 0.5).is_nan());
        assert!(q_binom(0.5, -3.0, 0.5).is_nan());
        assert!(q_binom(0.5, 10.0, 1.2).is_nan());
        assert!(q_binom(1.2, 10.0, 0.5).is_nan());
        assert!(q_binom(0.5, f64::INFINITY, 0.5).is_nan());
    }

    #[test]
    fn test_quantile_large_n_uses_coarse_search() {
        let n = 1e7_f64;
        for &p in &[0.001_f64, 0.5, 0.97] {
            let y = q_binom(p, n, 0.3);
            assert!(p_binom(y as u64, n as u64, 0.3) >= p * (1.0 - 64.0 * f64::EPSILON));
            assert!(p_binom(y as u64 - 1, n as u64, 0.3) < p);
        }
    }

    #[test]
    fn test_quantile_with_mass_piled_near_n() {
        // coarse steps overshoot n here; the answer sits a few counts below it
        let n = 100_000_u64;
        assert_eq!(q_binom(0.135, n as f64, 0.99995), 99_993.0);
        for &pr in &[0.9995_f64, 0.99995, 0.99999] {
            for i in 0_u32..100 {
                let p = 0.005 + 0.01 * f64::from(i);
                let target = p * (1.0 - 64.0 * f64::EPSILON);
                let mut y = n;
                while y > 0 && p_binom(y - 1, n, pr) >= target {
                    y -= 1;
                }
                assert_eq!(q_binom(p, n as f64, pr), y as f64, "p = {p}, pr = {pr}");
            }
        }
    }
}
