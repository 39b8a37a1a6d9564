//! Chi-square distribution with `df` degrees of freedom, as Gamma(df/2, 2).

use crate::gamma::{d_gamma, ln_d_gamma, pgamma, q_gamma};

/// Density of χ²(df) at `x`.
///
/// # Examples
/// ```
/// use u_probdist::chisq::d_chisq;
/// // χ²(2) is exponential with mean 2
/// assert!((d_chisq(1.0, 2.0) - 0.5 * (-0.5_f64).exp()).abs() < 1e-15);
/// ```
pub fn d_chisq(x: f64, df: f64) -> f64 {
    d_gamma(x, 0.5 * df, 2.0)
}

/// Log-density of χ²(df) at `x`.
pub fn ln_d_chisq(x: f64, df: f64) -> f64 {
    ln_d_gamma(x, 0.5 * df, 2.0)
}

/// `P(X ≤ x)` for `X ~ χ²(df)`. NaN for `df < 0`; `df = 0` is a point mass
/// at zero.
///
/// # Examples
/// ```
/// use u_probdist::chisq::p_chisq;
/// assert!((p_chisq(3.841458820694124, 1.0) - 0.95).abs() < 1e-12);
/// ```
pub fn p_chisq(x: f64, df: f64) -> f64 {
    pgamma(x, 0.5 * df, 2.0, true, false)
}

/// `P(X > x)` for `X ~ χ²(df)`: the p-value of an observed statistic `x`.
pub fn p_chisq_upper(x: f64, df: f64) -> f64 {
    pgamma(x, 0.5 * df, 2.0, false, false)
}

/// Quantile of χ²(df) at lower-tail probability `p`.
///
/// # Examples
/// ```
/// use u_probdist::chisq::q_chisq;
/// assert!((q_chisq(0.98, 4.0) - 11.667843403834779).abs() < 1e-9);
/// ```
pub fn q_chisq(p: f64, df: f64) -> f64 {
    q_gamma(p, 0.5 * df, 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_q_chisq_table() {
        let cases = [
            (0.98_f64, 4.0_f64, 11.667843403834779121_f64),
            (0.95, 1.0, 3.8414588206941244691),
            (0.95, 10.0, 18.307038053275144003),
            (0.05, 30.0, 18.49266098195346801),
            (0.99, 200.0, 249.44512298144160731),
        ];
        for &(p, df, q) in &cases {
            assert_relative_eq!(q_chisq(p, df), q, max_relative = 1e-10);
        }
    }

    #[test]
    fn test_p_chisq_table() {
        let cases = [
            (3.84_f64, 1.0_f64, 0.94995647875129489681_f64, 0.02984688748306055812_f64),
            (11.668, 4.0, 0.98000133677289903542, 0.0085361575407453194522),
            (18.307, 10.0, 0.94999941090860187971, 0.015480784533096717523),
        ];
        for &(x, df, p, d) in &cases {
            assert_relative_eq!(p_chisq(x, df), p, max_relative = 1e-13);
            assert_relative_eq!(p_chisq_upper(x, df), 1.0 - p, max_relative = 1e-11);
            assert_relative_eq!(d_chisq(x, df), d, max_relative = 1e-13);
            assert_relative_eq!(ln_d_chisq(x, df), d.ln(), max_relative = 1e-13);
        }
    }

    #[test]
    fn test_round_trip_across_df() {
        for &df in &[1.0_f64, 5.0, 30.0, 200.0] {
            for &p in &[0.001_f64, 0.05, 0.5, 0.95, 0.999] {
                let x = q_chisq(p, df);
                assert_relative_eq!(p_chisq(x, df), p, max_relative = 1e-9);
            }
        }
    }

    #[test]
    fn test_degenerate_df() {
        assert!(p_chisq(1.0, -1.0).is_nan());
        assert!(q_chisq(0.5, -1.0).is_nan());
        assert_eq!(p_chisq(1.0, 0.0), 1.0);
        assert_eq!(q_chisq(0.5, 0.0), 0.0);
        assert_eq!(p_chisq(-1.0, 3.0), 0.0);
        assert_eq!(p_chisq_upper(-1.0, 3.0), 1.0);
    }
}
