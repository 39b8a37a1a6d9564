//! Discrete quantile search shared by the binomial and Poisson quantiles.
//!
//! Both start from a Cornish–Fisher seed and walk the integer support until
//! the CDF crosses the target probability. Large supports walk with coarse
//! steps first and refine by factors of 100.

use tracing::trace;

use crate::normal::q_norm;

/// Support size from which the search starts with coarse steps.
pub(crate) const LARGE_SEARCH: f64 = 1e5;

/// Shrinks the target so a CDF value equal to `p` up to rounding still
/// counts as reaching it.
const LEFT_FUZZ: f64 = 1.0 - 64.0 * f64::EPSILON;

/// Skewness-corrected normal approximation `μ + σ(z + γ(z² − 1)/6)` of the
/// `p`-quantile.
pub(crate) fn cornish_fisher(p: f64, mu: f64, sigma: f64, gamma: f64) -> f64 {
    let z = q_norm(p, 0.0, 1.0);
    mu + sigma * (z + gamma * (z * z - 1.0) / 6.0)
}

/// Smallest point of an integer support `{0, 1, …, upper}` where a CDF
/// reaches a target probability.
pub(crate) struct DiscreteQuantile<F> {
    cdf: F,
    upper: f64,
}

impl<F: Fn(f64) -> f64> DiscreteQuantile<F> {
    /// `upper` is the largest support point, `f64::INFINITY` if unbounded.
    pub(crate) fn new(cdf: F, upper: f64) -> Self {
        Self { cdf, upper }
    }

    /// Searches from `seed` for the smallest `y` with `cdf(y) ≥ p`.
    ///
    /// `size` is the scale of the support (`n` or `λ`); below
    /// [`LARGE_SEARCH`] the walk uses unit steps, otherwise it starts at
    /// `floor(coarse)` and divides the step by 100 after each pass.
    pub(crate) fn find(&self, seed: f64, p: f64, size: f64, coarse: f64) -> f64 {
        let p = p * LEFT_FUZZ;
        let mut y = seed.clamp(0.0, self.upper);
        let mut z = (self.cdf)(y);

        if size < LARGE_SEARCH {
            return self.walk(y, &mut z, p, 1.0);
        }

        let mut incr = coarse.floor().max(1.0);
        loop {
            let old_incr = incr;
            y = self.walk(y, &mut z, p, incr);
            incr = (incr / 100.0).floor().max(1.0);
            trace!(y, step = old_incr, next_step = incr, "discrete search pass");
            if !(old_incr > 1.0 && incr > size * 1e-15) {
                break;
            }
        }
        y
    }

    /// One pass with a fixed step: left while the CDF one step back still
    /// reaches `p`, otherwise right until it does.
    fn walk(&self, mut y: f64, z: &mut f64, p: f64, incr: f64) -> f64 {
        if *z >= p {
            loop {
                if y == 0.0 {
                    return y;
                }
                let prev = (self.cdf)(y - incr);
                if prev < p {
                    return y;
                }
                y = (y - incr).max(0.0);
                *z = prev;
            }
        } else {
            loop {
                y = (y + incr).min(self.upper);
                if y == self.upper {
                    // the whole support lies at or below `upper`; a finer
                    // pass must walk back left from here
                    *z = 1.0;
                    return y;
                }
                *z = (self.cdf)(y);
                if *z >= p {
                    return y;
                }
                if z.is_nan() {
                    return f64::NAN;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_cdf(m: f64) -> impl Fn(f64) -> f64 {
        move |y: f64| {
            if y < 0.0 {
                0.0
            } else {
                ((y.floor() + 1.0) / m).min(1.0)
            }
        }
    }

    #[test]
    fn test_unit_steps_from_either_side() {
        let search = DiscreteQuantile::new(uniform_cdf(10.0), 9.0);
        // smallest y with (y + 1)/10 >= 0.35 is 3
        assert_eq!(search.find(0.0, 0.35, 10.0, 0.0), 3.0);
        assert_eq!(search.find(9.0, 0.35, 10.0, 0.0), 3.0);
        assert_eq!(search.find(3.0, 0.35, 10.0, 0.0), 3.0);
    }

    #[test]
    fn test_exact_cdf_value_is_left_continuous() {
        let search = DiscreteQuantile::new(uniform_cdf(10.0), 9.0);
        // cdf(3) = 0.4 exactly: 3 is the answer, not 4
        assert_eq!(search.find(7.0, 0.4, 10.0, 0.0), 3.0);
    }

    #[test]
    fn test_walk_stops_at_support_bounds() {
        let search = DiscreteQuantile::new(uniform_cdf(10.0), 9.0);
        assert_eq!(search.find(5.0, 1e-9, 10.0, 0.0), 0.0);
        assert_eq!(search.find(2.0, 0.999, 10.0, 0.0), 9.0);
        // seeds outside the support are clamped
        assert_eq!(search.find(-4.0, 0.35, 10.0, 0.0), 3.0);
        assert_eq!(search.find(40.0, 0.35, 10.0, 0.0), 3.0);
    }

    #[test]
    fn test_coarse_to_fine_on_large_support() {
        let m = 1e6_f64;
        let search = DiscreteQuantile::new(uniform_cdf(m), m - 1.0);
        for &seed in &[0.0_f64, 400_000.0, 999_999.0] {
            assert_eq!(search.find(seed, 0.123456, m, m * 0.001), 123_455.0);
        }
    }

    #[test]
    fn test_coarse_step_past_upper_walks_back() {
        let m = 1e6_f64;
        let search = DiscreteQuantile::new(uniform_cdf(m), m - 1.0);
        // smallest y with (y + 1)/m >= 0.999995 is 999_994, just below the
        // last support point the 1000-wide steps land on
        for &seed in &[0.0_f64, 500_000.0, 999_990.0] {
            assert_eq!(search.find(seed, 0.999995, m, m * 0.001), 999_994.0);
        }
    }

    #[test]
    fn test_cornish_fisher_symmetric_case() {
        // no skew: plain normal quantile
        let y = cornish_fisher(0.975, 10.0, 2.0, 0.0);
        assert!((y - (10.0 + 2.0 * 1.959963984540054)).abs() < 1e-12);
        assert_eq!(cornish_fisher(0.5, 3.0, 1.0, 0.0), 3.0);
    }
}
