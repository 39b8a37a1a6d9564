//! Descriptive statistics for a sample of observations.
//!
//! Every function returns `None` instead of a meaningless number: empty
//! input, any NaN/Inf in the data, or too few observations for the
//! statistic asked for.
//!
//! # Algorithms
//!
//! - **Mean**: Neumaier compensated summation, O(ε) error independent of n.
//! - **Variance/StdDev**: Welford's single-pass update.
//!   Reference: Welford (1962), "Note on a Method for Calculating
//!   Corrected Sums of Squares and Products", *Technometrics* 4(3).
//! - **Median/Mode**: sort a copy with [`f64::total_cmp`].

/// Arithmetic mean.
///
/// # Returns
/// - `None` if `data` is empty or contains any NaN/Inf.
///
/// # Examples
/// ```
/// use u_probdist::stats::mean;
/// let v = [3.0, 1.0, 5.0, 6.0, 3.0, 4.5];
/// assert!((mean(&v).unwrap() - 3.75).abs() < 1e-15);
/// ```
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() || !all_finite(data) {
        return None;
    }
    Some(kahan_sum(data) / data.len() as f64)
}

/// Median: the middle order statistic, or the average of the two middle
/// values when `data.len()` is even.
///
/// # Returns
/// - `None` if `data` is empty or contains any NaN/Inf.
///
/// # Examples
/// ```
/// use u_probdist::stats::median;
/// assert_eq!(median(&[5.0, 1.0, 3.0]), Some(3.0));
/// assert_eq!(median(&[3.0, 1.0, 5.0, 6.0, 3.0, 4.5]), Some(3.75));
/// ```
pub fn median(data: &[f64]) -> Option<f64> {
    let sorted = sorted_copy(data)?;
    let n = sorted.len();
    let mid = n / 2;
    if n % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some(0.5 * (sorted[mid - 1] + sorted[mid]))
    }
}

/// Most frequent value. Ties go to the smallest of the tied values, so a
/// sample with all values distinct returns its minimum.
///
/// Values are compared exactly; `-0.0` and `0.0` are distinct.
///
/// # Examples
/// ```
/// use u_probdist::stats::mode;
/// assert_eq!(mode(&[3.0, 1.0, 5.0, 6.0, 3.0, 4.5]), Some(3.0));
/// assert_eq!(mode(&[2.0, 7.0, 7.0, 2.0]), Some(2.0));
/// ```
pub fn mode(data: &[f64]) -> Option<f64> {
    let sorted = sorted_copy(data)?;
    let mut best = sorted[0];
    let mut best_count = 0usize;
    for run in sorted.chunk_by(|a, b| a.total_cmp(b).is_eq()) {
        // strictly greater keeps the earliest (smallest) value on ties
        if run.len() > best_count {
            best = run[0];
            best_count = run.len();
        }
    }
    Some(best)
}

/// Sample variance with Bessel's correction (denominator `n − 1`).
///
/// Welford's update avoids the cancellation of `E[X²] − (E[X])²`.
///
/// # Returns
/// - `None` if `data.len() < 2` or contains NaN/Inf.
///
/// # Examples
/// ```
/// use u_probdist::stats::variance;
/// let v = [3.0, 1.0, 5.0, 6.0, 3.0, 4.5];
/// assert!((variance(&v).unwrap() - 3.175).abs() < 1e-12);
/// ```
pub fn variance(data: &[f64]) -> Option<f64> {
    if data.len() < 2 || !all_finite(data) {
        return None;
    }
    let m = Moments::from_slice(data);
    Some(m.m2 / (m.count - 1.0))
}

/// Population variance (denominator `n`).
///
/// # Returns
/// - `None` if `data` is empty or contains NaN/Inf.
pub fn population_variance(data: &[f64]) -> Option<f64> {
    if data.is_empty() || !all_finite(data) {
        return None;
    }
    let m = Moments::from_slice(data);
    Some(m.m2 / m.count)
}

/// Sample standard deviation, `sqrt(variance(data))`.
pub fn std_dev(data: &[f64]) -> Option<f64> {
    variance(data).map(f64::sqrt)
}

/// Population standard deviation, `sqrt(population_variance(data))`.
pub fn population_std_dev(data: &[f64]) -> Option<f64> {
    population_variance(data).map(f64::sqrt)
}

/// Standard score of `x` relative to `data`: `(x − x̄) / s` with the sample
/// standard deviation `s`.
///
/// # Returns
/// - `None` if `x` is not finite, `data.len() < 2`, the data contain
///   NaN/Inf, or all observations are equal.
///
/// # Examples
/// ```
/// use u_probdist::stats::z_score;
/// let v = [2.0, 4.0, 6.0];
/// assert!((z_score(6.0, &v).unwrap() - 1.0).abs() < 1e-15);
/// ```
pub fn z_score(x: f64, data: &[f64]) -> Option<f64> {
    if !x.is_finite() {
        return None;
    }
    let sd = std_dev(data)?;
    if sd == 0.0 {
        return None;
    }
    let m = mean(data)?;
    Some((x - m) / sd)
}

/// Sample covariance `Σ(xᵢ − x̄)(yᵢ − ȳ) / (n − 1)`.
///
/// # Returns
/// - `None` if `x.len() != y.len()`, `n < 2`, or data contains NaN/Inf.
///
/// # Examples
/// ```
/// use u_probdist::stats::covariance;
/// let x = [1.0, 2.0, 3.0, 4.0, 5.0];
/// let y = [2.0, 4.0, 6.0, 8.0, 10.0];
/// assert!((covariance(&x, &y).unwrap() - 5.0).abs() < 1e-14);
/// ```
pub fn covariance(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len();
    if n != y.len() || n < 2 || !all_finite(x) || !all_finite(y) {
        return None;
    }
    let nf = n as f64;
    let mean_x = kahan_sum(x) / nf;
    let mean_y = kahan_sum(y) / nf;
    let products: Vec<f64> = x
        .iter()
        .zip(y)
        .map(|(&a, &b)| (a - mean_x) * (b - mean_y))
        .collect();
    Some(kahan_sum(&products) / (nf - 1.0))
}

/// Neumaier compensated summation.
///
/// Improves on Kahan's by also recovering the low-order bits when the
/// addend is larger in magnitude than the running sum.
///
/// Reference: Neumaier (1974), "Rundungsfehleranalyse einiger Verfahren
/// zur Summation endlicher Summen", *ZAMM* 54(1), pp. 39–51.
pub fn kahan_sum(data: &[f64]) -> f64 {
    let mut sum = 0.0_f64;
    let mut c = 0.0_f64;
    for &x in data {
        let t = sum + x;
        if sum.abs() >= x.abs() {
            c += (sum - t) + x;
        } else {
            c += (x - t) + sum;
        }
        sum = t;
    }
    sum + c
}

fn all_finite(data: &[f64]) -> bool {
    data.iter().all(|x| x.is_finite())
}

fn sorted_copy(data: &[f64]) -> Option<Vec<f64>> {
    if data.is_empty() || !all_finite(data) {
        return None;
    }
    let mut sorted = data.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);
    Some(sorted)
}

/// Running count, mean and sum of squared deviations.
struct Moments {
    count: f64,
    mean: f64,
    m2: f64,
}

impl Moments {
    fn from_slice(data: &[f64]) -> Self {
        let mut acc = Self {
            count: 0.0,
            mean: 0.0,
            m2: 0.0,
        };
        for &x in data {
            acc.count += 1.0;
            let delta = x - acc.mean;
            acc.mean += delta / acc.count;
            acc.m2 += delta * (x - acc.mean);
        }
        acc
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn finite_vec(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<f64>> {
        proptest::collection::vec(-1e6_f64..1e6, min_len..=max_len)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        #[test]
        fn variance_non_negative(data in finite_vec(2, 100)) {
            let var = variance(&data).unwrap();
            prop_assert!(var >= 0.0, "variance must be >= 0, got {}", var);
        }

        #[test]
        fn std_dev_is_sqrt_of_variance(data in finite_vec(2, 100)) {
            let var = variance(&data).unwrap();
            let sd = std_dev(&data).unwrap();
            prop_assert!((sd * sd - var).abs() < 1e-10 * var.max(1.0));
        }

        #[test]
        fn median_within_range(data in finite_vec(1, 100)) {
            let med = median(&data).unwrap();
            let lo = data.iter().cloned().fold(f64::INFINITY, f64::min);
            let hi = data.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(med >= lo && med <= hi);
        }

        #[test]
        fn mode_is_a_most_frequent_member(
            data in proptest::collection::vec(0_i32..8, 1..60),
        ) {
            let values: Vec<f64> = data.iter().map(|&v| f64::from(v)).collect();
            let m = mode(&values).unwrap();
            let count = |t: f64| values.iter().filter(|&&v| v == t).count();
            let best = count(m);
            for &v in &values {
                let c = count(v);
                prop_assert!(c < best || (c == best && v >= m));
            }
        }

        #[test]
        fn z_scores_have_zero_mean(data in finite_vec(3, 60)) {
            prop_assume!(std_dev(&data).unwrap() > 1.0);
            let zs: Vec<f64> = data.iter().map(|&x| z_score(x, &data).unwrap()).collect();
            let m = mean(&zs).unwrap();
            prop_assert!(m.abs() < 1e-8, "mean z = {}", m);
            let sd = std_dev(&zs).unwrap();
            prop_assert!((sd - 1.0).abs() < 1e-8, "sd z = {}", sd);
        }

        #[test]
        fn mean_linearity(
            data in finite_vec(1, 100),
            a in -100.0_f64..100.0,
            b in -100.0_f64..100.0,
        ) {
            let m = mean(&data).unwrap();
            let transformed: Vec<f64> = data.iter().map(|&x| a * x + b).collect();
            let mt = mean(&transformed).unwrap();
            let expected = a * m + b;
            prop_assert!((mt - expected).abs() < 1e-8 * expected.abs().max(1e3));
        }
    }
}
