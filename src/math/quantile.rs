//! Order statistics over a sample of draws.
//!
//! Quantiles use the linear-interpolation estimator (Hyndman & Fan type 7):
//!
//! ```text
//! h = (n - 1) p
//! q(p) = x[⌊h⌋] + (h - ⌊h⌋) (x[⌈h⌉] - x[⌊h⌋])
//! ```
//!
//! on the ascending-sorted sample `x`. For a fixed sample this is
//! non-decreasing in `p`, and a constant sample returns that constant exactly.

/// Copy the finite values of `draws` and sort them ascending.
pub fn sorted_finite<'a>(draws: impl IntoIterator<Item = &'a f64>) -> Vec<f64> {
    let mut out: Vec<f64> = draws.into_iter().copied().filter(|v| v.is_finite()).collect();
    out.sort_by(f64::total_cmp);
    out
}

/// Type-7 quantile of an ascending-sorted sample.
///
/// Returns `NaN` for an empty sample. `p` is clamped into `[0, 1]`.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n == 1 {
        return sorted[0];
    }

    let h = (n as f64 - 1.0) * p.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = h - lo as f64;

    let a = sorted[lo];
    let b = sorted[hi];
    if frac == 0.0 || a == b {
        return a;
    }
    // Weighted form: `b - a` overflows for huge draws of opposite sign.
    ((1.0 - frac) * a + frac * b).clamp(a, b)
}

/// Arithmetic mean of a sample of finite values.
///
/// A constant sample returns that constant exactly, and the result always
/// lies within `[min, max]`. Returns `NaN` for an empty sample.
pub fn sample_mean(values: &[f64]) -> f64 {
    let Some(&x0) = values.first() else {
        return f64::NAN;
    };
    let (min, max) = values
        .iter()
        .fold((x0, x0), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if min == max {
        return x0;
    }

    let n = values.len() as f64;
    let sum: f64 = values.iter().sum();
    let mean = if sum.is_finite() {
        sum / n
    } else {
        // Partial sums of `v / n` stay within `max |v|`.
        values.iter().map(|v| v / n).sum()
    };
    mean.clamp(min, max)
}

/// Median of an ascending-sorted sample.
pub fn median_sorted(sorted: &[f64]) -> f64 {
    quantile_sorted(sorted, 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantile_matches_linear_interpolation() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!((quantile_sorted(&x, 0.25) - 2.0).abs() < 1e-12);
        assert!((quantile_sorted(&x, 0.75) - 4.0).abs() < 1e-12);
        assert!((quantile_sorted(&x, 0.1) - 1.4).abs() < 1e-12);
        assert_eq!(quantile_sorted(&x, 0.0), 1.0);
        assert_eq!(quantile_sorted(&x, 1.0), 5.0);
    }

    #[test]
    fn quantile_is_monotone_in_level() {
        let x = sorted_finite(&[3.2, -1.0, 7.5, 0.0, 0.0, 2.2, 9.9, -4.1]);
        let mut prev = f64::NEG_INFINITY;
        for i in 1..100 {
            let q = quantile_sorted(&x, i as f64 / 100.0);
            assert!(q >= prev, "q({i}%)={q} < {prev}");
            prev = q;
        }
    }

    #[test]
    fn constant_sample_is_exact() {
        let x = vec![0.1; 7];
        assert_eq!(sample_mean(&x), 0.1);
        assert_eq!(quantile_sorted(&x, 0.37), 0.1);
        assert_eq!(median_sorted(&x), 0.1);
    }

    #[test]
    fn empty_sample_is_nan() {
        assert!(quantile_sorted(&[], 0.5).is_nan());
        assert!(sample_mean(&[]).is_nan());
    }

    #[test]
    fn sorted_finite_drops_nan_and_inf() {
        let x = sorted_finite(&[2.0, f64::NAN, 1.0, f64::INFINITY]);
        assert_eq!(x, vec![1.0, 2.0]);
    }

    #[test]
    fn extreme_draws_stay_ordered_and_finite() {
        let x = sorted_finite(&[-1.5e308, 1.5e308, 1.5e308]);
        let q25 = quantile_sorted(&x, 0.25);
        let q75 = quantile_sorted(&x, 0.75);
        assert!(q25 <= q75, "{q25} > {q75}");
        assert_eq!(q25, 0.0);
        assert_eq!(q75, 1.5e308);

        let mean = sample_mean(&x);
        assert!((mean - 0.5e308).abs() < 1e293);

        // The plain sum overflows here.
        let mean = sample_mean(&[1.5e308, 1.5e308, -1.0]);
        assert!((mean - 1.0e308).abs() < 1e293);
    }

    #[test]
    fn sample_mean_basic() {
        assert!((sample_mean(&[1.0, 2.0, 3.0, 4.0, 5.0]) - 3.0).abs() < 1e-12);
    }
}
