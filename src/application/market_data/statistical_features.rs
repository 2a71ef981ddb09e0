//! Column-wise statistics over bar series
//!
//! Every helper returns a column aligned with its input: index `i` of the output
//! describes bar `i`. Positions without enough history hold `NaN`, which the
//! missing-value policy resolves later.

use statrs::statistics::{Data, Distribution};

/// `values[i] / values[i - 1] - 1`. Zero denominators give 0.
pub fn pct_change(values: &[f64]) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    for i in 1..values.len() {
        out[i] = if values[i - 1] == 0.0 {
            0.0
        } else {
            values[i] / values[i - 1] - 1.0
        };
    }
    out
}

/// First discrete difference.
pub fn diff(values: &[f64]) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    for i in 1..values.len() {
        out[i] = values[i] - values[i - 1];
    }
    out
}

/// Division where a zero denominator yields 0 and `NaN` propagates.
pub fn safe_div(num: f64, den: f64) -> f64 {
    if num.is_nan() || den.is_nan() {
        f64::NAN
    } else if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

fn rolling<F>(values: &[f64], window: usize, f: F) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    let mut out = vec![f64::NAN; values.len()];
    if window == 0 {
        return out;
    }
    for i in (window - 1)..values.len() {
        let slice = &values[i + 1 - window..=i];
        if slice.iter().all(|v| v.is_finite()) {
            out[i] = f(slice);
        }
    }
    out
}

/// Trailing mean over `window` bars ending at each index (current bar included).
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    rolling(values, window, |w| w.iter().sum::<f64>() / w.len() as f64)
}

/// Trailing mean over up to `window` bars, ignoring missing entries.
pub fn rolling_mean_min_periods(values: &[f64], window: usize, min_periods: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    for i in 0..values.len() {
        let start = (i + 1).saturating_sub(window);
        let present: Vec<f64> = values[start..=i]
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .collect();
        if !present.is_empty() && present.len() >= min_periods {
            out[i] = present.iter().sum::<f64>() / present.len() as f64;
        }
    }
    out
}

/// Trailing sample standard deviation.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    rolling(values, window, |w| {
        Data::new(w.to_vec()).std_dev().unwrap_or(f64::NAN)
    })
}

pub fn rolling_sum(values: &[f64], window: usize) -> Vec<f64> {
    rolling(values, window, |w| w.iter().sum())
}

/// Trailing Pearson correlation. Zero variance on either side gives 0.
pub fn rolling_corr(a: &[f64], b: &[f64], window: usize) -> Vec<f64> {
    let len = a.len().min(b.len());
    let mut out = vec![f64::NAN; len];
    if window < 2 {
        return out;
    }
    for i in (window - 1)..len {
        let xa = &a[i + 1 - window..=i];
        let xb = &b[i + 1 - window..=i];
        if xa.iter().chain(xb).all(|v| v.is_finite()) {
            out[i] = correlation(xa, xb);
        }
    }
    out
}

fn correlation(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len() as f64;
    let mx = x.iter().sum::<f64>() / n;
    let my = y.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (a, b) in x.iter().zip(y) {
        cov += (a - mx) * (b - my);
        vx += (a - mx).powi(2);
        vy += (b - my).powi(2);
    }
    let denom = (vx * vy).sqrt();
    if denom < 1e-12 {
        return 0.0;
    }
    (cov / denom).clamp(-1.0, 1.0)
}

/// Mean and sample standard deviation of a slice, `None` when fewer than 2 values.
pub fn mean_std(values: &[f64]) -> Option<(f64, f64)> {
    if values.len() < 2 {
        return None;
    }
    let data = Data::new(values.to_vec());
    Some((data.mean()?, data.std_dev()?))
}

/// Simple linear regression to find slope
pub fn linear_regression_slope(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.is_empty() {
        return None;
    }

    let n = x.len() as f64;
    let sum_x: f64 = x.iter().sum();
    let sum_y: f64 = y.iter().sum();
    let sum_xy: f64 = x.iter().zip(y.iter()).map(|(xi, yi)| xi * yi).sum();
    let sum_x2: f64 = x.iter().map(|xi| xi * xi).sum();

    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator.abs() < 1e-10 {
        return None;
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    Some(slope)
}

/// Missing-value policy, applied in place and in this order:
/// infinities become missing, then forward-fill, backward-fill, zero-fill.
pub fn fill_missing(column: &mut [f64]) {
    for v in column.iter_mut() {
        if v.is_infinite() {
            *v = f64::NAN;
        }
    }

    let mut last = f64::NAN;
    for v in column.iter_mut() {
        if v.is_nan() {
            *v = last;
        } else {
            last = *v;
        }
    }

    let mut next = f64::NAN;
    for v in column.iter_mut().rev() {
        if v.is_nan() {
            *v = next;
        } else {
            next = *v;
        }
    }

    for v in column.iter_mut() {
        if v.is_nan() {
            *v = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_pct_change() {
        let out = pct_change(&[100.0, 110.0, 99.0]);
        assert!(out[0].is_nan());
        assert!(approx(out[1], 0.10));
        assert!(approx(out[2], -0.10));
    }

    #[test]
    fn test_pct_change_zero_base() {
        let out = pct_change(&[0.0, 50.0]);
        assert_eq!(out[1], 0.0);
    }

    #[test]
    fn test_rolling_mean_window() {
        let out = rolling_mean(&[1.0, 2.0, 3.0, 4.0], 2);
        assert!(out[0].is_nan());
        assert_eq!(&out[1..], &[1.5, 2.5, 3.5]);
    }

    #[test]
    fn test_rolling_mean_skips_window_with_nan() {
        let out = rolling_mean(&[f64::NAN, 2.0, 4.0], 2);
        assert!(out[1].is_nan());
        assert_eq!(out[2], 3.0);
    }

    #[test]
    fn test_rolling_mean_min_periods() {
        let out = rolling_mean_min_periods(&[f64::NAN, 2.0, 4.0], 3, 1);
        assert!(out[0].is_nan());
        assert_eq!(out[1], 2.0);
        assert_eq!(out[2], 3.0);
    }

    #[test]
    fn test_rolling_std_sample() {
        let out = rolling_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], 8);
        // sample std of the classic example
        assert!(approx(out[7], 2.138089935299395));
    }

    #[test]
    fn test_rolling_corr_perfect_and_flat() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [2.0, 4.0, 6.0, 8.0];
        let flat = [5.0; 4];
        assert!(approx(rolling_corr(&a, &b, 4)[3], 1.0));
        assert_eq!(rolling_corr(&a, &flat, 4)[3], 0.0);
    }

    #[test]
    fn test_linear_regression_slope() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [1.0, 3.0, 5.0, 7.0];
        assert!(approx(linear_regression_slope(&x, &y).unwrap(), 2.0));
        assert!(linear_regression_slope(&[1.0, 1.0], &[0.0, 1.0]).is_none());
    }

    #[test]
    fn test_fill_missing_order() {
        let mut col = vec![f64::NAN, 1.0, f64::INFINITY, f64::NAN, 3.0, f64::NEG_INFINITY];
        fill_missing(&mut col);
        assert_eq!(col, vec![1.0, 1.0, 1.0, 1.0, 3.0, 3.0]);

        let mut empty = vec![f64::NAN, f64::INFINITY];
        fill_missing(&mut empty);
        assert_eq!(empty, vec![0.0, 0.0]);
    }

    #[test]
    fn test_safe_div() {
        assert_eq!(safe_div(3.0, 0.0), 0.0);
        assert_eq!(safe_div(3.0, 2.0), 1.5);
        assert!(safe_div(f64::NAN, 2.0).is_nan());
    }
}
