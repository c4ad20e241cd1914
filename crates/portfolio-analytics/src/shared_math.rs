//! Pure mathematical utilities for portfolio analytics.
//! Stateless functions — no I/O, no async, no external dependencies.

/// Compute daily returns from a value series. Steps with a non-positive
/// prior value are skipped rather than emitted as garbage.
pub fn daily_returns(values: &[f64]) -> Vec<f64> {
    if values.len() < 2 {
        return Vec::new();
    }
    values
        .windows(2)
        .filter_map(|w| {
            if w[0] > 0.0 {
                Some((w[1] - w[0]) / w[0])
            } else {
                None
            }
        })
        .collect()
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation with the (n-1) denominator.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() as f64 - 1.0);
    Some(variance.sqrt())
}

/// Sample variance with the (n-1) denominator.
pub fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    Some(values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() as f64 - 1.0))
}

/// Sample covariance of two equal-length series, (n-1) denominator.
pub fn sample_covariance(a: &[f64], b: &[f64]) -> Option<f64> {
    let n = a.len().min(b.len());
    if n < 2 {
        return None;
    }
    let mean_a = mean(&a[..n]);
    let mean_b = mean(&b[..n]);
    let sum: f64 = (0..n).map(|i| (a[i] - mean_a) * (b[i] - mean_b)).sum();
    Some(sum / (n as f64 - 1.0))
}

/// Maximum drawdown of an equity curve as a negative fraction
/// (e.g. -0.15 = a 15% peak-to-trough loss). None for fewer than 2 values.
pub fn max_drawdown(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mut peak = values[0];
    let mut worst = 0.0_f64;
    for &v in values {
        if v > peak {
            peak = v;
        }
        if peak > 0.0 {
            let dd = (v - peak) / peak;
            if dd < worst {
                worst = dd;
            }
        }
    }
    Some(worst)
}

/// Herfindahl index from weights (0-1 scale). Higher = more concentrated.
pub fn herfindahl_index(weights: &[f64]) -> f64 {
    weights.iter().map(|w| w * w).sum()
}
