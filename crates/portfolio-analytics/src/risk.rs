//! Risk statistics over daily valuation and return series.

use crate::shared_math;
use chrono::NaiveDate;
use folio_core::ValuationPoint;
use serde::Serialize;
use std::collections::HashMap;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const MIN_VOLATILITY_SAMPLES: usize = 10;
pub const MIN_BETA_SAMPLES: usize = 20;

/// Dated daily returns from a valuation series; steps with a non-positive
/// prior value are skipped.
pub fn daily_returns_dated(series: &[ValuationPoint]) -> Vec<(NaiveDate, f64)> {
    series
        .windows(2)
        .filter_map(|pair| {
            if pair[0].total_value > 0.0 {
                Some((
                    pair[1].date,
                    pair[1].total_value / pair[0].total_value - 1.0,
                ))
            } else {
                None
            }
        })
        .collect()
}

/// Annualized volatility: sample stdev of daily returns scaled by sqrt(252).
/// None below 10 samples — too little history to be meaningful.
pub fn annualized_volatility(returns: &[f64]) -> Option<f64> {
    if returns.len() < MIN_VOLATILITY_SAMPLES {
        return None;
    }
    shared_math::sample_std(returns).map(|std| std * TRADING_DAYS_PER_YEAR.sqrt())
}

/// Maximum drawdown of the series as a negative fraction; None with fewer
/// than 2 points.
pub fn max_drawdown(series: &[ValuationPoint]) -> Option<f64> {
    let values: Vec<f64> = series.iter().map(|p| p.total_value).collect();
    shared_math::max_drawdown(&values)
}

/// Beta of portfolio returns against benchmark returns, aligned by exact
/// date (inner join). Returns the beta (None when under `min_samples`
/// aligned points or the benchmark variance is zero) together with the
/// aligned sample count.
pub fn beta_from_returns(
    portfolio: &[(NaiveDate, f64)],
    benchmark: &[(NaiveDate, f64)],
    min_samples: usize,
) -> (Option<f64>, usize) {
    let bench_by_date: HashMap<NaiveDate, f64> = benchmark.iter().copied().collect();

    let mut port_aligned = Vec::new();
    let mut bench_aligned = Vec::new();
    for (date, r) in portfolio {
        if let Some(b) = bench_by_date.get(date) {
            port_aligned.push(*r);
            bench_aligned.push(*b);
        }
    }

    let samples = port_aligned.len();
    if samples < min_samples {
        return (None, samples);
    }

    let covariance = match shared_math::sample_covariance(&port_aligned, &bench_aligned) {
        Some(c) => c,
        None => return (None, samples),
    };
    match shared_math::sample_variance(&bench_aligned) {
        // Beta against a constant benchmark is undefined.
        Some(variance) if variance > 0.0 => (Some(covariance / variance), samples),
        _ => (None, samples),
    }
}

/// Bundle of risk statistics for one portfolio series.
#[derive(Debug, Clone, Serialize)]
pub struct RiskMetrics {
    pub volatility: Option<f64>,
    pub max_drawdown: Option<f64>,
    pub beta: Option<f64>,
    pub beta_samples: usize,
}

impl RiskMetrics {
    /// Compute all statistics; the benchmark series is optional.
    pub fn compute(series: &[ValuationPoint], benchmark: Option<&[(NaiveDate, f64)]>) -> Self {
        let dated = daily_returns_dated(series);
        let returns: Vec<f64> = dated.iter().map(|(_, r)| *r).collect();

        let (beta, beta_samples) = match benchmark {
            Some(bench) => {
                let bench_returns: Vec<(NaiveDate, f64)> = bench
                    .windows(2)
                    .filter_map(|pair| {
                        if pair[0].1 > 0.0 {
                            Some((pair[1].0, pair[1].1 / pair[0].1 - 1.0))
                        } else {
                            None
                        }
                    })
                    .collect();
                beta_from_returns(&dated, &bench_returns, MIN_BETA_SAMPLES)
            }
            None => (None, 0),
        };

        Self {
            volatility: annualized_volatility(&returns),
            max_drawdown: max_drawdown(series),
            beta,
            beta_samples,
        }
    }
}
