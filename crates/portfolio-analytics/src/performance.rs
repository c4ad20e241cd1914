//! Time-weighted and money-weighted return calculations.
//!
//! Cash flows use the investor-perspective sign convention throughout:
//! deposits negative, withdrawals positive. TWR negates them back to the
//! portfolio's point of view when stripping flow effects out of daily
//! returns.

use chrono::NaiveDate;
use folio_core::{CashFlow, ValuationPoint};
use std::collections::{BTreeMap, HashMap};

const NEWTON_GUESS: f64 = 0.10;
const NEWTON_MAX_ITERATIONS: usize = 50;
const NEWTON_TOLERANCE: f64 = 1e-7;
const RATE_FLOOR: f64 = -0.95;
const RATE_CEIL: f64 = 10.0;
const BISECTION_WIDE_CEIL: f64 = 50.0;
const BISECTION_MAX_ITERATIONS: usize = 80;
const BISECTION_BRACKET_TOLERANCE: f64 = 1e-7;
const BISECTION_VALUE_TOLERANCE: f64 = 1e-10;

/// Cumulative time-weighted return over a daily valuation series, as a
/// fraction. Each day's return is computed net of that day's external cash
/// flow, then geometrically chained. None with fewer than 2 usable points.
pub fn time_weighted_return(series: &[ValuationPoint], flows: &[CashFlow]) -> Option<f64> {
    if series.len() < 2 {
        return None;
    }

    let mut flow_by_date: HashMap<NaiveDate, f64> = HashMap::new();
    for flow in flows {
        *flow_by_date.entry(flow.date).or_insert(0.0) += flow.amount;
    }

    let mut growth = 1.0;
    let mut usable = 0usize;
    for pair in series.windows(2) {
        let prev = pair[0].total_value;
        if prev <= 0.0 {
            continue;
        }
        // A deposit (negative investor flow) is money added to the
        // portfolio on that day, not market performance.
        let into_portfolio = -flow_by_date.get(&pair[1].date).copied().unwrap_or(0.0);
        let daily = (pair[1].total_value - into_portfolio) / prev - 1.0;
        growth *= 1.0 + daily;
        usable += 1;
    }

    if usable == 0 {
        None
    } else {
        Some(growth - 1.0)
    }
}

/// Append the synthetic liquidation flow ("what if I sold everything at the
/// end date") used to feed XIRR.
pub fn with_terminal_value(
    flows: &[CashFlow],
    end_date: NaiveDate,
    terminal_value: f64,
) -> Vec<CashFlow> {
    let mut out = flows.to_vec();
    out.push(CashFlow {
        date: end_date,
        amount: terminal_value,
    });
    out
}

/// Annualized money-weighted return (XIRR) of dated cash flows, as a
/// fraction. Newton's method first, bisection as the robust fallback; both
/// failing is a single "no solution" None.
///
/// Same-date flows are summed before solving — duplicate dates destabilize
/// the derivative. Requires at least one inflow and one outflow.
pub fn xirr(flows: &[CashFlow]) -> Option<f64> {
    let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for flow in flows {
        *by_date.entry(flow.date).or_insert(0.0) += flow.amount;
    }
    let merged: Vec<(NaiveDate, f64)> = by_date.into_iter().collect();
    if merged.len() < 2 {
        return None;
    }
    if !merged.iter().any(|(_, a)| *a < 0.0) || !merged.iter().any(|(_, a)| *a > 0.0) {
        // Deposit-only or withdrawal-only series has no internal rate.
        return None;
    }

    let first = merged[0].0;
    let timed: Vec<(f64, f64)> = merged
        .iter()
        .map(|(date, amount)| (((*date - first).num_days() as f64) / 365.0, *amount))
        .collect();

    newton(&timed).or_else(|| {
        tracing::debug!("xirr newton did not converge, falling back to bisection");
        bisection(&timed)
    })
}

fn npv(flows: &[(f64, f64)], rate: f64) -> f64 {
    flows
        .iter()
        .map(|(years, amount)| amount / (1.0 + rate).powf(*years))
        .sum()
}

fn npv_derivative(flows: &[(f64, f64)], rate: f64) -> f64 {
    flows
        .iter()
        .map(|(years, amount)| {
            let discount = (1.0 + rate).powf(*years);
            -years * amount / (discount * (1.0 + rate))
        })
        .sum()
}

fn newton(flows: &[(f64, f64)]) -> Option<f64> {
    let mut rate = NEWTON_GUESS;
    for _ in 0..NEWTON_MAX_ITERATIONS {
        let value = npv(flows, rate);
        let slope = npv_derivative(flows, rate);
        if slope == 0.0 || !value.is_finite() || !slope.is_finite() {
            return None;
        }
        let next = (rate - value / slope).clamp(RATE_FLOOR, RATE_CEIL);
        if (next - rate).abs() < NEWTON_TOLERANCE {
            return Some(next);
        }
        rate = next;
    }
    None
}

fn bisection(flows: &[(f64, f64)]) -> Option<f64> {
    let mut lo = RATE_FLOOR;
    let mut hi = RATE_CEIL;
    let mut f_lo = npv(flows, lo);

    if f_lo * npv(flows, hi) > 0.0 {
        // Widen before giving up.
        hi = BISECTION_WIDE_CEIL;
        if f_lo * npv(flows, hi) > 0.0 {
            return None;
        }
    }

    for _ in 0..BISECTION_MAX_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        let f_mid = npv(flows, mid);
        if f_mid.abs() < BISECTION_VALUE_TOLERANCE || (hi - lo) < BISECTION_BRACKET_TOLERANCE {
            return Some(mid);
        }
        if f_lo * f_mid <= 0.0 {
            hi = mid;
        } else {
            lo = mid;
            f_lo = f_mid;
        }
    }
    None
}
