//! Daily portfolio valuation series built from historical closes.

use chrono::{Duration, NaiveDate};
use folio_core::valuation;
use folio_core::{Position, ValuationPoint};
use rust_decimal::prelude::ToPrimitive;
use std::collections::HashMap;

/// Build a daily valuation series from `start` to `end` inclusive.
///
/// Each position contributes its last known close on or before the day,
/// forward-filled across gaps, times its quantity. Cash-like positions hold
/// their balance flat. Positions with no history at all are carried flat at
/// their current value so a missing symbol degrades the series instead of
/// zeroing it. Positions do not contribute before their purchase date.
pub fn build_valuation_series(
    positions: &[Position],
    history: &HashMap<String, Vec<(NaiveDate, f64)>>,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<ValuationPoint> {
    if start > end {
        return Vec::new();
    }

    // Closes sorted by date once so each day is a binary search.
    let mut sorted: HashMap<&str, Vec<(NaiveDate, f64)>> = HashMap::new();
    for (ticker, closes) in history {
        let mut closes = closes.clone();
        closes.sort_by_key(|(date, _)| *date);
        sorted.insert(ticker.as_str(), closes);
    }

    let mut series = Vec::new();
    let mut day = start;
    while day <= end {
        let mut total = 0.0;
        let mut by_ticker: HashMap<String, f64> = HashMap::new();

        for position in positions {
            if matches!(position.purchase_date, Some(p) if day < p) {
                continue;
            }
            let value = position_value_on(position, &sorted, day);
            if value > 0.0 {
                total += value;
                *by_ticker.entry(position.ticker.clone()).or_insert(0.0) += value;
            }
        }

        series.push(ValuationPoint {
            date: day,
            total_value: total,
            by_ticker: Some(by_ticker),
        });
        day += Duration::days(1);
    }
    series
}

fn position_value_on(
    position: &Position,
    sorted: &HashMap<&str, Vec<(NaiveDate, f64)>>,
    day: NaiveDate,
) -> f64 {
    if position.asset_class.is_cash_like() {
        return valuation::value_for_position(position);
    }

    if let Some(closes) = sorted.get(position.ticker.as_str()) {
        let idx = closes.partition_point(|(date, _)| *date <= day);
        if idx > 0 {
            let close = closes[idx - 1].1;
            if close.is_finite() && close > 0.0 {
                let quantity = position.quantity.to_f64().unwrap_or(0.0);
                return close * quantity;
            }
        }
        // Before the first close, fall through to the flat current value.
    }
    valuation::value_for_position(position)
}
