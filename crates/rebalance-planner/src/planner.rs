//! Invest-only rebalance planning: allocate new money toward target
//! weights without ever recommending a sell.

use crate::targets::TargetWeights;
use folio_core::valuation;
use folio_core::Position;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

const UNALLOCATED_WARN_DOLLARS: f64 = 0.01;

/// One instrument's line in the plan.
#[derive(Debug, Clone, Serialize)]
pub struct PlanRow {
    pub ticker: String,
    pub current_value: f64,
    pub current_weight_pct: f64,
    pub target_weight_pct: f64,
    pub buy_dollars: f64,
    /// None when no price could be resolved for the instrument.
    pub buy_shares: Option<f64>,
    pub post_value: f64,
    pub post_weight_pct: f64,
    /// Target minus post-trade weight, in points. Positive means the
    /// instrument is still underweight after spending the budget.
    pub gap_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RebalancePlan {
    pub new_money: f64,
    pub total_before: f64,
    pub total_after: f64,
    pub allocated: f64,
    pub unallocated: f64,
    pub rows: Vec<PlanRow>,
    pub warnings: Vec<String>,
}

/// Compute a buy-only allocation of `new_money` toward `targets`.
///
/// Desired post-value per ticker is target weight times (current total +
/// new money); each positive shortfall is a raw buy, and raw buys are
/// scaled down uniformly when they exceed the budget. The sum of buy
/// dollars never exceeds `new_money`.
pub fn plan(positions: &[Position], targets: &TargetWeights, new_money: f64) -> RebalancePlan {
    let mut warnings = Vec::new();
    if positions.is_empty() {
        warnings.push("no positions to rebalance".to_string());
    }
    if new_money <= 0.0 {
        warnings.push("new money amount is not positive".to_string());
    }
    if targets.is_empty() {
        warnings.push("target weights sum to zero; enter targets first".to_string());
    }

    let mut value_by_ticker: BTreeMap<String, f64> = BTreeMap::new();
    for position in positions {
        *value_by_ticker.entry(position.ticker.clone()).or_insert(0.0) +=
            valuation::value_for_position(position);
    }
    // Targets for instruments not currently held still get a row.
    for ticker in targets.tickers() {
        value_by_ticker.entry(ticker.to_string()).or_insert(0.0);
    }

    let total_before: f64 = value_by_ticker.values().sum();
    if total_before <= 0.0 && !positions.is_empty() {
        warnings.push("portfolio total value is zero".to_string());
    }

    let budget = new_money.max(0.0);
    let post_total = total_before + budget;

    let raw_buys: HashMap<&str, f64> = value_by_ticker
        .iter()
        .map(|(ticker, current)| {
            let desired = targets.weight(ticker) * post_total;
            (ticker.as_str(), (desired - current).max(0.0))
        })
        .collect();
    let raw_sum: f64 = raw_buys.values().sum();

    let scale = if raw_sum <= 0.0 {
        0.0
    } else if raw_sum > budget {
        budget / raw_sum
    } else {
        1.0
    };

    let allocated: f64 = raw_buys.values().map(|b| b * scale).sum();
    let unallocated = budget - allocated;
    if unallocated > UNALLOCATED_WARN_DOLLARS {
        warnings.push(format!(
            "${:.2} of new money left unallocated (invest-only plan cannot sell overweight positions)",
            unallocated
        ));
    }

    let total_after = total_before + allocated;
    let prices = resolve_prices(positions);

    let rows: Vec<PlanRow> = value_by_ticker
        .iter()
        .map(|(ticker, current)| {
            let buy_dollars = raw_buys[ticker.as_str()] * scale;
            let post_value = current + buy_dollars;
            let target_weight_pct = targets.weight(ticker) * 100.0;
            let post_weight_pct = if total_after > 0.0 {
                post_value / total_after * 100.0
            } else {
                0.0
            };
            PlanRow {
                ticker: ticker.clone(),
                current_value: *current,
                current_weight_pct: if total_before > 0.0 {
                    current / total_before * 100.0
                } else {
                    0.0
                },
                target_weight_pct,
                buy_dollars,
                buy_shares: prices
                    .get(ticker.as_str())
                    .map(|price| buy_dollars / price),
                post_value,
                post_weight_pct,
                gap_pct: target_weight_pct - post_weight_pct,
            }
        })
        .collect();

    tracing::debug!(
        total_before,
        allocated,
        unallocated,
        rows = rows.len(),
        "rebalance plan computed"
    );

    RebalancePlan {
        new_money,
        total_before,
        total_after,
        allocated,
        unallocated,
        rows,
        warnings,
    }
}

/// Per-ticker price for share-count conversion: current price, then cost
/// basis, then $1 for cash-like instruments. Unresolvable prices yield no
/// entry (null share counts downstream).
fn resolve_prices(positions: &[Position]) -> HashMap<&str, f64> {
    let mut prices: HashMap<&str, f64> = HashMap::new();
    for position in positions {
        if prices.contains_key(position.ticker.as_str()) {
            continue;
        }
        let current = position
            .current_price
            .and_then(|p| p.to_f64())
            .filter(|p| p.is_finite() && *p > 0.0);
        let cost = position
            .cost_basis
            .to_f64()
            .filter(|c| c.is_finite() && *c > 0.0);
        let price = current.or(cost).or_else(|| {
            position.asset_class.is_cash_like().then_some(1.0)
        });
        if let Some(price) = price {
            prices.insert(position.ticker.as_str(), price);
        }
    }
    prices
}
