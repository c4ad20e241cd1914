//! Single source of truth for position valuation.
//!
//! Cash-like positions (Money Market, Cash) have accumulated several legacy
//! encodings of their balance over time. Every aggregate in the workspace
//! (snapshots, diversification, rebalancing, history) must call
//! [`value_for_position`] rather than re-deriving value, otherwise the
//! encodings silently double-count.

use crate::models::{MixBucket, Position};
use rust_decimal::prelude::*;
use std::collections::HashMap;

/// Cash-like prices within this band of $1.00 are treated as a unit NAV
/// rather than a balance. Heuristic inferred from observed data — money
/// market NAVs hover within a cent or two of a dollar — pending product
/// clarification.
const CASH_UNIT_PRICE_BAND: f64 = 0.05;

/// Current dollar value of a position. Pure; invalid numeric fields coerce
/// to 0 and the result is never NaN or infinite.
pub fn value_for_position(position: &Position) -> f64 {
    let quantity = position.quantity.to_f64().unwrap_or(0.0);
    let cost_basis = position.cost_basis.to_f64().unwrap_or(0.0);
    let price = position
        .current_price
        .and_then(|p| p.to_f64())
        .filter(|p| p.is_finite());

    let value = if position.asset_class.is_cash_like() {
        cash_balance(quantity, cost_basis, price)
    } else {
        quantity * price.unwrap_or(cost_basis)
    };

    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Resolve a cash-like (quantity, cost_basis, price) triple to a balance.
///
/// Precedence, in order:
/// 1. quantity of 1 with a price materially away from $1 — price is the
///    balance (explicit current-balance encoding);
/// 2. quantity of 1 otherwise — cost basis is the balance;
/// 3. price absent or at the $1 NAV — quantity is the balance;
/// 4. anything else — quantity x price.
fn cash_balance(quantity: f64, cost_basis: f64, price: Option<f64>) -> f64 {
    let unit_quantity = (quantity - 1.0).abs() < 1e-9;
    let unit_price = price.map(|p| (p - 1.0).abs() <= CASH_UNIT_PRICE_BAND);

    if unit_quantity {
        match (price, unit_price) {
            (Some(p), Some(false)) => p,
            _ => cost_basis,
        }
    } else if unit_price.unwrap_or(true) {
        quantity
    } else {
        quantity * price.unwrap_or(1.0)
    }
}

/// Total portfolio value.
pub fn portfolio_total(positions: &[Position]) -> f64 {
    positions.iter().map(value_for_position).sum()
}

/// Value aggregated by ticker.
pub fn value_by_ticker(positions: &[Position]) -> HashMap<String, f64> {
    let mut values: HashMap<String, f64> = HashMap::new();
    for position in positions {
        *values.entry(position.ticker.clone()).or_insert(0.0) += value_for_position(position);
    }
    values
}

/// Equity/bonds/cash/other percentages of total value.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MixBreakdown {
    pub equity_pct: f64,
    pub bonds_pct: f64,
    pub cash_pct: f64,
    pub other_pct: f64,
}

/// Percentage breakdown across reporting buckets. All zeros for an empty
/// or worthless portfolio.
pub fn mix_breakdown(positions: &[Position]) -> MixBreakdown {
    let total = portfolio_total(positions);
    if total <= 0.0 {
        return MixBreakdown::default();
    }

    let mut buckets: HashMap<MixBucket, f64> = HashMap::new();
    for position in positions {
        *buckets.entry(position.asset_class.bucket()).or_insert(0.0) +=
            value_for_position(position);
    }

    let pct = |bucket: MixBucket| buckets.get(&bucket).copied().unwrap_or(0.0) / total * 100.0;
    MixBreakdown {
        equity_pct: pct(MixBucket::Equity),
        bonds_pct: pct(MixBucket::Bonds),
        cash_pct: pct(MixBucket::Cash),
        other_pct: pct(MixBucket::Other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountBucket, AssetClass};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn make_position(
        ticker: &str,
        class: AssetClass,
        quantity: Decimal,
        cost_basis: Decimal,
        current_price: Option<Decimal>,
    ) -> Position {
        Position {
            id: format!("pos-{}", ticker),
            ticker: ticker.to_string(),
            name: ticker.to_string(),
            asset_class: class,
            account: AccountBucket::Taxable,
            quantity,
            cost_basis,
            current_price,
            currency: "USD".to_string(),
            sector: None,
            purchase_date: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_market_position_uses_current_price() {
        let pos = make_position("AAPL", AssetClass::Equity, dec!(10), dec!(100), Some(dec!(150)));
        assert!((value_for_position(&pos) - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn test_market_position_falls_back_to_cost() {
        let pos = make_position("AAPL", AssetClass::Equity, dec!(10), dec!(100), None);
        assert!((value_for_position(&pos) - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_cash_balance_in_cost_basis() {
        // Legacy encoding: qty=1, balance in cost basis, no price.
        let pos = make_position("CASH", AssetClass::Cash, dec!(1), dec!(100), None);
        assert!((value_for_position(&pos) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_cash_balance_in_quantity() {
        // Legacy encoding: balance in quantity, unit NAV price.
        let pos = make_position("MMKT", AssetClass::MoneyMarket, dec!(100), dec!(1), Some(dec!(1)));
        assert!((value_for_position(&pos) - 100.0).abs() < 1e-9);

        // Price absent behaves the same.
        let pos = make_position("MMKT", AssetClass::MoneyMarket, dec!(100), dec!(1), None);
        assert!((value_for_position(&pos) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_cash_balance_in_current_price() {
        // Legacy encoding: qty=1, explicit balance in price, cost ignored.
        let pos = make_position("CASH", AssetClass::Cash, dec!(1), dec!(7), Some(dec!(100)));
        assert!((value_for_position(&pos) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_cash_unit_nav_near_one_uses_cost() {
        // A money market priced at $1.0001 is a unit NAV, not a balance.
        let pos = make_position("MMKT", AssetClass::MoneyMarket, dec!(1), dec!(250), Some(dec!(1.0001)));
        assert!((value_for_position(&pos) - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_valuation_stable_under_serde_round_trip() {
        let pos = make_position("CASH", AssetClass::Cash, dec!(1), dec!(100), None);
        let before = value_for_position(&pos);
        let json = serde_json::to_string(&pos).unwrap();
        let back: Position = serde_json::from_str(&json).unwrap();
        assert!((value_for_position(&back) - before).abs() < 1e-9);
    }

    #[test]
    fn test_zero_everything_is_zero() {
        let pos = make_position("X", AssetClass::Equity, dec!(0), dec!(0), None);
        assert_eq!(value_for_position(&pos), 0.0);
    }

    #[test]
    fn test_mix_breakdown_percentages() {
        let positions = vec![
            make_position("AAPL", AssetClass::Equity, dec!(10), dec!(100), Some(dec!(60))),
            make_position("BND", AssetClass::Bond, dec!(10), dec!(100), Some(dec!(30))),
            make_position("CASH", AssetClass::Cash, dec!(1), dec!(100), None),
        ];
        let mix = mix_breakdown(&positions);
        assert!((mix.equity_pct - 60.0).abs() < 1e-9);
        assert!((mix.bonds_pct - 30.0).abs() < 1e-9);
        assert!((mix.cash_pct - 10.0).abs() < 1e-9);
        assert_eq!(mix.other_pct, 0.0);
    }

    #[test]
    fn test_value_by_ticker_merges_accounts() {
        let mut a = make_position("AAPL", AssetClass::Equity, dec!(5), dec!(100), Some(dec!(100)));
        a.account = AccountBucket::Taxable;
        let mut b = make_position("AAPL", AssetClass::Equity, dec!(5), dec!(100), Some(dec!(100)));
        b.account = AccountBucket::RothIra;
        let values = value_by_ticker(&[a, b]);
        assert!((values["AAPL"] - 1000.0).abs() < 1e-9);
    }
}
