use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Asset class of a holding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetClass {
    Equity,
    Etf,
    MutualFund,
    Crypto,
    Bond,
    MoneyMarket,
    Cash,
    Other,
}

impl AssetClass {
    /// Cash-like classes encode a dollar balance, not a share count.
    pub fn is_cash_like(&self) -> bool {
        matches!(self, AssetClass::MoneyMarket | AssetClass::Cash)
    }

    /// Reporting bucket for mix percentages.
    pub fn bucket(&self) -> MixBucket {
        match self {
            AssetClass::Equity | AssetClass::Etf | AssetClass::Crypto => MixBucket::Equity,
            AssetClass::Bond => MixBucket::Bonds,
            AssetClass::MoneyMarket | AssetClass::Cash => MixBucket::Cash,
            AssetClass::MutualFund | AssetClass::Other => MixBucket::Other,
        }
    }
}

/// Coarse bucket used for the equity/bonds/cash/other breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MixBucket {
    Equity,
    Bonds,
    Cash,
    Other,
}

/// Account the holding lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountBucket {
    Taxable,
    RothIra,
    TraditionalIra,
    Employer401k,
    Hsa,
    Other,
}

/// A single holding.
///
/// For cash-like asset classes the (quantity, cost_basis, current_price)
/// triple encodes a dollar balance under one of several legacy conventions;
/// `valuation::value_for_position` resolves them. Everywhere else quantity
/// is a share count and cost_basis is per unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub ticker: String,
    pub name: String,
    pub asset_class: AssetClass,
    pub account: AccountBucket,
    pub quantity: Decimal,
    pub cost_basis: Decimal,
    pub current_price: Option<Decimal>,
    pub currency: String,
    pub sector: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    Buy,
    Sell,
    CashDeposit,
    CashWithdrawal,
}

/// A recorded event: trade or external cash movement.
/// Trades carry ticker/quantity/optional price; cash flows carry amount.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub tx_type: TransactionType,
    pub date: NaiveDate,
    pub account: AccountBucket,
    pub ticker: Option<String>,
    pub quantity: Option<Decimal>,
    pub price: Option<Decimal>,
    pub amount: Option<Decimal>,
}

/// Investor-perspective external cash flow: deposits are negative (money
/// leaving the investor's pocket), withdrawals positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CashFlow {
    pub date: NaiveDate,
    pub amount: f64,
}

/// One point of a daily valuation series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationPoint {
    pub date: NaiveDate,
    pub total_value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_ticker: Option<HashMap<String, f64>>,
}

/// Model allocation mix as fractions summing to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelMix {
    pub equity: f64,
    pub bonds: f64,
    pub cash: f64,
}

/// User risk profile; the level picks a model mix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskProfile {
    pub risk_level: u8,
}

impl RiskProfile {
    pub fn new(risk_level: u8) -> Self {
        Self {
            risk_level: risk_level.clamp(1, 5),
        }
    }

    /// Target equity/bonds/cash mix for this risk level.
    pub fn model_mix(&self) -> ModelMix {
        match self.risk_level {
            1 => ModelMix { equity: 0.20, bonds: 0.50, cash: 0.30 },
            2 => ModelMix { equity: 0.40, bonds: 0.40, cash: 0.20 },
            3 => ModelMix { equity: 0.60, bonds: 0.30, cash: 0.10 },
            4 => ModelMix { equity: 0.75, bonds: 0.20, cash: 0.05 },
            _ => ModelMix { equity: 0.90, bonds: 0.10, cash: 0.00 },
        }
    }
}

/// The single serializable blob handed to the persistent store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioState {
    pub profile: RiskProfile,
    pub positions: Vec<Position>,
    pub transactions: Vec<Transaction>,
    pub snapshots: Vec<ValuationPoint>,
    pub last_updated: DateTime<Utc>,
}

/// Current quote for one instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub price: f64,
    pub name: Option<String>,
    pub sector: Option<String>,
}

/// Sampling interval for historical price series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SamplingInterval {
    Daily,
    Weekly,
    Monthly,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cash_like_classes() {
        assert!(AssetClass::MoneyMarket.is_cash_like());
        assert!(AssetClass::Cash.is_cash_like());
        assert!(!AssetClass::Equity.is_cash_like());
        assert!(!AssetClass::Bond.is_cash_like());
    }

    #[test]
    fn test_risk_level_clamped() {
        assert_eq!(RiskProfile::new(0).risk_level, 1);
        assert_eq!(RiskProfile::new(9).risk_level, 5);
    }

    #[test]
    fn test_model_mix_sums_to_one() {
        for level in 1..=5u8 {
            let mix = RiskProfile::new(level).model_mix();
            let total = mix.equity + mix.bonds + mix.cash;
            assert!((total - 1.0).abs() < 1e-12, "level {} mix sums to {}", level, total);
        }
    }
}
