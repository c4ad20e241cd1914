//! Target-weight derivation for rebalance planning.

use folio_core::valuation;
use folio_core::{AssetClass, MixBucket, ModelMix, Position, RiskProfile};
use std::collections::HashMap;

/// Normalized ticker-to-weight map (weights sum to 1 unless empty).
#[derive(Debug, Clone, Default)]
pub struct TargetWeights {
    weights: HashMap<String, f64>,
}

impl TargetWeights {
    /// Build from explicit per-ticker weights. Non-finite and non-positive
    /// entries are dropped, the rest normalized to sum to 1. A zero sum
    /// yields an empty set — the caller decides whether that is a warning.
    pub fn from_tickers(raw: &HashMap<String, f64>) -> Self {
        let mut weights: HashMap<String, f64> = raw
            .iter()
            .filter(|(_, w)| w.is_finite() && **w > 0.0)
            .map(|(t, w)| (t.clone(), *w))
            .collect();
        let sum: f64 = weights.values().sum();
        if sum > 0.0 {
            for w in weights.values_mut() {
                *w /= sum;
            }
        } else {
            weights.clear();
        }
        Self { weights }
    }

    /// Build from per-asset-class weights, spreading each class's share
    /// across its member tickers proportional to their current within-class
    /// value. A class with zero current value splits equally.
    pub fn from_asset_classes(
        class_weights: &HashMap<AssetClass, f64>,
        positions: &[Position],
    ) -> Self {
        let sum: f64 = class_weights
            .values()
            .filter(|w| w.is_finite() && **w > 0.0)
            .sum();
        if sum <= 0.0 {
            return Self::default();
        }

        let mut weights: HashMap<String, f64> = HashMap::new();
        for (class, raw) in class_weights {
            if !raw.is_finite() || *raw <= 0.0 {
                continue;
            }
            let class_weight = raw / sum;

            let members: Vec<&Position> = positions
                .iter()
                .filter(|p| p.asset_class == *class)
                .collect();
            if members.is_empty() {
                continue;
            }

            let mut value_by_ticker: HashMap<&str, f64> = HashMap::new();
            for p in &members {
                *value_by_ticker.entry(p.ticker.as_str()).or_insert(0.0) +=
                    valuation::value_for_position(p);
            }
            let class_value: f64 = value_by_ticker.values().sum();

            if class_value > 0.0 {
                for (ticker, value) in value_by_ticker {
                    *weights.entry(ticker.to_string()).or_insert(0.0) +=
                        class_weight * value / class_value;
                }
            } else {
                let share = class_weight / value_by_ticker.len() as f64;
                for ticker in value_by_ticker.keys() {
                    *weights.entry(ticker.to_string()).or_insert(0.0) += share;
                }
            }
        }
        Self { weights }
    }

    /// Build from a risk profile's model mix, mapping the equity/bonds/cash
    /// fractions onto the asset classes currently held in each bucket.
    pub fn from_risk_profile(profile: &RiskProfile, positions: &[Position]) -> Self {
        let mix = profile.model_mix();
        let mut class_weights: HashMap<AssetClass, f64> = HashMap::new();
        for class in [
            AssetClass::Equity,
            AssetClass::Etf,
            AssetClass::MutualFund,
            AssetClass::Crypto,
            AssetClass::Bond,
            AssetClass::MoneyMarket,
            AssetClass::Cash,
            AssetClass::Other,
        ] {
            let bucket_weight = bucket_fraction(&mix, class);
            if bucket_weight <= 0.0 {
                continue;
            }
            // Split a bucket's weight across its held classes by value.
            let class_value: f64 = positions
                .iter()
                .filter(|p| p.asset_class == class)
                .map(valuation::value_for_position)
                .sum();
            let bucket_value: f64 = positions
                .iter()
                .filter(|p| p.asset_class.bucket() == class.bucket())
                .map(valuation::value_for_position)
                .sum();
            if bucket_value > 0.0 {
                if class_value > 0.0 {
                    class_weights.insert(class, bucket_weight * class_value / bucket_value);
                }
            } else if positions.iter().any(|p| p.asset_class == class) {
                class_weights.insert(class, bucket_weight);
            }
        }
        Self::from_asset_classes(&class_weights, positions)
    }

    pub fn weight(&self, ticker: &str) -> f64 {
        self.weights.get(ticker).copied().unwrap_or(0.0)
    }

    pub fn sum(&self) -> f64 {
        self.weights.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.weights.keys().map(String::as_str)
    }
}

fn bucket_fraction(mix: &ModelMix, class: AssetClass) -> f64 {
    match class.bucket() {
        MixBucket::Equity => mix.equity,
        MixBucket::Bonds => mix.bonds,
        MixBucket::Cash => mix.cash,
        MixBucket::Other => 0.0,
    }
}
