//! Concentration-based diversification scoring.

use crate::shared_math;
use folio_core::valuation::{self, MixBreakdown};
use folio_core::Position;
use serde::Serialize;
use std::collections::HashSet;

const FULL_CREDIT_TICKERS: f64 = 12.0;
const FULL_CREDIT_CLASSES: f64 = 5.0;
const TOP_HOLDING_WARN_PCT: f64 = 20.0;
const TOP3_WARN_PCT: f64 = 60.0;

/// One ticker's share of the portfolio.
#[derive(Debug, Clone, Serialize)]
pub struct HoldingWeight {
    pub ticker: String,
    pub weight_pct: f64,
    pub value: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DiversificationDetails {
    pub hhi: f64,
    pub distinct_tickers: usize,
    pub distinct_classes: usize,
    pub top_holding: Option<HoldingWeight>,
    pub top3_weight_pct: f64,
    pub mix: MixBreakdown,
    pub tier: &'static str,
    pub warnings: Vec<String>,
}

/// Score a position set 0-100: 40% ticker breadth, 40% inverse
/// concentration (1 - HHI), 20% asset-class breadth.
pub fn score(positions: &[Position]) -> (f64, DiversificationDetails) {
    let total = valuation::portfolio_total(positions);
    if positions.is_empty() || total <= 0.0 {
        return (0.0, DiversificationDetails { tier: tier_for(0.0), ..Default::default() });
    }

    let by_ticker = valuation::value_by_ticker(positions);
    let mut holdings: Vec<HoldingWeight> = by_ticker
        .into_iter()
        .map(|(ticker, value)| HoldingWeight {
            ticker,
            weight_pct: value / total * 100.0,
            value,
        })
        .collect();
    holdings.sort_by(|a, b| {
        b.weight_pct
            .partial_cmp(&a.weight_pct)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.ticker.cmp(&b.ticker))
    });

    let weights: Vec<f64> = holdings.iter().map(|h| h.weight_pct / 100.0).collect();
    let hhi = shared_math::herfindahl_index(&weights);

    let distinct_tickers = holdings.len();
    let distinct_classes = positions
        .iter()
        .map(|p| p.asset_class)
        .collect::<HashSet<_>>()
        .len();

    let score = 100.0
        * (0.4 * (distinct_tickers as f64 / FULL_CREDIT_TICKERS).min(1.0)
            + 0.4 * (1.0 - hhi)
            + 0.2 * (distinct_classes as f64 / FULL_CREDIT_CLASSES).min(1.0));

    let top3_weight_pct: f64 = holdings.iter().take(3).map(|h| h.weight_pct).sum();
    let top_holding = holdings.first().cloned();

    let mut warnings = Vec::new();
    if let Some(top) = &top_holding {
        if top.weight_pct > TOP_HOLDING_WARN_PCT {
            warnings.push(format!(
                "{} is {:.1}% of the portfolio (over {:.0}%)",
                top.ticker, top.weight_pct, TOP_HOLDING_WARN_PCT
            ));
        }
    }
    if top3_weight_pct > TOP3_WARN_PCT {
        warnings.push(format!(
            "top 3 holdings are {:.1}% of the portfolio (over {:.0}%)",
            top3_weight_pct, TOP3_WARN_PCT
        ));
    }

    let details = DiversificationDetails {
        hhi,
        distinct_tickers,
        distinct_classes,
        top_holding,
        top3_weight_pct,
        mix: valuation::mix_breakdown(positions),
        tier: tier_for(score),
        warnings,
    };
    (score, details)
}

/// Qualitative tier; thresholds are monotonic in the score.
fn tier_for(score: f64) -> &'static str {
    if score >= 85.0 {
        "Excellent"
    } else if score >= 70.0 {
        "Good"
    } else if score >= 40.0 {
        "Fair"
    } else {
        "Poor"
    }
}
