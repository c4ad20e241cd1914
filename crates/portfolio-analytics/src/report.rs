//! Aggregated portfolio report for downstream rendering.

use crate::diversification::{self, DiversificationDetails, HoldingWeight};
use crate::performance;
use crate::risk::RiskMetrics;
use chrono::NaiveDate;
use folio_core::valuation::{self, MixBreakdown};
use folio_core::{CashFlow, Position, ValuationPoint};
use serde::Serialize;

const TOP_HOLDINGS_LIMIT: usize = 10;

/// Everything a narrative or UI layer needs, computed once. Metrics that
/// cannot be determined stay `None` and must be rendered as such, never
/// as zero.
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioReport {
    pub as_of: NaiveDate,
    pub total_value: f64,
    pub mix: MixBreakdown,
    pub diversification_score: f64,
    pub diversification: DiversificationDetails,
    pub time_weighted_return: Option<f64>,
    pub money_weighted_return: Option<f64>,
    pub risk: RiskMetrics,
    pub top_holdings: Vec<HoldingWeight>,
}

/// Consumes a finished report and produces markdown. One-way: narrative
/// output never feeds back into portfolio state.
pub trait NarrativeGenerator: Send + Sync {
    fn render(&self, report: &PortfolioReport) -> String;
}

/// Compose the pure components into one report. `flows` use investor signs
/// (deposits negative); the terminal liquidation flow for XIRR is appended
/// here from the current total.
pub fn build_report(
    positions: &[Position],
    series: &[ValuationPoint],
    flows: &[CashFlow],
    benchmark: Option<&[(NaiveDate, f64)]>,
    as_of: NaiveDate,
) -> PortfolioReport {
    let total_value = valuation::portfolio_total(positions);
    let (diversification_score, diversification) = diversification::score(positions);

    let money_weighted_return = if total_value > 0.0 {
        performance::xirr(&performance::with_terminal_value(flows, as_of, total_value))
    } else {
        performance::xirr(flows)
    };

    let mut top_holdings: Vec<HoldingWeight> = valuation::value_by_ticker(positions)
        .into_iter()
        .map(|(ticker, value)| HoldingWeight {
            ticker,
            weight_pct: if total_value > 0.0 {
                value / total_value * 100.0
            } else {
                0.0
            },
            value,
        })
        .collect();
    top_holdings.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.ticker.cmp(&b.ticker))
    });
    top_holdings.truncate(TOP_HOLDINGS_LIMIT);

    PortfolioReport {
        as_of,
        total_value,
        mix: valuation::mix_breakdown(positions),
        diversification_score,
        diversification,
        time_weighted_return: performance::time_weighted_return(series, flows),
        money_weighted_return,
        risk: RiskMetrics::compute(series, benchmark),
        top_holdings,
    }
}
