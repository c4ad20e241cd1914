pub mod diversification;
pub mod history;
pub mod performance;
pub mod report;
pub mod risk;
pub mod shared_math;

pub use diversification::{score, DiversificationDetails, HoldingWeight};
pub use history::build_valuation_series;
pub use performance::{time_weighted_return, with_terminal_value, xirr};
pub use report::{build_report, NarrativeGenerator, PortfolioReport};
pub use risk::{annualized_volatility, beta_from_returns, daily_returns_dated, max_drawdown, RiskMetrics};
