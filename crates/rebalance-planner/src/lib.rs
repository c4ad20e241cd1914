pub mod planner;
pub mod targets;

pub use planner::{plan, PlanRow, RebalancePlan};
pub use targets::TargetWeights;
