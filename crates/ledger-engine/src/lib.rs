pub mod baseline;
pub mod flows;
pub mod rebuild;

pub use baseline::Baseline;
pub use flows::cash_flows_from_transactions;
pub use rebuild::{rebuild_positions, reconstruct};
