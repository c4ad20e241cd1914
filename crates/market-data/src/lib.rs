pub mod client;
pub mod tracker;

pub use client::MarketDataClient;
pub use tracker::{RequestToken, RequestTracker};
