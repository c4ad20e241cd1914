use crate::{FolioError, PortfolioState, QuoteRecord, SamplingInterval};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;

/// Upstream quote source. Unknown or failed symbols are omitted from the
/// result map, never surfaced as errors.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn fetch_quotes(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, QuoteRecord>, FolioError>;
}

/// Upstream historical price source. Returns per-symbol (date, close)
/// series ordered by date; closes are forward-fillable.
#[async_trait]
pub trait HistoryProvider: Send + Sync {
    async fn fetch_history(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
        interval: SamplingInterval,
    ) -> Result<HashMap<String, Vec<(NaiveDate, f64)>>, FolioError>;
}

/// Opaque persistence of the whole portfolio state blob.
pub trait StateStore: Send + Sync {
    fn load(&self) -> Result<Option<PortfolioState>, FolioError>;
    fn save(&self, state: &PortfolioState) -> Result<(), FolioError>;
}
