//! HTTP quote and history client.
//!
//! All requests run under a bounded timeout so a slow upstream degrades to
//! partial data instead of hanging a refresh. Unknown symbols are omitted
//! from results, never surfaced as errors.

use async_trait::async_trait;
use chrono::NaiveDate;
use folio_core::{FolioError, HistoryProvider, QuoteProvider, QuoteRecord, SamplingInterval};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 12;

#[derive(Clone)]
pub struct MarketDataClient {
    base_url: String,
    api_key: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct QuotesResponse {
    quotes: HashMap<String, QuoteEntry>,
}

#[derive(Debug, Deserialize)]
struct QuoteEntry {
    price: f64,
    name: Option<String>,
    sector: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    closes: Vec<CloseEntry>,
}

#[derive(Debug, Deserialize)]
struct CloseEntry {
    date: NaiveDate,
    close: f64,
}

impl MarketDataClient {
    /// Timeout defaults to 12 seconds; MARKET_DATA_TIMEOUT_SECS overrides.
    pub fn new(base_url: String, api_key: String) -> Self {
        let timeout_secs: u64 = std::env::var("MARKET_DATA_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            base_url,
            api_key,
            client,
        }
    }

    fn interval_param(interval: SamplingInterval) -> &'static str {
        match interval {
            SamplingInterval::Daily => "daily",
            SamplingInterval::Weekly => "weekly",
            SamplingInterval::Monthly => "monthly",
        }
    }
}

#[async_trait]
impl QuoteProvider for MarketDataClient {
    async fn fetch_quotes(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, QuoteRecord>, FolioError> {
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }

        let url = format!("{}/v1/quotes", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("symbols", symbols.join(",")),
                ("apiKey", self.api_key.clone()),
            ])
            .send()
            .await
            .map_err(|e| FolioError::Provider(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FolioError::Provider(format!(
                "quote request failed: HTTP {}",
                response.status()
            )));
        }

        let parsed: QuotesResponse = response
            .json()
            .await
            .map_err(|e| FolioError::Provider(e.to_string()))?;

        // Upstream omits symbols it does not know; pass that through and
        // drop anything with a non-positive price.
        let quotes = parsed
            .quotes
            .into_iter()
            .filter(|(_, q)| q.price.is_finite() && q.price > 0.0)
            .map(|(symbol, q)| {
                (
                    symbol,
                    QuoteRecord {
                        price: q.price,
                        name: q.name,
                        sector: q.sector,
                    },
                )
            })
            .collect();
        Ok(quotes)
    }
}

#[async_trait]
impl HistoryProvider for MarketDataClient {
    async fn fetch_history(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
        interval: SamplingInterval,
    ) -> Result<HashMap<String, Vec<(NaiveDate, f64)>>, FolioError> {
        let mut out = HashMap::new();

        // One request per symbol; a failed symbol degrades the result to
        // partial data rather than failing the whole refresh.
        for symbol in symbols {
            let url = format!("{}/v1/history/{}", self.base_url, symbol);
            let result = self
                .client
                .get(&url)
                .query(&[
                    ("start", start.to_string()),
                    ("end", end.to_string()),
                    ("interval", Self::interval_param(interval).to_string()),
                    ("apiKey", self.api_key.clone()),
                ])
                .send()
                .await;

            let response = match result {
                Ok(r) if r.status().is_success() => r,
                Ok(r) => {
                    tracing::warn!(symbol = %symbol, status = %r.status(), "history request failed, skipping symbol");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(symbol = %symbol, error = %e, "history request errored, skipping symbol");
                    continue;
                }
            };

            match response.json::<HistoryResponse>().await {
                Ok(parsed) => {
                    let mut closes: Vec<(NaiveDate, f64)> = parsed
                        .closes
                        .into_iter()
                        .filter(|c| c.close.is_finite() && c.close > 0.0)
                        .map(|c| (c.date, c.close))
                        .collect();
                    closes.sort_by_key(|(date, _)| *date);
                    out.insert(symbol.clone(), closes);
                }
                Err(e) => {
                    tracing::warn!(symbol = %symbol, error = %e, "history response malformed, skipping symbol");
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_response_shape() {
        let raw = r#"{"quotes":{"AAPL":{"price":191.2,"name":"Apple Inc.","sector":"Technology"},"MM1":{"price":1.0}}}"#;
        let parsed: QuotesResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.quotes.len(), 2);
        assert!((parsed.quotes["AAPL"].price - 191.2).abs() < 1e-9);
        assert!(parsed.quotes["MM1"].name.is_none());
    }

    #[test]
    fn test_history_response_shape() {
        let raw = r#"{"closes":[{"date":"2024-03-01","close":100.5},{"date":"2024-03-04","close":101.0}]}"#;
        let parsed: HistoryResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.closes.len(), 2);
        assert_eq!(
            parsed.closes[0].date,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
    }

    #[tokio::test]
    async fn test_empty_symbol_list_short_circuits() {
        let client = MarketDataClient::new("http://localhost:0".to_string(), "test".to_string());
        let quotes = client.fetch_quotes(&[]).await.unwrap();
        assert!(quotes.is_empty());
    }

    #[test]
    fn test_interval_params() {
        assert_eq!(MarketDataClient::interval_param(SamplingInterval::Daily), "daily");
        assert_eq!(MarketDataClient::interval_param(SamplingInterval::Weekly), "weekly");
        assert_eq!(MarketDataClient::interval_param(SamplingInterval::Monthly), "monthly");
    }
}
