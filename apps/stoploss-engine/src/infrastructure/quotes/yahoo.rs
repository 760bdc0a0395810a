//! Yahoo Finance quote provider.
//!
//! Primary price source. NSE symbols are queried with the `.NS` suffix
//! Yahoo uses for the exchange.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::application::ports::{QuoteError, QuoteProviderPort};
use crate::domain::Symbol;

/// Yahoo Finance provider configuration.
#[derive(Debug, Clone)]
pub struct YahooConfig {
    /// API base URL, overridable for testing.
    pub base_url: String,
    /// Suffix appended to every symbol (e.g. `.NS` for the NSE).
    pub symbol_suffix: String,
    /// HTTP request timeout.
    pub timeout: Duration,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            symbol_suffix: ".NS".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Quote provider backed by the Yahoo Finance chart endpoint.
#[derive(Debug, Clone)]
pub struct YahooFinanceProvider {
    client: Client,
    base_url: String,
    symbol_suffix: String,
}

impl YahooFinanceProvider {
    /// Create a provider from config.
    pub fn new(config: &YahooConfig) -> Result<Self, QuoteError> {
        // Yahoo rejects requests without a browser-ish user agent.
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent("Mozilla/5.0 (X11; Linux x86_64)")
            .build()
            .map_err(|e| QuoteError::Unreachable {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            symbol_suffix: config.symbol_suffix.clone(),
        })
    }
}

#[async_trait]
impl QuoteProviderPort for YahooFinanceProvider {
    fn name(&self) -> &str {
        "yahoo"
    }

    async fn last_price(&self, symbol: &Symbol) -> Result<Decimal, QuoteError> {
        let url = format!(
            "{}/v8/finance/chart/{}{}?interval=1m&range=1d",
            self.base_url,
            symbol.as_str(),
            self.symbol_suffix
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| QuoteError::Unreachable {
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(QuoteError::Unreachable {
                message: format!("status {}", response.status()),
            });
        }

        let body: ChartResponse =
            response.json().await.map_err(|e| QuoteError::Unreachable {
                message: e.to_string(),
            })?;

        body.chart
            .result
            .and_then(|results| results.into_iter().next())
            .and_then(|result| result.meta.regular_market_price)
            .ok_or_else(|| QuoteError::Unavailable {
                symbol: symbol.to_string(),
            })
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    #[serde(default)]
    regular_market_price: Option<Decimal>,
}
