#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/prices/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Quandl dataset source.
//!
//! This crate implements [`PriceSource`] for Quandl dataset codes using the
//! Nasdaq Data Link `datasets` API. Each dataset is returned with its own
//! column names, e.g. `Date, Value` for FRED series or
//! `Date, Open, High, Low, Last, Change, Settle, Volume` for futures.
//!
//! # Example
//!
//! ```no_run
//! use prices_quandl::QuandlSource;
//! use prices_core::{PriceSource, Symbol};
//!
//! # async fn example() -> prices_core::Result<()> {
//! let source = QuandlSource::new(Some("your-api-key".to_string()));
//! let frame = source.fetch(&Symbol::new("FRED/DGS10"), None).await?;
//! println!("Fetched {} rows", frame.height());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use polars::prelude::*;
use prices_core::{Host, PriceError, PriceSource, Result, Symbol};
use serde::Deserialize;
use tokio::time::sleep;
use tracing::debug;

/// Nasdaq Data Link datasets API base URL.
const DATASETS_API_URL: &str = "https://data.nasdaq.com/api/v3/datasets";

/// Default rate limit delay in milliseconds.
const DEFAULT_RATE_LIMIT_MS: u64 = 500;

/// Error code returned for an unknown dataset code.
const UNKNOWN_CODE: &str = "QECx02";

/// Quandl dataset source.
pub struct QuandlSource {
    client: reqwest::Client,
    api_key: Option<String>,
    rate_limit_ms: u64,
    last_request_time: AtomicU64,
}

impl fmt::Debug for QuandlSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuandlSource")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("rate_limit_ms", &self.rate_limit_ms)
            .finish()
    }
}

impl QuandlSource {
    /// Create a new Quandl source.
    ///
    /// Anonymous access works for free datasets with a low daily call limit.
    #[must_use]
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_rate_limit(api_key, Duration::from_millis(DEFAULT_RATE_LIMIT_MS))
    }

    /// Create a new Quandl source with custom rate limiting.
    #[must_use]
    pub fn with_rate_limit(api_key: Option<String>, rate_limit: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            api_key,
            rate_limit_ms: rate_limit.as_millis() as u64,
            last_request_time: AtomicU64::new(0),
        }
    }

    /// Apply rate limiting before making a request.
    async fn apply_rate_limit(&self) {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        let last = self.last_request_time.load(Ordering::Relaxed);
        let elapsed = now.saturating_sub(last);

        if elapsed < self.rate_limit_ms {
            let wait_time = self.rate_limit_ms - elapsed;
            debug!("Rate limiting: waiting {}ms", wait_time);
            sleep(Duration::from_millis(wait_time)).await;
        }

        self.last_request_time.store(
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
            Ordering::Relaxed,
        );
    }

    /// Build the dataset URL for a code and optional start date.
    fn build_dataset_url(&self, symbol: &Symbol, since: Option<NaiveDate>) -> String {
        let mut url = format!("{}/{}.json?order=asc", DATASETS_API_URL, symbol.as_str());
        if let Some(since) = since {
            url.push_str(&format!("&start_date={since}"));
        }
        if let Some(key) = &self.api_key {
            url.push_str(&format!("&api_key={key}"));
        }
        url
    }

    /// Convert a dataset response into a frame keeping the upstream column names.
    ///
    /// The first column is the date and is kept as text; the remaining columns
    /// are read as nullable floats.
    fn parse_dataset(symbol: &Symbol, response: DatasetResponse) -> Result<DataFrame> {
        let dataset = response.dataset;
        if dataset.column_names.is_empty() {
            return Err(PriceError::Parse(format!("No columns in dataset {symbol}")));
        }

        let mut columns = Vec::with_capacity(dataset.column_names.len());
        for (idx, name) in dataset.column_names.iter().enumerate() {
            let column = if idx == 0 {
                let dates: Vec<Option<&str>> = dataset
                    .data
                    .iter()
                    .map(|row| row.first().and_then(|v| v.as_str()))
                    .collect();
                Column::new(name.as_str().into(), dates)
            } else {
                let values: Vec<Option<f64>> = dataset
                    .data
                    .iter()
                    .map(|row| row.get(idx).and_then(serde_json::Value::as_f64))
                    .collect();
                Column::new(name.as_str().into(), values)
            };
            columns.push(column);
        }

        DataFrame::new(columns).map_err(|e| PriceError::Parse(e.to_string()))
    }
}

impl Default for QuandlSource {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl PriceSource for QuandlSource {
    fn host(&self) -> Host {
        Host::Quandl
    }

    fn description(&self) -> &str {
        "Quandl datasets (Nasdaq Data Link) for rates, inflation, commodities and futures"
    }

    async fn fetch(&self, symbol: &Symbol, since: Option<NaiveDate>) -> Result<DataFrame> {
        self.apply_rate_limit().await;

        let url = self.build_dataset_url(symbol, since);
        debug!("Fetching dataset {} since {:?}", symbol, since);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PriceError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(PriceError::RateLimited {
                provider: "Quandl".to_string(),
                retry_after: Some(Duration::from_secs(60)),
            });
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(PriceError::SymbolNotFound(symbol.to_string()));
        }

        let text = response
            .text()
            .await
            .map_err(|e| PriceError::Network(e.to_string()))?;

        if !status.is_success() {
            if let Ok(body) = serde_json::from_str::<ErrorResponse>(&text) {
                if body.quandl_error.code == UNKNOWN_CODE {
                    return Err(PriceError::SymbolNotFound(symbol.to_string()));
                }
                return Err(PriceError::Network(format!(
                    "HTTP {status} for {symbol}: {} {}",
                    body.quandl_error.code, body.quandl_error.message
                )));
            }
            return Err(PriceError::Network(format!("HTTP {status} for {symbol}")));
        }

        let dataset: DatasetResponse =
            serde_json::from_str(&text).map_err(|e| PriceError::Parse(e.to_string()))?;

        Self::parse_dataset(symbol, dataset)
    }
}

// ============================================================================
// Datasets API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct DatasetResponse {
    dataset: Dataset,
}

#[derive(Debug, Deserialize)]
struct Dataset {
    column_names: Vec<String>,
    #[serde(default)]
    data: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    quandl_error: QuandlError,
}

#[derive(Debug, Deserialize)]
struct QuandlError {
    code: String,
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const CPI_RESPONSE: &str = r#"{
        "dataset": {
            "dataset_code": "CPI_GBR",
            "database_code": "RATEINF",
            "column_names": ["Date", "Value"],
            "data": [["2017-07-31", 103.2], ["2017-08-31", 103.8], ["2017-09-30", null]]
        }
    }"#;

    #[test]
    fn test_build_dataset_url() {
        let source = QuandlSource::new(Some("secret".to_string()));
        let since = NaiveDate::from_ymd_opt(2017, 9, 4).unwrap();

        let url = source.build_dataset_url(&Symbol::new("FRED/DGS10"), Some(since));

        assert!(url.starts_with("https://data.nasdaq.com/api/v3/datasets/FRED/DGS10.json"));
        assert!(url.contains("start_date=2017-09-04"));
        assert!(url.contains("api_key=secret"));
    }

    #[test]
    fn test_build_dataset_url_full_history() {
        let source = QuandlSource::default();
        let url = source.build_dataset_url(&Symbol::new("FRED/DGS10"), None);
        assert!(!url.contains("start_date"));
        assert!(!url.contains("api_key"));
    }

    #[test]
    fn test_parse_dataset_keeps_column_names() {
        let response: DatasetResponse = serde_json::from_str(CPI_RESPONSE).unwrap();
        let df = QuandlSource::parse_dataset(&Symbol::new("RATEINF/CPI_GBR"), response).unwrap();

        assert_eq!(df.height(), 3);
        let names: Vec<&str> = df.get_column_names().into_iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["Date", "Value"]);
        let values = df.column("Value").unwrap().f64().unwrap();
        assert_eq!(values.get(1), Some(103.8));
        assert_eq!(values.get(2), None);
    }

    #[test]
    fn test_parsed_dataset_normalizes() {
        let response: DatasetResponse = serde_json::from_str(CPI_RESPONSE).unwrap();
        let symbol = Symbol::new("RATEINF/CPI_GBR");
        let df = QuandlSource::parse_dataset(&symbol, response).unwrap();

        let rows = prices_core::normalize(&df, &symbol).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2017, 7, 31).unwrap());
    }

    #[test]
    fn test_debug_redacts_key() {
        let source = QuandlSource::new(Some("secret".to_string()));
        let debug = format!("{source:?}");
        assert!(!debug.contains("secret"));
        assert_eq!(source.host(), Host::Quandl);
    }
}
