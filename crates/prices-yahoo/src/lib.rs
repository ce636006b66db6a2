#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/prices/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Yahoo Finance source.
//!
//! This crate implements [`PriceSource`] on top of Yahoo Finance's chart API.
//!
//! # Features
//!
//! - Daily bars from a start date, or the full history with `since = None`
//! - Built-in rate limiting (1 request per second by default)
//! - Frames laid out as `Date, Open, High, Low, Close, Adj Close, Volume`
//!
//! # Example
//!
//! ```no_run
//! use prices_yahoo::YahooSource;
//! use prices_core::{PriceSource, Symbol};
//! use chrono::NaiveDate;
//!
//! # async fn example() -> prices_core::Result<()> {
//! let source = YahooSource::new();
//! let since = NaiveDate::from_ymd_opt(2017, 9, 4).unwrap();
//!
//! let df = source.fetch(&Symbol::new("GLD"), Some(since)).await?;
//! println!("Fetched {} rows", df.height());
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use polars::prelude::*;
use prices_core::{Host, PriceError, PriceSource, Result, Symbol};
use serde::Deserialize;
use tokio::time::sleep;
use tracing::debug;

/// Yahoo Finance chart API base URL.
const CHART_API_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Default rate limit delay in milliseconds.
const DEFAULT_RATE_LIMIT_MS: u64 = 1000;

/// User agent for HTTP requests.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Yahoo Finance source.
#[derive(Debug)]
pub struct YahooSource {
    client: reqwest::Client,
    rate_limit_ms: u64,
    last_request_time: AtomicU64,
}

impl YahooSource {
    /// Create a new Yahoo Finance source with default settings.
    ///
    /// Uses built-in rate limiting of 1 request per second.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rate_limit(Duration::from_millis(DEFAULT_RATE_LIMIT_MS))
    }

    /// Create a new Yahoo Finance source with a custom HTTP client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            rate_limit_ms: DEFAULT_RATE_LIMIT_MS,
            last_request_time: AtomicU64::new(0),
        }
    }

    /// Create a new Yahoo Finance source with custom rate limiting.
    #[must_use]
    pub fn with_rate_limit(rate_limit: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
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

    /// Build the chart API URL for a symbol from an optional start date.
    fn build_chart_url(&self, symbol: &Symbol, since: Option<NaiveDate>) -> String {
        let window = match since.and_then(|d| d.and_hms_opt(0, 0, 0)) {
            Some(start) => format!(
                "period1={}&period2={}",
                Utc.from_utc_datetime(&start).timestamp(),
                Utc::now().timestamp()
            ),
            None => "range=max".to_string(),
        };

        format!(
            "{}/{}?{}&interval=1d&includeAdjustedClose=true",
            CHART_API_URL,
            symbol.as_str(),
            window
        )
    }

    /// Parse a chart response into a `Date, Open, High, Low, Close, Adj Close, Volume` frame.
    fn parse_chart_response(symbol: &Symbol, response: ChartResponse) -> Result<DataFrame> {
        let result = response
            .chart
            .result
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| PriceError::SymbolNotFound(symbol.to_string()))?;

        let timestamps = result.timestamp.unwrap_or_default();

        let quote = result
            .indicators
            .quote
            .into_iter()
            .next()
            .unwrap_or_default();

        let adj_close = result
            .indicators
            .adjclose
            .and_then(|ac| ac.into_iter().next())
            .map(|ac| ac.adjclose)
            .unwrap_or_default();

        let epoch = NaiveDate::default();
        let mut dates = Vec::with_capacity(timestamps.len());
        for &ts in &timestamps {
            let date = Utc
                .timestamp_opt(ts, 0)
                .single()
                .map(|dt| dt.date_naive())
                .ok_or_else(|| PriceError::Parse(format!("Invalid timestamp {ts}")))?;
            dates.push((date - epoch).num_days() as i32);
        }

        let n = dates.len();
        let closes = pad(quote.close, n);
        // Pad adjusted close if needed
        let adj_closes = if adj_close.len() == n {
            adj_close
        } else {
            closes.clone()
        };

        let date_col = Column::new("Date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| PriceError::Other(e.to_string()))?;

        DataFrame::new(vec![
            date_col,
            Column::new("Open".into(), pad(quote.open, n)),
            Column::new("High".into(), pad(quote.high, n)),
            Column::new("Low".into(), pad(quote.low, n)),
            Column::new("Close".into(), closes),
            Column::new("Adj Close".into(), adj_closes),
            Column::new("Volume".into(), pad(quote.volume, n)),
        ])
        .map_err(|e| PriceError::Other(e.to_string()))
    }
}

/// Resize an indicator array to the timestamp count, filling with nulls.
fn pad<T: Clone>(mut values: Vec<Option<T>>, len: usize) -> Vec<Option<T>> {
    values.resize(len, None);
    values
}

impl Default for YahooSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceSource for YahooSource {
    fn host(&self) -> Host {
        Host::Yahoo
    }

    fn description(&self) -> &str {
        "Yahoo Finance daily closes for equities, indices and ETFs"
    }

    async fn fetch(&self, symbol: &Symbol, since: Option<NaiveDate>) -> Result<DataFrame> {
        // Apply rate limiting
        self.apply_rate_limit().await;

        let url = self.build_chart_url(symbol, since);
        debug!("Fetching chart: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PriceError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(PriceError::RateLimited {
                provider: "Yahoo Finance".to_string(),
                retry_after: Some(Duration::from_secs(60)),
            });
        }

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PriceError::SymbolNotFound(symbol.to_string()));
        }

        if !response.status().is_success() {
            return Err(PriceError::Network(format!(
                "HTTP {} for {}",
                response.status(),
                symbol
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| PriceError::Network(e.to_string()))?;
        let chart_response: ChartResponse =
            serde_json::from_str(&text).map_err(|e| PriceError::Parse(e.to_string()))?;

        // Check for API-level errors
        if let Some(error) = chart_response.chart.error {
            if error.code == "Not Found" {
                return Err(PriceError::SymbolNotFound(symbol.to_string()));
            }
            return Err(PriceError::Other(format!(
                "{}: {}",
                error.code, error.description
            )));
        }

        Self::parse_chart_response(symbol, chart_response)
    }
}

// ============================================================================
// Yahoo Finance API Response Types
// ============================================================================

/// Chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjClose>>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjClose {
    adjclose: Vec<Option<f64>>,
}
