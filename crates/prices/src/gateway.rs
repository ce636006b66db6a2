//! Provider gateway dispatching fetches to registered sources by host id.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use polars::prelude::DataFrame;
use tracing::{debug, warn};

use prices_core::{Host, PriceError, PriceSource, Result, Symbol};

/// Source decorator that logs each fetch at the gateway boundary.
///
/// Inputs are logged before the call, the row count on success and the error
/// on failure. Errors are returned unchanged.
#[derive(Debug)]
pub struct LoggedSource {
    inner: Arc<dyn PriceSource>,
}

impl LoggedSource {
    /// Wrap a source.
    #[must_use]
    pub fn new(inner: Arc<dyn PriceSource>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl PriceSource for LoggedSource {
    fn host(&self) -> Host {
        self.inner.host()
    }

    fn description(&self) -> &str {
        self.inner.description()
    }

    async fn fetch(&self, symbol: &Symbol, since: Option<NaiveDate>) -> Result<DataFrame> {
        debug!(
            host = %self.inner.host(),
            symbol = %symbol,
            since = ?since,
            "Fetching from source"
        );

        match self.inner.fetch(symbol, since).await {
            Ok(frame) => {
                debug!(
                    host = %self.inner.host(),
                    symbol = %symbol,
                    rows = frame.height(),
                    "Source returned frame"
                );
                Ok(frame)
            }
            Err(e) => {
                warn!(
                    host = %self.inner.host(),
                    symbol = %symbol,
                    error = %e,
                    "Source fetch failed"
                );
                Err(e)
            }
        }
    }
}

/// Registry of price sources keyed by [`Host`].
///
/// # Example
///
/// ```rust,ignore
/// use prices::{ProviderGateway, Symbol};
///
/// let gateway = ProviderGateway::new().with_yahoo().with_quandl(None);
/// let frame = gateway.fetch("yahoo", &Symbol::new("GLD"), None).await?;
/// ```
#[derive(Default)]
pub struct ProviderGateway {
    sources: Vec<Arc<dyn PriceSource>>,
}

impl std::fmt::Debug for ProviderGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderGateway")
            .field("hosts", &self.hosts())
            .finish()
    }
}

impl ProviderGateway {
    /// Create a new empty gateway.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source, replacing any source already registered for its host.
    pub fn register(&mut self, source: Arc<dyn PriceSource>) {
        let host = source.host();
        debug!(host = %host, description = source.description(), "Registering source");
        self.sources.retain(|s| s.host() != host);
        self.sources.push(Arc::new(LoggedSource::new(source)));
    }

    /// Register a source, builder style.
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn PriceSource>) -> Self {
        self.register(source);
        self
    }

    /// Hosts with a registered source, in registration order.
    #[must_use]
    pub fn hosts(&self) -> Vec<Host> {
        self.sources.iter().map(|s| s.host()).collect()
    }

    /// Returns the source registered for `host`.
    pub fn source(&self, host: Host) -> Result<&Arc<dyn PriceSource>> {
        self.sources
            .iter()
            .find(|s| s.host() == host)
            .ok_or_else(|| PriceError::ProviderNotConfigured(format!("No source for {host}")))
    }

    /// Fetch a raw frame for `symbol` from the source identified by `provider_id`.
    ///
    /// `since = None` requests the full available history.
    pub async fn fetch(
        &self,
        provider_id: &str,
        symbol: &Symbol,
        since: Option<NaiveDate>,
    ) -> Result<DataFrame> {
        let host: Host = provider_id.parse()?;
        self.fetch_from(host, symbol, since).await
    }

    /// Fetch a raw frame from the source registered for `host`.
    pub async fn fetch_from(
        &self,
        host: Host,
        symbol: &Symbol,
        since: Option<NaiveDate>,
    ) -> Result<DataFrame> {
        self.source(host)?.fetch(symbol, since).await
    }

    // Builder methods for the bundled sources

    /// Add the Yahoo Finance source.
    #[cfg(feature = "yahoo")]
    #[must_use]
    pub fn with_yahoo(self) -> Self {
        self.with_source(Arc::new(prices_yahoo::YahooSource::new()))
    }

    /// Add the Quandl source.
    #[cfg(feature = "quandl")]
    #[must_use]
    pub fn with_quandl(self, api_key: Option<String>) -> Self {
        self.with_source(Arc::new(prices_quandl::QuandlSource::new(api_key)))
    }
}
