//! In-memory store implementation.

use async_trait::async_trait;
use chrono::NaiveDate;
use prices_core::{PriceRow, PriceStore, ProviderEntry, Result, Symbol, WriteMode};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Simple in-memory store for testing and dry runs.
///
/// Rows are kept in insertion order in `RwLock`-protected vectors and are lost
/// when the store is dropped. Like the SQLite store, duplicates are not rejected.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    prices: RwLock<Vec<PriceRow>>,
    providers: RwLock<Vec<ProviderEntry>>,
}

impl InMemoryStore {
    /// Create a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with a provider catalog.
    #[must_use]
    pub fn with_providers(entries: Vec<ProviderEntry>) -> Self {
        Self {
            prices: RwLock::default(),
            providers: RwLock::new(entries),
        }
    }

    /// Returns every stored price row in insertion order.
    pub async fn all_prices(&self) -> Vec<PriceRow> {
        self.prices.read().await.clone()
    }
}

#[async_trait]
impl PriceStore for InMemoryStore {
    async fn providers(&self) -> Result<Vec<ProviderEntry>> {
        Ok(self.providers.read().await.clone())
    }

    #[instrument(skip(self, entries), fields(count = entries.len()))]
    async fn write_providers(&self, entries: &[ProviderEntry], mode: WriteMode) -> Result<()> {
        let mut providers = self.providers.write().await;
        if mode == WriteMode::Replace {
            providers.clear();
        }
        providers.extend_from_slice(entries);
        debug!("Stored {} provider entries", entries.len());
        Ok(())
    }

    async fn prices(&self, symbol: &Symbol, since: Option<NaiveDate>) -> Result<Vec<PriceRow>> {
        let prices = self.prices.read().await;
        let mut rows: Vec<PriceRow> = prices
            .iter()
            .filter(|r| &r.symbol == symbol && since.is_none_or(|s| r.date >= s))
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.date);
        Ok(rows)
    }

    async fn latest_date(&self, symbol: &Symbol) -> Result<Option<NaiveDate>> {
        let prices = self.prices.read().await;
        Ok(prices
            .iter()
            .filter(|r| &r.symbol == symbol)
            .map(|r| r.date)
            .max())
    }

    async fn row_count(&self, symbol: &Symbol) -> Result<usize> {
        let prices = self.prices.read().await;
        Ok(prices.iter().filter(|r| &r.symbol == symbol).count())
    }

    #[instrument(skip(self, rows), fields(count = rows.len()))]
    async fn write_prices(&self, rows: &[PriceRow], mode: WriteMode) -> Result<usize> {
        let mut prices = self.prices.write().await;
        if mode == WriteMode::Replace {
            prices.clear();
        }
        prices.extend_from_slice(rows);
        debug!("Stored {} price rows", rows.len());
        Ok(rows.len())
    }
}
