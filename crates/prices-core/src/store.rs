//! Storage trait for prices and the provider catalog.
//!
//! This module defines the [`PriceStore`] trait that the update pipeline and
//! the analytics read from and write to.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    types::{PriceRow, ProviderEntry, Symbol},
};

/// How a write treats the existing table contents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WriteMode {
    /// Keep existing rows and add the new ones.
    #[default]
    Append,
    /// Drop every existing row first.
    Replace,
}

/// Relational storage for price rows and provider entries.
///
/// Stores do not enforce uniqueness of `(symbol, date)`; that invariant is
/// kept by the incremental cursor choosing the fetch start date.
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Returns the provider catalog in insertion order.
    async fn providers(&self) -> Result<Vec<ProviderEntry>>;

    /// Writes provider entries.
    async fn write_providers(&self, entries: &[ProviderEntry], mode: WriteMode) -> Result<()>;

    /// Returns the stored rows of a symbol dated on or after `since`, ascending by date.
    async fn prices(&self, symbol: &Symbol, since: Option<NaiveDate>) -> Result<Vec<PriceRow>>;

    /// Returns the latest stored date of a symbol, `None` when it has no rows.
    async fn latest_date(&self, symbol: &Symbol) -> Result<Option<NaiveDate>>;

    /// Returns the number of stored rows of a symbol.
    async fn row_count(&self, symbol: &Symbol) -> Result<usize>;

    /// Writes price rows and returns the number written.
    async fn write_prices(&self, rows: &[PriceRow], mode: WriteMode) -> Result<usize>;
}
