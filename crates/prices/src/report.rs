//! Per-symbol storage summary.

use std::fmt;

use chrono::NaiveDate;

use prices_core::{PriceStore, Result, Symbol};

/// Last stored date and row count of one catalog symbol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymbolReport {
    /// 1-based position in the catalog.
    pub index: usize,
    /// Catalog symbol.
    pub symbol: Symbol,
    /// Latest stored date, `None` when nothing is stored yet.
    pub last_date: Option<NaiveDate>,
    /// Number of stored rows.
    pub count: usize,
}

impl fmt::Display for SymbolReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Index: {} Symbol: {} Last date: ", self.index, self.symbol)?;
        match self.last_date {
            Some(date) => write!(f, "{date}")?,
            None => write!(f, "-")?,
        }
        write!(f, " Count: {}", self.count)
    }
}

/// Summarizes every catalog symbol.
///
/// Useful just before an update to see when each symbol was last refreshed.
pub async fn report(store: &dyn PriceStore) -> Result<Vec<SymbolReport>> {
    let mut out = Vec::new();
    for (idx, entry) in store.providers().await?.into_iter().enumerate() {
        let last_date = store.latest_date(&entry.symbol).await?;
        let count = store.row_count(&entry.symbol).await?;
        out.push(SymbolReport {
            index: idx + 1,
            symbol: entry.symbol,
            last_date,
            count,
        });
    }
    Ok(out)
}
