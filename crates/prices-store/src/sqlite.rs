//! SQLite-based store implementation.

use async_trait::async_trait;
use chrono::NaiveDate;
use prices_core::{
    Host, PriceError, PriceRow, PriceStore, ProviderEntry, Result, Symbol, WriteMode,
};
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, instrument};

fn storage_error(e: rusqlite::Error) -> PriceError {
    PriceError::Storage(e.to_string())
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| PriceError::Parse(format!("Invalid stored date {raw:?}: {e}")))
}

/// SQLite-based store for prices and the provider catalog.
///
/// Data lives in two tables, `price(symbol, date, price)` and
/// `provider(symbol, description, source, host, comparison)`, with dates kept
/// as `YYYY-MM-DD` text. The price table has no primary key.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a SQLite store at the given path.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or schema creation fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(storage_error)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory SQLite store.
    ///
    /// Useful for testing; data is lost when the store is dropped.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(storage_error)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| PriceError::Storage(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS price (
                symbol TEXT NOT NULL,
                date TEXT NOT NULL,
                price REAL NOT NULL
            )",
            [],
        )
        .map_err(storage_error)?;

        // Lookup index only; uniqueness is kept by the update cursor
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_price_symbol_date ON price(symbol, date)",
            [],
        )
        .map_err(storage_error)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS provider (
                symbol TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                source TEXT NOT NULL DEFAULT '',
                host TEXT NOT NULL,
                comparison TEXT NOT NULL DEFAULT ''
            )",
            [],
        )
        .map_err(storage_error)?;

        debug!("SQLite store schema initialized");
        Ok(())
    }
}

#[async_trait]
impl PriceStore for SqliteStore {
    #[instrument(skip(self))]
    async fn providers(&self) -> Result<Vec<ProviderEntry>> {
        let raw = {
            let conn = self
                .conn
                .lock()
                .map_err(|e| PriceError::Storage(e.to_string()))?;

            let mut stmt = conn
                .prepare(
                    "SELECT symbol, description, source, host, comparison
                     FROM provider
                     ORDER BY rowid ASC",
                )
                .map_err(storage_error)?;

            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                })
                .map_err(storage_error)?;

            rows.collect::<std::result::Result<Vec<_>, _>>()
                .map_err(storage_error)?
        };

        let mut entries = Vec::with_capacity(raw.len());
        for (symbol, description, source, host, comparison) in raw {
            entries.push(ProviderEntry {
                symbol: Symbol::new(symbol),
                description,
                source,
                host: host.parse::<Host>()?,
                comparison,
            });
        }

        debug!("Loaded {} provider entries", entries.len());
        Ok(entries)
    }

    #[instrument(skip(self, entries), fields(count = entries.len()))]
    async fn write_providers(&self, entries: &[ProviderEntry], mode: WriteMode) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| PriceError::Storage(e.to_string()))?;
        let tx = conn.unchecked_transaction().map_err(storage_error)?;

        if mode == WriteMode::Replace {
            tx.execute("DELETE FROM provider", []).map_err(storage_error)?;
        }

        for entry in entries {
            tx.execute(
                "INSERT INTO provider (symbol, description, source, host, comparison)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    entry.symbol.as_str(),
                    entry.description,
                    entry.source,
                    entry.host.as_str(),
                    entry.comparison
                ],
            )
            .map_err(storage_error)?;
        }

        tx.commit().map_err(storage_error)?;
        debug!("Stored {} provider entries", entries.len());
        Ok(())
    }

    #[instrument(skip(self), fields(symbol = %symbol))]
    async fn prices(&self, symbol: &Symbol, since: Option<NaiveDate>) -> Result<Vec<PriceRow>> {
        let since_str = since.map(|d| d.to_string()).unwrap_or_default();

        let raw = {
            let conn = self
                .conn
                .lock()
                .map_err(|e| PriceError::Storage(e.to_string()))?;

            let mut stmt = conn
                .prepare(
                    "SELECT date, price FROM price
                     WHERE symbol = ?1 AND date >= ?2
                     ORDER BY date ASC",
                )
                .map_err(storage_error)?;

            let rows = stmt
                .query_map(params![symbol.as_str(), since_str], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
                })
                .map_err(storage_error)?;

            rows.collect::<std::result::Result<Vec<_>, _>>()
                .map_err(storage_error)?
        };

        let rows = raw
            .into_iter()
            .map(|(date, price)| Ok(PriceRow::new(parse_date(&date)?, symbol.clone(), price)))
            .collect::<Result<Vec<_>>>()?;

        debug!("Found {} stored rows", rows.len());
        Ok(rows)
    }

    #[instrument(skip(self), fields(symbol = %symbol))]
    async fn latest_date(&self, symbol: &Symbol) -> Result<Option<NaiveDate>> {
        let latest = {
            let conn = self
                .conn
                .lock()
                .map_err(|e| PriceError::Storage(e.to_string()))?;

            conn.query_row(
                "SELECT MAX(date) FROM price WHERE symbol = ?1",
                params![symbol.as_str()],
                |row| row.get::<_, Option<String>>(0),
            )
            .map_err(storage_error)?
        };

        latest.as_deref().map(parse_date).transpose()
    }

    async fn row_count(&self, symbol: &Symbol) -> Result<usize> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| PriceError::Storage(e.to_string()))?;

        let count = conn
            .query_row(
                "SELECT COUNT(*) FROM price WHERE symbol = ?1",
                params![symbol.as_str()],
                |row| row.get::<_, i64>(0),
            )
            .map_err(storage_error)?;

        Ok(count as usize)
    }

    #[instrument(skip(self, rows), fields(count = rows.len()))]
    async fn write_prices(&self, rows: &[PriceRow], mode: WriteMode) -> Result<usize> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| PriceError::Storage(e.to_string()))?;
        let tx = conn.unchecked_transaction().map_err(storage_error)?;

        if mode == WriteMode::Replace {
            tx.execute("DELETE FROM price", []).map_err(storage_error)?;
        }

        {
            let mut stmt = tx
                .prepare("INSERT INTO price (symbol, date, price) VALUES (?1, ?2, ?3)")
                .map_err(storage_error)?;
            for row in rows {
                stmt.execute(params![row.symbol.as_str(), row.date.to_string(), row.price])
                    .map_err(storage_error)?;
            }
        }

        tx.commit().map_err(storage_error)?;
        debug!("Stored {} price rows", rows.len());
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_sqlite_store_initialization() {
        let store = SqliteStore::in_memory();
        assert!(store.is_ok());
    }

    #[tokio::test]
    async fn test_price_rows() {
        let store = SqliteStore::in_memory().unwrap();
        let symbol = Symbol::new("FRED/DGS10");

        // Initially no data
        assert!(store.latest_date(&symbol).await.unwrap().is_none());
        assert_eq!(store.row_count(&symbol).await.unwrap(), 0);

        let rows = vec![
            PriceRow::new(date(2017, 9, 1), "FRED/DGS10", 2.12),
            PriceRow::new(date(2017, 9, 5), "FRED/DGS10", 2.07),
            PriceRow::new(date(2017, 9, 1), "GLD", 125.0),
        ];
        store.write_prices(&rows, WriteMode::Append).await.unwrap();

        let stored = store.prices(&symbol, None).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1], PriceRow::new(date(2017, 9, 5), "FRED/DGS10", 2.07));
        assert_eq!(store.latest_date(&symbol).await.unwrap(), Some(date(2017, 9, 5)));
        assert_eq!(store.row_count(&symbol).await.unwrap(), 2);

        let since = store.prices(&symbol, Some(date(2017, 9, 5))).await.unwrap();
        assert_eq!(since.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicates_are_not_rejected() {
        let store = SqliteStore::in_memory().unwrap();
        let row = PriceRow::new(date(2017, 9, 1), "GLD", 125.0);

        store.write_prices(&[row.clone()], WriteMode::Append).await.unwrap();
        store.write_prices(&[row], WriteMode::Append).await.unwrap();

        assert_eq!(store.row_count(&Symbol::new("GLD")).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_replace_providers() {
        let store = SqliteStore::in_memory().unwrap();

        let first = vec![
            ProviderEntry::new("GLD", Host::Yahoo).with_comparison("Gold"),
            ProviderEntry::new("WGC/GOLD_DAILY_USD", Host::Quandl).with_comparison("Gold"),
        ];
        store.write_providers(&first, WriteMode::Append).await.unwrap();
        assert_eq!(store.providers().await.unwrap(), first);

        let second = vec![ProviderEntry::new("RATEINF/CPI_GBR", Host::Quandl)
            .with_description("UK CPI")
            .with_source("Value")
            .with_comparison("Inflation")];
        store.write_providers(&second, WriteMode::Replace).await.unwrap();
        assert_eq!(store.providers().await.unwrap(), second);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices.db");

        {
            let store = SqliteStore::new(&path).unwrap();
            store
                .write_prices(
                    &[PriceRow::new(date(2017, 9, 1), "GLD", 125.0)],
                    WriteMode::Append,
                )
                .await
                .unwrap();
        }

        let store = SqliteStore::new(&path).unwrap();
        assert_eq!(
            store.latest_date(&Symbol::new("GLD")).await.unwrap(),
            Some(date(2017, 9, 1))
        );
    }
}
