//! Provider catalog import.
//!
//! The catalog is a CSV file with the headers
//! `symbol,description,source,host,comparison`; `comparison` may be omitted.
//! Importing replaces the whole `provider` table.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use prices_core::{Host, PriceError, PriceStore, ProviderEntry, Result, WriteMode};

#[derive(Debug, Deserialize)]
struct CatalogRecord {
    symbol: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    source: String,
    host: String,
    #[serde(default)]
    comparison: String,
}

/// Reads catalog entries from CSV.
///
/// An unrecognized host fails with [`PriceError::UnknownProvider`], a
/// malformed row with [`PriceError::Parse`].
pub fn read_catalog<R: Read>(reader: R) -> Result<Vec<ProviderEntry>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut entries = Vec::new();
    for (idx, result) in reader.deserialize::<CatalogRecord>().enumerate() {
        // Header is line 1
        let line = idx + 2;
        let record =
            result.map_err(|e| PriceError::Parse(format!("Catalog line {line}: {e}")))?;
        if record.symbol.is_empty() {
            return Err(PriceError::Parse(format!("Catalog line {line}: empty symbol")));
        }

        let host: Host = record.host.parse()?;
        entries.push(
            ProviderEntry::new(record.symbol, host)
                .with_description(record.description)
                .with_source(record.source)
                .with_comparison(record.comparison),
        );
    }

    Ok(entries)
}

/// Reads catalog entries from a CSV file.
pub fn load_catalog(path: impl AsRef<Path>) -> Result<Vec<ProviderEntry>> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| PriceError::Other(format!("Failed to open catalog '{}': {e}", path.display())))?;
    read_catalog(file)
}

/// Replaces the provider table with the catalog at `path`.
pub async fn replace_providers(
    store: &dyn PriceStore,
    path: impl AsRef<Path>,
) -> Result<Vec<ProviderEntry>> {
    let path = path.as_ref();
    let entries = load_catalog(path)?;
    store.write_providers(&entries, WriteMode::Replace).await?;
    info!("Replaced provider with content from {}", path.display());
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use prices_core::Symbol;
    use prices_store::InMemoryStore;

    const CATALOG: &str = "\
symbol,description,source,host,comparison
WGC/GOLD_DAILY_USD,Gold price in USD,Value,quandl,Gold
GLD,SPDR Gold Shares,Close,yahoo,Gold
 FRED/DGS10 , US 10 year treasury ,Value, quandl ,10Year
";

    #[test]
    fn test_read_catalog() {
        let entries = read_catalog(CATALOG.as_bytes()).unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].host, Host::Quandl);
        assert_eq!(entries[1].symbol, Symbol::new("GLD"));
        assert_eq!(entries[1].source, "Close");
        assert_eq!(entries[2].symbol, Symbol::new("FRED/DGS10"));
        assert_eq!(entries[2].description, "US 10 year treasury");
        assert_eq!(entries[2].comparison, "10Year");
    }

    #[test]
    fn test_comparison_column_optional() {
        let entries =
            read_catalog("symbol,description,source,host\n^GSPC,S&P 500,Close,yahoo\n".as_bytes())
                .unwrap();
        assert_eq!(entries[0].comparison, "");
    }

    #[test]
    fn test_unknown_host() {
        let err = read_catalog("symbol,host\nAAPL,bloomberg\n".as_bytes()).unwrap_err();
        assert!(matches!(err, PriceError::UnknownProvider(_)));
    }

    #[test]
    fn test_missing_host_is_parse_error() {
        let err = read_catalog("symbol,description\nGLD,Gold\n".as_bytes()).unwrap_err();
        assert!(matches!(err, PriceError::Parse(_)));
    }

    #[tokio::test]
    async fn test_replace_providers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("provider.csv");
        std::fs::write(&path, CATALOG).unwrap();

        let store = InMemoryStore::with_providers(vec![ProviderEntry::new("OLD", Host::Yahoo)]);
        replace_providers(&store, &path).await.unwrap();

        let providers = store.providers().await.unwrap();
        assert_eq!(providers.len(), 3);
        assert!(providers.iter().all(|p| p.symbol != Symbol::new("OLD")));
    }
}
