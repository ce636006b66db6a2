//! Core data types for price collection.
//!
//! This module defines the canonical data model:
//!
//! - [`Symbol`] - Provider-specific series identifier
//! - [`Host`] - Upstream API serving a symbol
//! - [`ProviderEntry`] - Catalog row linking a symbol to its host and comparison group
//! - [`PriceRow`] - One stored observation `(date, symbol, price)`

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PriceError;

/// A provider-specific series identifier.
///
/// Quandl dataset codes (`FRED/DGS10`) and Yahoo tickers (`^GSPC`) are
/// case-sensitive upstream, so symbols are only trimmed, never case-folded.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    /// Creates a new symbol, trimming surrounding whitespace.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim().to_string())
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Symbol {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Upstream API that serves a symbol.
///
/// The set is closed: adding a source means adding a variant here and a
/// crate implementing [`PriceSource`](crate::source::PriceSource).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Host {
    /// Quandl / Nasdaq Data Link datasets.
    Quandl,
    /// Yahoo Finance chart data.
    Yahoo,
}

impl Host {
    /// All known hosts.
    pub const ALL: [Self; 2] = [Self::Quandl, Self::Yahoo];

    /// Returns the identifier stored in the provider table.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Quandl => "quandl",
            Self::Yahoo => "yahoo",
        }
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Host {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "quandl" => Ok(Self::Quandl),
            "yahoo" => Ok(Self::Yahoo),
            other => Err(PriceError::UnknownProvider(other.to_string())),
        }
    }
}

/// One row of the provider catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEntry {
    /// Symbol as understood by the host.
    pub symbol: Symbol,
    /// Human readable description.
    pub description: String,
    /// Upstream column format (e.g. "Value", "Close").
    pub source: String,
    /// Host serving the symbol.
    pub host: Host,
    /// Comparison group used for grouped charts (e.g. "Gold", "Inflation").
    pub comparison: String,
}

impl ProviderEntry {
    /// Creates a catalog entry with an empty description, source and comparison group.
    #[must_use]
    pub fn new(symbol: impl Into<Symbol>, host: Host) -> Self {
        Self {
            symbol: symbol.into(),
            description: String::new(),
            source: String::new(),
            host,
            comparison: String::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the upstream column format.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Sets the comparison group.
    #[must_use]
    pub fn with_comparison(mut self, comparison: impl Into<String>) -> Self {
        self.comparison = comparison.into();
        self
    }
}

/// A single stored price observation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    /// Observation date (no time of day).
    pub date: NaiveDate,
    /// Symbol the price belongs to.
    pub symbol: Symbol,
    /// Close, settle or index value depending on the provider.
    pub price: f64,
}

impl PriceRow {
    /// Creates a new price row.
    #[must_use]
    pub fn new(date: NaiveDate, symbol: impl Into<Symbol>, price: f64) -> Self {
        Self {
            date,
            symbol: symbol.into(),
            price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_keeps_case() {
        let symbol = Symbol::new(" RATEINF/CPI_GBR ");
        assert_eq!(symbol.as_str(), "RATEINF/CPI_GBR");
        assert_eq!(Symbol::new("^gspc").as_str(), "^gspc");
    }

    #[test]
    fn test_host_round_trip() {
        for host in Host::ALL {
            assert_eq!(host.as_str().parse::<Host>().unwrap(), host);
        }
    }

    #[test]
    fn test_unknown_host() {
        let err = "google".parse::<Host>().unwrap_err();
        assert!(matches!(err, PriceError::UnknownProvider(ref h) if h == "google"));
    }

    #[test]
    fn test_provider_entry_builder() {
        let entry = ProviderEntry::new("GLD", Host::Yahoo)
            .with_description("SPDR Gold Shares")
            .with_source("Close")
            .with_comparison("Gold");
        assert_eq!(entry.symbol.as_str(), "GLD");
        assert_eq!(entry.comparison, "Gold");
    }
}
