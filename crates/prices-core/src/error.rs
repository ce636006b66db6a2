//! Error types for price operations.
//!
//! This module defines [`PriceError`] which covers every failure of the
//! pipeline: fetching, normalizing, storing and deriving price series.

use chrono::NaiveDate;
use thiserror::Error;

/// Errors that can occur during price operations.
#[derive(Error, Debug)]
pub enum PriceError {
    /// The provider frame could not be mapped to `(date, symbol, price)`.
    #[error("Normalization error: {0}")]
    Normalization(String),

    /// The provider identifier is not one of the known hosts.
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// Two rows share the same date and key during pivot or alignment.
    #[error("Duplicate key: {key} on {date}")]
    DuplicateKey {
        /// Date shared by the duplicate rows.
        date: NaiveDate,
        /// Column key (symbol or label) shared by the duplicate rows.
        key: String,
    },

    /// The host is known but no source has been registered for it.
    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    /// Network-related errors (connection failures, timeouts, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// Rate limit exceeded by a provider.
    #[error("Rate limited by {provider}: retry after {retry_after:?}")]
    RateLimited {
        /// The provider that rate limited the request.
        provider: String,
        /// Suggested time to wait before retrying.
        retry_after: Option<std::time::Duration>,
    },

    /// The requested symbol was not found upstream.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// Error parsing data from a provider or a catalog file.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Error interacting with the store.
    #[error("Storage error: {0}")]
    Storage(String),

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

/// Result type alias using [`PriceError`].
pub type Result<T> = std::result::Result<T, PriceError>;
