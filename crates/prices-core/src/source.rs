//! Upstream source trait.
//!
//! A [`PriceSource`] returns the provider's own tabular output: column names
//! and date representation are whatever the upstream API uses. Mapping onto
//! canonical rows is the job of [`normalize`](crate::normalize::normalize).

use async_trait::async_trait;
use chrono::NaiveDate;
use polars::prelude::DataFrame;
use std::fmt::Debug;

use crate::{
    error::Result,
    types::{Host, Symbol},
};

/// Upstream provider of historical price series.
#[async_trait]
pub trait PriceSource: Send + Sync + Debug {
    /// Returns the host this source serves.
    fn host(&self) -> Host;

    /// Returns a description of this source.
    fn description(&self) -> &str;

    /// Fetches the raw frame for a symbol.
    ///
    /// `since = None` requests the full available history; otherwise only rows
    /// dated on or after `since` are requested.
    async fn fetch(&self, symbol: &Symbol, since: Option<NaiveDate>) -> Result<DataFrame>;
}
