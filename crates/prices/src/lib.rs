#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/prices/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Historical price collection and return analytics.
//!
//! This crate ties the price pipeline together. It re-exports the core types,
//! the stores and the provider sources, and adds:
//!
//! - [`ProviderGateway`] - dispatch of fetches to a source by host id
//! - [`next_fetch_date`] - incremental cursor over stored prices
//! - [`Updater`] - provider by provider, symbol by symbol update runs
//! - [`ReturnEngine`] - resampling, percent change, total and real return
//! - [`pivot`] / [`combine`] - date aligned wide tables
//! - catalog import, reports, comparison tables and CSV export
//!
//! # Features
//!
//! - `yahoo` - Yahoo Finance source
//! - `quandl` - Quandl (Nasdaq Data Link) source
//! - `store-sqlite` - SQLite-backed store

// Core types and traits
pub use prices_core::*;

// Stores
#[cfg(feature = "store-sqlite")]
pub use prices_store::SqliteStore;
pub use prices_store::InMemoryStore;

// Sources
#[cfg(feature = "quandl")]
pub use prices_quandl::QuandlSource;
#[cfg(feature = "yahoo")]
pub use prices_yahoo::YahooSource;

/// Provider catalog import.
pub mod catalog;
/// Date aligned series tables.
pub mod combine;
/// Comparison tables built from stored series.
pub mod compare;
/// Incremental fetch cursor.
pub mod cursor;
/// CSV export of wide tables.
pub mod export;
/// Source dispatch by host id.
pub mod gateway;
/// Per-symbol storage summary.
pub mod report;
/// Resampling and return computation.
pub mod returns;
/// File-based settings.
pub mod settings;
/// Update orchestration.
pub mod updater;

pub use catalog::{load_catalog, read_catalog, replace_providers};
pub use combine::{Observation, Series, WideTable, combine, pivot};
pub use compare::{
    RealReturnSpec, compare_group, compare_real_returns, comparison_groups, country_assets,
    total_return_table,
};
pub use cursor::{next_business_day, next_fetch_date};
pub use export::export_csv;
pub use gateway::{LoggedSource, ProviderGateway};
pub use report::{SymbolReport, report};
pub use returns::{
    Aggregation, RealReturnRow, ReturnEngine, ReturnRow, compute_return, real_return, resample,
};
pub use settings::Settings;
pub use updater::{UpdateSummary, Updater};
