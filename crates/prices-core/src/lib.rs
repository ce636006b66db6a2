#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/prices/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for price collection.
//!
//! This crate provides the foundational abstractions of the price pipeline:
//!
//! - [`PriceSource`](source::PriceSource) - Upstream provider returning raw frames
//! - [`PriceStore`](store::PriceStore) - Relational storage for prices and the provider catalog
//! - [`normalize`](normalize::normalize) - Raw provider frame to canonical rows
//! - [`Period`](period::Period) - Resampling periods

/// Error types for price operations.
pub mod error;
/// Schema normalization of provider frames.
pub mod normalize;
/// Resampling period definitions.
pub mod period;
/// Upstream source trait.
pub mod source;
/// Storage trait and write modes.
pub mod store;
/// Core data types (Symbol, Host, PriceRow, ProviderEntry).
pub mod types;

// Re-export commonly used items at crate root
pub use error::{PriceError, Result};
pub use normalize::{normalize, rows_to_frame};
pub use period::Period;
pub use source::PriceSource;
pub use store::{PriceStore, WriteMode};
pub use types::{Host, PriceRow, ProviderEntry, Symbol};
