//! Update orchestration: provider by provider, symbol by symbol.
//!
//! Each symbol goes through cursor → fetch → normalize → append. Runs are
//! sequential so a symbol's cursor always sees the previous write.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tracing::{debug, info, instrument, warn};

use prices_core::{Host, PriceRow, PriceStore, Result, Symbol, WriteMode, normalize};

use crate::{cursor::next_fetch_date, gateway::ProviderGateway};

/// Outcome of an [`Updater::update_all`] run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateSummary {
    /// Symbols that received new rows, with the number of rows written.
    pub updated: Vec<(Symbol, usize)>,
    /// Symbols skipped because their cursor is on or after today.
    pub current: Vec<Symbol>,
    /// Symbols fetched successfully but with no new rows.
    pub empty: Vec<Symbol>,
    /// Symbols whose fetch, normalization or write failed.
    pub failed: Vec<(Symbol, String)>,
}

impl UpdateSummary {
    /// Total number of rows written.
    #[must_use]
    pub fn rows_written(&self) -> usize {
        self.updated.iter().map(|(_, n)| n).sum()
    }

    /// Whether no symbol failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for UpdateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} updated ({} rows), {} current, {} empty, {} failed",
            self.updated.len(),
            self.rows_written(),
            self.current.len(),
            self.empty.len(),
            self.failed.len()
        )
    }
}

/// What happened to one symbol.
enum Refresh {
    Current,
    Empty,
    Written(Vec<PriceRow>),
}

/// Keeps stored prices current with the upstream sources.
pub struct Updater {
    store: Arc<dyn PriceStore>,
    gateway: ProviderGateway,
    today: Option<NaiveDate>,
}

impl fmt::Debug for Updater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Updater")
            .field("gateway", &self.gateway)
            .field("today", &self.today)
            .finish()
    }
}

impl Updater {
    /// Create an updater writing to `store` and fetching through `gateway`.
    #[must_use]
    pub fn new(store: Arc<dyn PriceStore>, gateway: ProviderGateway) -> Self {
        Self {
            store,
            gateway,
            today: None,
        }
    }

    /// Pin "today" instead of reading the local calendar date.
    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// The store this updater writes to.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn PriceStore> {
        &self.store
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Update every symbol of the provider catalog.
    ///
    /// Hosts are visited in first-seen catalog order. Every host is resolved
    /// before the first fetch, so a host without a registered source aborts
    /// the run. Per-symbol failures are recorded in the summary and the run
    /// moves on.
    #[instrument(skip(self))]
    pub async fn update_all(&self) -> Result<UpdateSummary> {
        let entries = self.store.providers().await?;

        let mut hosts: Vec<Host> = Vec::new();
        for entry in &entries {
            if !hosts.contains(&entry.host) {
                hosts.push(entry.host);
            }
        }
        for host in &hosts {
            self.gateway.source(*host)?;
        }

        let today = self.today();
        let mut summary = UpdateSummary::default();

        for (host_index, host) in hosts.iter().enumerate() {
            info!("Host #{} {}", host_index + 1, host);

            let symbols = entries.iter().filter(|e| e.host == *host);
            for (index, entry) in symbols.enumerate() {
                let symbol = &entry.symbol;
                debug!(index = index + 1, host = %host, symbol = %symbol, "Updating symbol");

                match self.refresh(*host, symbol, today).await {
                    Ok(Refresh::Current) => summary.current.push(symbol.clone()),
                    Ok(Refresh::Empty) => summary.empty.push(symbol.clone()),
                    Ok(Refresh::Written(rows)) => {
                        summary.updated.push((symbol.clone(), rows.len()));
                    }
                    Err(e) => {
                        warn!(host = %host, symbol = %symbol, error = %e, "Update failed, continuing");
                        summary.failed.push((symbol.clone(), e.to_string()));
                    }
                }
            }
        }

        info!("Update finished: {}", summary);
        Ok(summary)
    }

    /// Update a single symbol from the source identified by `provider_id`.
    ///
    /// Returns the rows written, empty when the symbol was already current or
    /// the source had nothing new.
    #[instrument(skip(self), err)]
    pub async fn update_symbol(&self, provider_id: &str, symbol: &Symbol) -> Result<Vec<PriceRow>> {
        let host: Host = provider_id.parse()?;
        self.gateway.source(host)?;

        match self.refresh(host, symbol, self.today()).await? {
            Refresh::Written(rows) => Ok(rows),
            Refresh::Current | Refresh::Empty => Ok(Vec::new()),
        }
    }

    async fn refresh(&self, host: Host, symbol: &Symbol, today: NaiveDate) -> Result<Refresh> {
        let cursor = next_fetch_date(self.store.as_ref(), symbol).await?;

        if let Some(next_day) = cursor {
            if next_day >= today {
                debug!(symbol = %symbol, next_day = %next_day, "Already current");
                return Ok(Refresh::Current);
            }
        }

        let frame = self.gateway.fetch_from(host, symbol, cursor).await?;
        let mut rows = normalize(&frame, symbol)?;

        // Sources may answer a weekend request with the previous session
        if let Some(next_day) = cursor {
            rows.retain(|row| row.date >= next_day);
        }
        // Today's session is unfinished; the next run fetches its close
        rows.retain(|row| row.date < today);

        let repeated = keep_last_per_date(&mut rows);
        if repeated > 0 {
            debug!(symbol = %symbol, repeated, "Dropped repeated dates from fetched rows");
        }

        if rows.is_empty() {
            info!(symbol = %symbol, since = ?cursor, "Latest dataset empty");
            return Ok(Refresh::Empty);
        }

        let written = self.store.write_prices(&rows, WriteMode::Append).await?;
        info!(symbol = %symbol, since = ?cursor, rows = written, "Stored new rows");
        Ok(Refresh::Written(rows))
    }
}

/// Keeps the last row of each date, in order. Returns how many were dropped.
fn keep_last_per_date(rows: &mut Vec<PriceRow>) -> usize {
    let before = rows.len();
    let mut seen = HashSet::with_capacity(before);
    rows.reverse();
    rows.retain(|row| seen.insert(row.date));
    rows.reverse();
    before - rows.len()
}
