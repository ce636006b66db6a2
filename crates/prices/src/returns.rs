//! Resampling, percent change, total return and real return.
//!
//! The free functions work on in-memory series of one symbol; [`ReturnEngine`]
//! reads the series from a store first.
//!
//! # Example
//!
//! ```rust,ignore
//! use prices::{Period, ReturnEngine, Symbol};
//!
//! let engine = ReturnEngine::new(store.as_ref());
//! let rows = engine
//!     .returns(&Symbol::new("^GSPC"), start, Period::Monthly, 12)
//!     .await?;
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use prices_core::{
    PriceError, PriceRow, PriceStore, Result, Symbol,
    period::{ANNUAL_PERIODS, Period},
};

/// How observations inside one resampling bucket are reduced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Aggregation {
    /// Last observation of the bucket.
    #[default]
    Last,
    /// Arithmetic mean of the bucket.
    Mean,
}

/// A price with its trailing percent change and cumulative total return.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReturnRow {
    /// Observation date.
    pub date: NaiveDate,
    /// Symbol of the series.
    pub symbol: Symbol,
    /// Price on `date`.
    pub price: f64,
    /// Percent change over the lookback window.
    pub percent_change: f64,
    /// Compounded percent return since the first output row.
    pub total_return: f64,
}

/// Bond yield, annual inflation and their difference on one date.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RealReturnRow {
    /// Observation date.
    pub date: NaiveDate,
    /// Month-end bond yield.
    pub bond: Option<f64>,
    /// Annual percent change of the price index.
    pub inflation: Option<f64>,
    /// `bond - inflation` where both exist.
    pub real_return: Option<f64>,
}

/// Checks the series holds one symbol and returns it sorted by date.
fn single_symbol(series: &[PriceRow]) -> Result<Vec<PriceRow>> {
    if let Some(first) = series.first() {
        if let Some(other) = series.iter().find(|r| r.symbol != first.symbol) {
            return Err(PriceError::InvalidParameter(format!(
                "Series mixes symbols {} and {}",
                first.symbol, other.symbol
            )));
        }
    }

    let mut sorted = series.to_vec();
    sorted.sort_by_key(|r| r.date);
    Ok(sorted)
}

/// Buckets a single-symbol series into `period`, labelling each bucket with
/// its period end date. Empty buckets are not emitted.
pub fn resample(
    series: &[PriceRow],
    period: Period,
    aggregation: Aggregation,
) -> Result<Vec<PriceRow>> {
    let sorted = single_symbol(series)?;
    let mut out: Vec<PriceRow> = Vec::new();
    let mut count = 0usize;

    for row in sorted {
        let bucket = period.bucket_end(row.date);
        match out.last_mut() {
            Some(last) if last.date == bucket => {
                count += 1;
                last.price = match aggregation {
                    Aggregation::Last => row.price,
                    // Running mean
                    Aggregation::Mean => last.price + (row.price - last.price) / count as f64,
                };
            }
            _ => {
                count = 1;
                out.push(PriceRow {
                    date: bucket,
                    symbol: row.symbol,
                    price: row.price,
                });
            }
        }
    }

    Ok(out)
}

/// Computes trailing percent change and cumulative total return.
///
/// `percent_change[t] = (price[t] / price[t - n] - 1) * 100` with
/// `n = period_length`. The first `n` rows lack a full lookback and are
/// dropped. `total_return` compounds the one-period changes of the retained
/// rows and is 0 on the first of them.
pub fn compute_return(series: &[PriceRow], period_length: usize) -> Result<Vec<ReturnRow>> {
    if period_length == 0 {
        return Err(PriceError::InvalidParameter(
            "period_length must be at least 1".to_string(),
        ));
    }

    let sorted = single_symbol(series)?;
    if sorted.len() <= period_length {
        return Ok(Vec::new());
    }

    let mut out = Vec::with_capacity(sorted.len() - period_length);
    let mut growth = 1.0;

    for t in period_length..sorted.len() {
        let row = &sorted[t];
        if t > period_length {
            growth *= row.price / sorted[t - 1].price;
        }
        out.push(ReturnRow {
            date: row.date,
            symbol: row.symbol.clone(),
            price: row.price,
            percent_change: (row.price / sorted[t - period_length].price - 1.0) * 100.0,
            total_return: (growth - 1.0) * 100.0,
        });
    }

    Ok(out)
}

/// Derives the real return of a bond against a consumer price index.
///
/// The bond is resampled to month ends (last value). The index always goes
/// through [`compute_return`] with `period_length` first, so the bond yield is
/// compared with annual inflation and never with the raw index level. Dates
/// are outer-joined.
pub fn real_return(
    bond: &[PriceRow],
    cpi: &[PriceRow],
    period_length: usize,
) -> Result<Vec<RealReturnRow>> {
    let bond = resample(bond, Period::Monthly, Aggregation::Last)?;
    let inflation = compute_return(cpi, period_length)?;

    let mut out = Vec::with_capacity(bond.len().max(inflation.len()));
    let (mut i, mut j) = (0, 0);

    while i < bond.len() || j < inflation.len() {
        let b = bond.get(i);
        let c = inflation.get(j);
        let (date, bond_value, inflation_value) = match (b, c) {
            (Some(b), Some(c)) if b.date == c.date => {
                i += 1;
                j += 1;
                (b.date, Some(b.price), Some(c.percent_change))
            }
            (Some(b), Some(c)) if b.date < c.date => {
                i += 1;
                (b.date, Some(b.price), None)
            }
            (Some(b), None) => {
                i += 1;
                (b.date, Some(b.price), None)
            }
            (_, Some(c)) => {
                j += 1;
                (c.date, None, Some(c.percent_change))
            }
            (None, None) => break,
        };

        out.push(RealReturnRow {
            date,
            bond: bond_value,
            inflation: inflation_value,
            real_return: bond_value.zip(inflation_value).map(|(b, c)| b - c),
        });
    }

    Ok(out)
}

/// Store-backed return computations.
pub struct ReturnEngine<'a> {
    store: &'a dyn PriceStore,
}

impl std::fmt::Debug for ReturnEngine<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReturnEngine").finish_non_exhaustive()
    }
}

impl<'a> ReturnEngine<'a> {
    /// Create an engine reading from `store`.
    #[must_use]
    pub fn new(store: &'a dyn PriceStore) -> Self {
        Self { store }
    }

    /// Stored rows of `symbol` dated on or after `start`.
    pub async fn prices(&self, symbol: &Symbol, start: Option<NaiveDate>) -> Result<Vec<PriceRow>> {
        let rows = self.store.prices(symbol, start).await?;
        debug!(symbol = %symbol, start = ?start, rows = rows.len(), "Loaded prices");
        Ok(rows)
    }

    /// Last observation per period.
    pub async fn resample(
        &self,
        symbol: &Symbol,
        start: Option<NaiveDate>,
        period: Period,
    ) -> Result<Vec<PriceRow>> {
        resample(&self.prices(symbol, start).await?, period, Aggregation::Last)
    }

    /// Mean observation per period.
    pub async fn aggregate_mean(
        &self,
        symbol: &Symbol,
        start: Option<NaiveDate>,
        period: Period,
    ) -> Result<Vec<PriceRow>> {
        resample(&self.prices(symbol, start).await?, period, Aggregation::Mean)
    }

    /// Resample then compute returns over `period_length` periods.
    pub async fn returns(
        &self,
        symbol: &Symbol,
        start: Option<NaiveDate>,
        period: Period,
        period_length: usize,
    ) -> Result<Vec<ReturnRow>> {
        compute_return(&self.resample(symbol, start, period).await?, period_length)
    }

    /// Real return of `bond` against the annual inflation of `cpi`.
    pub async fn real_return(
        &self,
        bond: &Symbol,
        cpi: &Symbol,
        start: Option<NaiveDate>,
    ) -> Result<Vec<RealReturnRow>> {
        let bond_rows = self.prices(bond, start).await?;
        let cpi_rows = self.prices(cpi, start).await?;
        real_return(&bond_rows, &cpi_rows, ANNUAL_PERIODS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prices_core::WriteMode;
    use prices_store::InMemoryStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn month_end(i: usize) -> NaiveDate {
        Period::Monthly.bucket_end(date(2016 + (i / 12) as i32, (i % 12) as u32 + 1, 1))
    }

    fn monthly(symbol: &str, prices: &[f64]) -> Vec<PriceRow> {
        prices
            .iter()
            .enumerate()
            .map(|(i, p)| PriceRow::new(month_end(i), symbol, *p))
            .collect()
    }

    const SERIES: [f64; 13] = [
        100.0, 102.0, 101.0, 105.0, 108.0, 110.0, 107.0, 103.0, 99.0, 102.0, 104.0, 106.0, 109.0,
    ];

    #[test]
    fn test_annual_change_of_thirteen_points() {
        let rows = compute_return(&monthly("^GSPC", &SERIES), 12).unwrap();

        assert_eq!(rows.len(), 1);
        assert!((rows[0].percent_change - 9.0).abs() < 1e-9);
        assert_eq!(rows[0].total_return, 0.0);
        assert_eq!(rows[0].date, month_end(12));
    }

    #[test]
    fn test_output_length_drops_lookback() {
        let series = monthly("GLD", &SERIES);
        for n in [1, 3, 12, 13, 20] {
            let rows = compute_return(&series, n).unwrap();
            assert_eq!(rows.len(), SERIES.len().saturating_sub(n));
        }
    }

    #[test]
    fn test_constant_series_has_zero_returns() {
        let rows = compute_return(&monthly("GLD", &[50.0; 30]), 12).unwrap();
        assert_eq!(rows.len(), 18);
        assert!(rows.iter().all(|r| r.percent_change == 0.0));
        assert!(rows.iter().all(|r| r.total_return == 0.0));
    }

    #[test]
    fn test_total_return_compounds_from_first_output_row() {
        let rows = compute_return(&monthly("GLD", &[100.0, 110.0, 121.0, 108.9]), 1).unwrap();

        let totals: Vec<f64> = rows.iter().map(|r| r.total_return).collect();
        assert_eq!(totals.len(), 3);
        assert_eq!(totals[0], 0.0);
        assert!((totals[1] - 10.0).abs() < 1e-9);
        assert!((totals[2] + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_unsorted_input_is_sorted() {
        let mut series = monthly("GLD", &[100.0, 110.0]);
        series.reverse();
        let rows = compute_return(&series, 1).unwrap();
        assert!((rows[0].percent_change - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_period_length_rejected() {
        let err = compute_return(&monthly("GLD", &SERIES), 0).unwrap_err();
        assert!(matches!(err, PriceError::InvalidParameter(_)));
    }

    #[test]
    fn test_mixed_symbols_rejected() {
        let mut series = monthly("GLD", &[100.0, 101.0]);
        series.push(PriceRow::new(date(2016, 3, 31), "SPY", 200.0));

        let err = resample(&series, Period::Monthly, Aggregation::Last).unwrap_err();
        assert!(matches!(err, PriceError::InvalidParameter(_)));
    }

    fn daily_gld() -> Vec<PriceRow> {
        vec![
            PriceRow::new(date(2017, 8, 30), "GLD", 124.0),
            PriceRow::new(date(2017, 8, 31), "GLD", 125.0),
            PriceRow::new(date(2017, 9, 1), "GLD", 126.0),
            PriceRow::new(date(2017, 9, 5), "GLD", 128.0),
            // No October rows
            PriceRow::new(date(2017, 11, 1), "GLD", 121.0),
        ]
    }

    #[test]
    fn test_resample_last_labels_month_end() {
        let rows = resample(&daily_gld(), Period::Monthly, Aggregation::Last).unwrap();

        assert_eq!(
            rows,
            vec![
                PriceRow::new(date(2017, 8, 31), "GLD", 125.0),
                PriceRow::new(date(2017, 9, 30), "GLD", 128.0),
                PriceRow::new(date(2017, 11, 30), "GLD", 121.0),
            ]
        );
    }

    #[test]
    fn test_resample_mean() {
        let rows = resample(&daily_gld(), Period::Monthly, Aggregation::Mean).unwrap();
        let prices: Vec<f64> = rows.iter().map(|r| r.price).collect();
        assert_eq!(prices, vec![124.5, 127.0, 121.0]);
    }

    #[test]
    fn test_resample_annual() {
        let rows = resample(&daily_gld(), Period::Annual, Aggregation::Last).unwrap();
        assert_eq!(rows, vec![PriceRow::new(date(2017, 12, 31), "GLD", 121.0)]);
    }

    #[test]
    fn test_real_return_subtracts_annual_inflation() {
        // Index rises 2% over twelve months
        let mut cpi_levels = vec![100.0; 12];
        cpi_levels.push(102.0);
        let cpi = monthly("RATEINF/CPI_USA", &cpi_levels);
        let bond = vec![PriceRow::new(month_end(12), "FRED/DGS10", 5.0)];

        let rows = real_return(&bond, &cpi, 12).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].bond, Some(5.0));
        assert!((rows[0].inflation.unwrap() - 2.0).abs() < 1e-9);
        assert!((rows[0].real_return.unwrap() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_real_return_outer_joins_dates() {
        let cpi = monthly("RATEINF/CPI_GBR", &[100.0, 101.0]);
        let bond = vec![
            PriceRow::new(date(2016, 1, 15), "BOE/IUDMNPY", 1.9),
            PriceRow::new(date(2016, 3, 10), "BOE/IUDMNPY", 1.5),
        ];

        let rows = real_return(&bond, &cpi, 1).unwrap();

        let dates: Vec<NaiveDate> = rows.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![date(2016, 1, 31), date(2016, 2, 29), date(2016, 3, 31)]);
        assert_eq!(rows[0].inflation, None);
        assert_eq!(rows[1].bond, None);
        assert!(rows.iter().all(|r| r.real_return.is_none()));
    }

    #[tokio::test]
    async fn test_engine_filters_start_and_computes_returns() {
        let store = InMemoryStore::new();
        let mut series = monthly("^GSPC", &[90.0, 95.0]);
        series.extend(
            SERIES
                .iter()
                .enumerate()
                .map(|(i, p)| PriceRow::new(month_end(i + 2), "^GSPC", *p)),
        );
        store.write_prices(&series, WriteMode::Append).await.unwrap();

        let engine = ReturnEngine::new(&store);
        let rows = engine
            .returns(&Symbol::new("^GSPC"), Some(month_end(2)), Period::Monthly, 12)
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert!((rows[0].percent_change - 9.0).abs() < 1e-9);

        let mean = engine
            .aggregate_mean(&Symbol::new("^GSPC"), None, Period::Annual)
            .await
            .unwrap();
        assert_eq!(mean.len(), 2);
    }
}
