//! Schema normalization of provider frames.
//!
//! Providers name their columns differently (`Value`, `Settle`, `Close`,
//! `Percent per annum`) and represent dates as dates, timestamps or strings.
//! [`normalize`] projects any of them onto canonical [`PriceRow`]s.

use chrono::NaiveDate;
use polars::prelude::*;
use tracing::{debug, warn};

use crate::{
    error::{PriceError, Result},
    types::{PriceRow, Symbol},
};

/// Column names recognized as the observation date.
pub const DATE_COLUMNS: &[&str] = &["date", "Date"];

/// Column names recognized as the price, in precedence order.
///
/// `Adj Close` is deliberately absent: only the unadjusted close is stored.
pub const PRICE_COLUMNS: &[&str] = &["price", "Value", "Percent per annum", "Settle", "Close"];

/// Length of a `YYYY-MM-DD` date.
const SHORT_DATE_LEN: usize = 10;

fn normalization_error(e: PolarsError) -> PriceError {
    PriceError::Normalization(e.to_string())
}

/// Maps a raw provider frame onto `(date, symbol, price)` rows.
///
/// Every column other than the recognized date and price columns is dropped.
/// Time of day is stripped from the date. Rows with a missing date or price
/// are skipped.
///
/// # Errors
/// Returns [`PriceError::Normalization`] when the frame has no recognized
/// price column, no date column, or an unparseable date.
pub fn normalize(frame: &DataFrame, symbol: &Symbol) -> Result<Vec<PriceRow>> {
    let names: Vec<&str> = frame
        .get_column_names()
        .into_iter()
        .map(|name| name.as_str())
        .collect();

    let date_name = DATE_COLUMNS
        .iter()
        .copied()
        .find(|c| names.contains(c))
        .ok_or_else(|| {
            PriceError::Normalization(format!("No date column for {symbol} in {names:?}"))
        })?;

    let price_names: Vec<&str> = PRICE_COLUMNS
        .iter()
        .copied()
        .filter(|c| names.contains(c))
        .collect();
    let price_name = *price_names.first().ok_or_else(|| {
        PriceError::Normalization(format!("No price column for {symbol} in {names:?}"))
    })?;
    if price_names.len() > 1 {
        warn!(
            symbol = %symbol,
            columns = ?price_names,
            used = price_name,
            "Several price columns in provider frame"
        );
    }

    let dates = frame
        .column(date_name)
        .map_err(normalization_error)?
        .cast(&DataType::String)
        .map_err(normalization_error)?;
    let dates = dates.str().map_err(normalization_error)?;
    let prices = frame
        .column(price_name)
        .map_err(normalization_error)?
        .cast(&DataType::Float64)
        .map_err(normalization_error)?;
    let prices = prices.f64().map_err(normalization_error)?;

    let mut rows = Vec::with_capacity(frame.height());
    let mut skipped = 0usize;
    for i in 0..frame.height() {
        let (Some(raw_date), Some(price)) = (dates.get(i), prices.get(i)) else {
            skipped += 1;
            continue;
        };
        if price.is_nan() {
            skipped += 1;
            continue;
        }
        rows.push(PriceRow::new(parse_short_date(raw_date)?, symbol.clone(), price));
    }

    if skipped > 0 {
        debug!(symbol = %symbol, skipped, "Skipped rows without date or price");
    }
    debug!(symbol = %symbol, rows = rows.len(), price_column = price_name, "Normalized frame");
    Ok(rows)
}

/// Parses the date part of `2017-09-01` or `2017-09-01 00:00:00`.
fn parse_short_date(raw: &str) -> Result<NaiveDate> {
    let short = raw.get(..SHORT_DATE_LEN).unwrap_or(raw);
    NaiveDate::parse_from_str(short, "%Y-%m-%d")
        .map_err(|e| PriceError::Normalization(format!("Invalid date {raw:?}: {e}")))
}

/// Builds the canonical frame (`date`, `symbol`, `price`) from rows.
///
/// # Errors
/// Returns [`PriceError::Other`] if the frame cannot be assembled.
pub fn rows_to_frame(rows: &[PriceRow]) -> Result<DataFrame> {
    let epoch = NaiveDate::default();
    let dates: Vec<i32> = rows
        .iter()
        .map(|r| (r.date - epoch).num_days() as i32)
        .collect();
    let symbols: Vec<&str> = rows.iter().map(|r| r.symbol.as_str()).collect();
    let prices: Vec<f64> = rows.iter().map(|r| r.price).collect();

    let date_col = Column::new("date".into(), dates)
        .cast(&DataType::Date)
        .map_err(|e| PriceError::Other(e.to_string()))?;

    DataFrame::new(vec![
        date_col,
        Column::new("symbol".into(), symbols),
        Column::new("price".into(), prices),
    ])
    .map_err(|e| PriceError::Other(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn epoch_days(d: NaiveDate) -> i32 {
        (d - NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()).num_days() as i32
    }

    #[test]
    fn test_each_price_column_maps_to_price() {
        for price_column in ["Value", "Percent per annum", "Settle", "Close"] {
            let df = DataFrame::new(vec![
                Column::new("Date".into(), vec!["2017-09-01", "2017-09-04"]),
                Column::new(price_column.into(), vec![1.5, 1.6]),
            ])
            .unwrap();

            let rows = normalize(&df, &Symbol::new("FRED/DGS10")).unwrap();
            assert_eq!(rows.len(), 2, "column {price_column}");
            assert_eq!(rows[0], PriceRow::new(date(2017, 9, 1), "FRED/DGS10", 1.5));
            assert_eq!(rows[1].price, 1.6);
        }
    }

    #[test]
    fn test_adjusted_close_and_other_columns_dropped() {
        let df = df!(
            "Date" => &["2017-09-01"],
            "Open" => &[100.0],
            "High" => &[102.0],
            "Low" => &[99.0],
            "Close" => &[101.0],
            "Adj Close" => &[95.0],
            "Volume" => &[1000.0],
        )
        .unwrap();

        let rows = normalize(&df, &Symbol::new("GLD")).unwrap();
        assert_eq!(rows, vec![PriceRow::new(date(2017, 9, 1), "GLD", 101.0)]);
    }

    #[test]
    fn test_date_typed_column() {
        let days = vec![epoch_days(date(2017, 9, 1)), epoch_days(date(2017, 9, 4))];
        let df = DataFrame::new(vec![
            Column::new("Date".into(), days).cast(&DataType::Date).unwrap(),
            Column::new("Close".into(), vec![10.0, 11.0]),
        ])
        .unwrap();

        let rows = normalize(&df, &Symbol::new("^GSPC")).unwrap();
        assert_eq!(rows[1].date, date(2017, 9, 4));
    }

    #[test]
    fn test_time_of_day_is_stripped() {
        let df = df!(
            "Date" => &["2017-09-01 00:00:00", "2017-09-04 16:30:00"],
            "Settle" => &[1300.0, 1310.0],
        )
        .unwrap();

        let rows = normalize(&df, &Symbol::new("CHRIS/CME_GC1")).unwrap();
        assert_eq!(rows[0].date, date(2017, 9, 1));
        assert_eq!(rows[1].date, date(2017, 9, 4));
    }

    #[test]
    fn test_missing_price_column_fails() {
        let df = df!(
            "Date" => &["2017-09-01"],
            "Adj Close" => &[95.0],
        )
        .unwrap();

        let err = normalize(&df, &Symbol::new("GLD")).unwrap_err();
        assert!(matches!(err, PriceError::Normalization(_)));
    }

    #[test]
    fn test_missing_date_column_fails() {
        let df = df!("Value" => &[1.0]).unwrap();
        assert!(matches!(
            normalize(&df, &Symbol::new("X")),
            Err(PriceError::Normalization(_))
        ));
    }

    #[test]
    fn test_null_prices_skipped() {
        let df = DataFrame::new(vec![
            Column::new("Date".into(), vec!["2017-09-01", "2017-09-04", "2017-09-05"]),
            Column::new("Value".into(), vec![Some(1.0), None, Some(f64::NAN)]),
        ])
        .unwrap();

        let rows = normalize(&df, &Symbol::new("X")).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_empty_frame_normalizes_to_no_rows() {
        let df = DataFrame::new(vec![
            Column::new("Date".into(), Vec::<&str>::new()),
            Column::new("Value".into(), Vec::<f64>::new()),
        ])
        .unwrap();

        assert!(normalize(&df, &Symbol::new("X")).unwrap().is_empty());
    }

    #[test]
    fn test_rows_to_frame_round_trips() {
        let rows = vec![
            PriceRow::new(date(2017, 9, 1), "GLD", 125.0),
            PriceRow::new(date(2017, 9, 4), "GLD", 126.0),
        ];
        let df = rows_to_frame(&rows).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(normalize(&df, &Symbol::new("GLD")).unwrap(), rows);
    }
}
