//! Date aligned wide tables.
//!
//! [`pivot`] turns long `(date, key, value)` observations into one column per
//! key; [`combine`] outer-joins named series on date. Gaps stay `None`.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use polars::prelude::*;

use prices_core::{PriceError, PriceRow, Result};

use crate::returns::{RealReturnRow, ReturnRow};

/// One long-form value: a date, a column key and a number.
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    /// Row key.
    pub date: NaiveDate,
    /// Column key, a symbol or a label.
    pub key: String,
    /// Cell value.
    pub value: f64,
}

impl Observation {
    /// Create an observation.
    #[must_use]
    pub fn new(date: NaiveDate, key: impl Into<String>, value: f64) -> Self {
        Self {
            date,
            key: key.into(),
            value,
        }
    }
}

impl From<&PriceRow> for Observation {
    fn from(row: &PriceRow) -> Self {
        Self::new(row.date, row.symbol.as_str(), row.price)
    }
}

/// A named series of dated values.
#[derive(Clone, Debug, PartialEq)]
pub struct Series {
    /// Column name in the combined table.
    pub name: String,
    /// Dated values.
    pub points: Vec<(NaiveDate, f64)>,
}

impl Series {
    /// Create a series.
    #[must_use]
    pub fn new(name: impl Into<String>, points: Vec<(NaiveDate, f64)>) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }

    /// Prices of stored rows.
    #[must_use]
    pub fn from_prices(name: impl Into<String>, rows: &[PriceRow]) -> Self {
        Self::new(name, rows.iter().map(|r| (r.date, r.price)).collect())
    }

    /// Total returns of return rows.
    #[must_use]
    pub fn total_return(name: impl Into<String>, rows: &[ReturnRow]) -> Self {
        Self::new(name, rows.iter().map(|r| (r.date, r.total_return)).collect())
    }

    /// Real returns, skipping dates where either side is missing.
    #[must_use]
    pub fn real_return(name: impl Into<String>, rows: &[RealReturnRow]) -> Self {
        Self::new(
            name,
            rows.iter()
                .filter_map(|r| r.real_return.map(|v| (r.date, v)))
                .collect(),
        )
    }
}

/// Table with one row per date and one column per key.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WideTable {
    columns: Vec<String>,
    rows: Vec<(NaiveDate, Vec<Option<f64>>)>,
}

impl WideTable {
    /// Column names, in first-seen order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows ascending by date.
    #[must_use]
    pub fn rows(&self) -> &[(NaiveDate, Vec<Option<f64>>)] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column, aligned with [`rows`](Self::rows).
    #[must_use]
    pub fn column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|(_, values)| values[idx]).collect())
    }

    /// Keep only dates where every column has a value.
    #[must_use]
    pub fn drop_incomplete(mut self) -> Self {
        self.rows.retain(|(_, values)| values.iter().all(Option::is_some));
        self
    }

    /// Convert to a frame with a `date` column followed by one f64 column per key.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let epoch = NaiveDate::default();
        let days: Vec<i32> = self
            .rows
            .iter()
            .map(|(d, _)| (*d - epoch).num_days() as i32)
            .collect();

        let mut columns = Vec::with_capacity(self.columns.len() + 1);
        columns.push(
            Column::new("date".into(), days)
                .cast(&DataType::Date)
                .map_err(|e| PriceError::Other(e.to_string()))?,
        );
        for (idx, name) in self.columns.iter().enumerate() {
            let values: Vec<Option<f64>> = self.rows.iter().map(|(_, v)| v[idx]).collect();
            columns.push(Column::new(name.as_str().into(), values));
        }

        DataFrame::new(columns).map_err(|e| PriceError::Other(e.to_string()))
    }
}

impl fmt::Display for WideTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<10}", "date")?;
        for name in &self.columns {
            write!(f, "  {name:>14}")?;
        }
        writeln!(f)?;

        for (date, values) in &self.rows {
            write!(f, "{date}")?;
            for value in values {
                match value {
                    Some(v) => write!(f, "  {v:>14.4}")?,
                    None => write!(f, "  {:>14}", "")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Pivots long observations into a wide table.
///
/// Columns appear in first-seen key order. Two observations sharing a
/// `(date, key)` pair fail with [`PriceError::DuplicateKey`].
pub fn pivot<I>(observations: I) -> Result<WideTable>
where
    I: IntoIterator<Item = Observation>,
{
    let mut columns: Vec<String> = Vec::new();
    let mut cells: BTreeMap<NaiveDate, Vec<Option<f64>>> = BTreeMap::new();

    for obs in observations {
        let idx = match columns.iter().position(|c| *c == obs.key) {
            Some(idx) => idx,
            None => {
                columns.push(obs.key.clone());
                columns.len() - 1
            }
        };

        let row = cells.entry(obs.date).or_default();
        if row.len() <= idx {
            row.resize(idx + 1, None);
        }
        if row[idx].is_some() {
            return Err(PriceError::DuplicateKey {
                date: obs.date,
                key: obs.key,
            });
        }
        row[idx] = Some(obs.value);
    }

    let width = columns.len();
    let rows = cells
        .into_iter()
        .map(|(date, mut values)| {
            values.resize(width, None);
            (date, values)
        })
        .collect();

    Ok(WideTable { columns, rows })
}

/// Outer-joins named series on date.
///
/// Each series becomes one column. A date repeated inside a series fails with
/// [`PriceError::DuplicateKey`]; two series with the same name are rejected.
pub fn combine(series: &[Series]) -> Result<WideTable> {
    for (i, s) in series.iter().enumerate() {
        if series[..i].iter().any(|other| other.name == s.name) {
            return Err(PriceError::InvalidParameter(format!(
                "Series {} given twice",
                s.name
            )));
        }
    }

    pivot(series.iter().flat_map(|s| {
        s.points
            .iter()
            .map(|(date, value)| Observation::new(*date, s.name.as_str(), *value))
    }))
}
