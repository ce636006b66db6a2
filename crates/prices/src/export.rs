//! CSV export of wide tables.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::info;

use prices_core::{PriceError, Result};

use crate::combine::WideTable;

/// Writes `table` to `<dir>/<title>_<today>.csv` and returns the path.
///
/// The header is `date` followed by the table columns. Gaps are empty cells.
pub fn export_csv(
    table: &WideTable,
    title: &str,
    dir: impl AsRef<Path>,
    today: NaiveDate,
) -> Result<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)
        .map_err(|e| PriceError::Other(format!("Failed to create '{}': {e}", dir.display())))?;
    let path = dir.join(format!("{title}_{today}.csv"));

    let mut wtr = csv::Writer::from_path(&path).map_err(csv_error)?;

    let mut header = Vec::with_capacity(table.columns().len() + 1);
    header.push("date");
    header.extend(table.columns().iter().map(String::as_str));
    wtr.write_record(&header).map_err(csv_error)?;

    for (date, values) in table.rows() {
        let mut record = Vec::with_capacity(values.len() + 1);
        record.push(date.to_string());
        record.extend(values.iter().map(|v| v.map(|v| v.to_string()).unwrap_or_default()));
        wtr.write_record(&record).map_err(csv_error)?;
    }
    wtr.flush()
        .map_err(|e| PriceError::Other(format!("Failed to write '{}': {e}", path.display())))?;

    info!("Saved table to {}", path.display());
    Ok(path)
}

fn csv_error(e: csv::Error) -> PriceError {
    PriceError::Other(format!("CSV export failed: {e}"))
}
