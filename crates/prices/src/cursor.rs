//! Incremental cursor choosing the next fetch start date for a symbol.
//!
//! Advancement skips weekends only. Public holidays are not accounted for, so
//! the cursor may point at a day the market was closed; the source then
//! returns nothing for that day. The updater never stores rows dated today,
//! so an unfinished session does not move the cursor.

use chrono::{Datelike, Days, NaiveDate, Weekday};

use prices_core::{PriceStore, Result, Symbol};

/// Returns the business day following `date`.
///
/// Friday, Saturday and Sunday all advance to the next Monday.
#[must_use]
pub fn next_business_day(date: NaiveDate) -> NaiveDate {
    let days = match date.weekday() {
        Weekday::Fri => 3,
        Weekday::Sat => 2,
        _ => 1,
    };
    date + Days::new(days)
}

/// Returns the date from which new rows of `symbol` must be fetched.
///
/// `None` means the symbol has no stored rows and its full history is needed.
/// The returned date may lie after today; deciding to skip is up to the caller.
pub async fn next_fetch_date<S>(store: &S, symbol: &Symbol) -> Result<Option<NaiveDate>>
where
    S: PriceStore + ?Sized,
{
    Ok(store.latest_date(symbol).await?.map(next_business_day))
}
