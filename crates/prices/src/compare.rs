//! Comparison tables built from stored series.
//!
//! These are the tables the CLI prints and exports: catalog comparison
//! groups, real returns of several countries side by side, a country's real
//! rate against its share index, and total returns of a symbol set.

use chrono::NaiveDate;
use tracing::{debug, info};

use prices_core::{Period, PriceStore, Result, Symbol};

use crate::{
    combine::{Observation, Series, WideTable, combine, pivot},
    returns::ReturnEngine,
};

/// A named bond / inflation pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RealReturnSpec {
    /// Column label, e.g. `US Real Return`.
    pub label: String,
    /// 10 year government bond yield.
    pub bond: Symbol,
    /// Consumer price index.
    pub cpi: Symbol,
}

impl RealReturnSpec {
    /// Create a spec.
    #[must_use]
    pub fn new(label: impl Into<String>, bond: impl Into<Symbol>, cpi: impl Into<Symbol>) -> Self {
        Self {
            label: label.into(),
            bond: bond.into(),
            cpi: cpi.into(),
        }
    }

    /// United States: `FRED/DGS10` against `RATEINF/CPI_USA`.
    #[must_use]
    pub fn us() -> Self {
        Self::new("US Real Return", "FRED/DGS10", "RATEINF/CPI_USA")
    }

    /// The US, UK, Euro area and Japan 10 year bonds against local inflation.
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::us(),
            Self::new("UK Real Return", "BOE/IUDMNPY", "RATEINF/CPI_GBR"),
            Self::new(
                "EUR Real Return",
                "ECB/FM_M_U2_EUR_4F_BB_U2_10Y_YLD",
                "RATEINF/CPI_EUR",
            ),
            Self::new(
                "Japan Real Return",
                "MOFJ/INTEREST_RATE_JAPAN_10Y",
                "RATEINF/CPI_JPN",
            ),
        ]
    }
}

/// Distinct non-empty comparison groups in catalog order.
pub async fn comparison_groups(store: &dyn PriceStore) -> Result<Vec<String>> {
    let mut groups: Vec<String> = Vec::new();
    for entry in store.providers().await? {
        if !entry.comparison.is_empty() && !groups.contains(&entry.comparison) {
            groups.push(entry.comparison);
        }
    }
    Ok(groups)
}

/// Prices of every symbol in `group`, one column per symbol, only on dates
/// where all of them have a price.
pub async fn compare_group(
    store: &dyn PriceStore,
    group: &str,
    start: Option<NaiveDate>,
) -> Result<WideTable> {
    let mut observations = Vec::new();
    for entry in store.providers().await? {
        if entry.comparison == group {
            let rows = store.prices(&entry.symbol, start).await?;
            observations.extend(rows.iter().map(Observation::from));
        }
    }

    let table = pivot(observations)?.drop_incomplete();
    debug!(group, columns = table.columns().len(), rows = table.len(), "Compared group");
    Ok(table)
}

/// Real returns of several bond / inflation pairs, one column per label.
pub async fn compare_real_returns(
    store: &dyn PriceStore,
    specs: &[RealReturnSpec],
    start: Option<NaiveDate>,
) -> Result<WideTable> {
    let engine = ReturnEngine::new(store);
    let mut series = Vec::with_capacity(specs.len());

    for spec in specs {
        let rows = engine.real_return(&spec.bond, &spec.cpi, start).await?;
        info!(label = %spec.label, rows = rows.len(), "Computed real return");
        series.push(Series::real_return(spec.label.as_str(), &rows));
    }

    combine(&series)
}

/// A country's real rate next to the monthly total return of its share index.
pub async fn country_assets(
    store: &dyn PriceStore,
    spec: &RealReturnSpec,
    share: &Symbol,
    start: Option<NaiveDate>,
    period_length: usize,
) -> Result<WideTable> {
    let engine = ReturnEngine::new(store);
    let real = engine.real_return(&spec.bond, &spec.cpi, start).await?;
    let shares = engine
        .returns(share, start, Period::Monthly, period_length)
        .await?;

    combine(&[
        Series::real_return(spec.label.as_str(), &real),
        Series::total_return(share.as_str(), &shares),
    ])
}

/// Total return of each symbol after resampling to `period`.
pub async fn total_return_table(
    store: &dyn PriceStore,
    symbols: &[Symbol],
    start: Option<NaiveDate>,
    period: Period,
    period_length: usize,
) -> Result<WideTable> {
    let engine = ReturnEngine::new(store);
    let mut series = Vec::with_capacity(symbols.len());

    for symbol in symbols {
        let rows = engine.returns(symbol, start, period, period_length).await?;
        series.push(Series::total_return(symbol.as_str(), &rows));
    }

    combine(&series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use prices_core::{Host, PriceRow, ProviderEntry, WriteMode};
    use prices_store::InMemoryStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn month_end(i: usize) -> NaiveDate {
        Period::Monthly.bucket_end(date(2016 + (i / 12) as i32, (i % 12) as u32 + 1, 1))
    }

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::with_providers(vec![
            ProviderEntry::new("WGC/GOLD_DAILY_USD", Host::Quandl).with_comparison("Gold"),
            ProviderEntry::new("FRED/DGS10", Host::Quandl).with_comparison("10Year"),
            ProviderEntry::new("RATEINF/CPI_USA", Host::Quandl).with_comparison("Inflation"),
            ProviderEntry::new("GLD", Host::Yahoo).with_comparison("Gold"),
            ProviderEntry::new("^GSPC", Host::Yahoo),
        ]);

        let mut rows = vec![
            PriceRow::new(date(2017, 9, 20), "WGC/GOLD_DAILY_USD", 1310.0),
            PriceRow::new(date(2017, 9, 21), "WGC/GOLD_DAILY_USD", 1294.8),
            PriceRow::new(date(2017, 9, 21), "GLD", 122.9),
            PriceRow::new(date(2017, 9, 22), "GLD", 123.4),
        ];
        for i in 0..13 {
            rows.push(PriceRow::new(month_end(i), "RATEINF/CPI_USA", 100.0 + i as f64 / 6.0));
            rows.push(PriceRow::new(month_end(i), "FRED/DGS10", 2.5));
            rows.push(PriceRow::new(month_end(i), "^GSPC", 2000.0 + 10.0 * i as f64));
        }
        store.write_prices(&rows, WriteMode::Append).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_comparison_groups_in_catalog_order() {
        let store = seeded().await;
        let groups = comparison_groups(&store).await.unwrap();
        assert_eq!(groups, vec!["Gold", "10Year", "Inflation"]);
    }

    #[tokio::test]
    async fn test_compare_group_drops_incomplete_dates() {
        let store = seeded().await;
        let table = compare_group(&store, "Gold", None).await.unwrap();

        assert_eq!(table.columns(), ["WGC/GOLD_DAILY_USD", "GLD"]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].0, date(2017, 9, 21));
    }

    #[tokio::test]
    async fn test_compare_real_returns() {
        let store = seeded().await;
        let table = compare_real_returns(&store, &[RealReturnSpec::us()], None)
            .await
            .unwrap();

        // Index rose 2% over the year, bond yields 2.5
        let values = table.column("US Real Return").unwrap();
        assert_eq!(values.len(), 1);
        assert!((values[0].unwrap() - 0.5).abs() < 1e-9);
        assert_eq!(table.rows()[0].0, month_end(12));
    }

    #[tokio::test]
    async fn test_country_assets() {
        let store = seeded().await;
        let table = country_assets(&store, &RealReturnSpec::us(), &Symbol::new("^GSPC"), None, 12)
            .await
            .unwrap();

        assert_eq!(table.columns(), ["US Real Return", "^GSPC"]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.column("^GSPC").unwrap(), vec![Some(0.0)]);
    }

    #[tokio::test]
    async fn test_total_return_table() {
        let store = seeded().await;
        let table = total_return_table(
            &store,
            &[Symbol::new("^GSPC"), Symbol::new("FRED/DGS10")],
            None,
            Period::Monthly,
            1,
        )
        .await
        .unwrap();

        assert_eq!(table.len(), 12);
        let last = table.rows().last().unwrap();
        let expected = (2120.0 / 2010.0 - 1.0) * 100.0;
        assert!((last.1[0].unwrap() - expected).abs() < 1e-9);
        assert_eq!(last.1[1], Some(0.0));
    }

    #[test]
    fn test_default_specs() {
        let specs = RealReturnSpec::defaults();
        assert_eq!(specs.len(), 4);
        assert_eq!(specs[1].cpi, Symbol::new("RATEINF/CPI_GBR"));
    }
}
