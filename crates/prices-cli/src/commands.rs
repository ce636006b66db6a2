//! Command execution.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use tracing::info;

use prices::{
    Aggregation, PriceStore, ProviderGateway, QuandlSource, RealReturnSpec, ReturnEngine,
    Settings, SqliteStore, Updater, WideTable, YahooSource, compare_group, compare_real_returns,
    comparison_groups, country_assets, export_csv, replace_providers, report, resample,
    total_return_table,
};

use crate::cli::{Commands, Window};

const COMPARE_REAL_RETURNS: &str = "Comparison of Real Returns on 10 Year Bonds";
const COUNTRY_ASSETS: &str = "Country Assets";

/// Store, sources and defaults shared by the commands.
struct App<'a> {
    settings: &'a Settings,
    store: Arc<dyn PriceStore>,
}

impl App<'_> {
    fn start(&self, window: &Window) -> Option<NaiveDate> {
        window.start.or(self.settings.analysis.start_date)
    }

    fn period_length(&self, window: &Window) -> usize {
        window
            .period_length
            .unwrap_or(self.settings.analysis.period_length)
    }

    fn gateway(&self) -> ProviderGateway {
        ProviderGateway::new()
            .with_source(Arc::new(YahooSource::with_rate_limit(Duration::from_millis(
                self.settings.yahoo.rate_limit_ms,
            ))))
            .with_source(Arc::new(QuandlSource::with_rate_limit(
                self.settings.quandl.api_key.clone(),
                Duration::from_millis(self.settings.quandl.rate_limit_ms),
            )))
    }

    fn updater(&self) -> Updater {
        Updater::new(self.store.clone(), self.gateway())
    }

    /// Print a table and export it under `title`.
    fn publish(&self, title: &str, table: &WideTable) -> Result<()> {
        println!("{title}");
        println!("{table}");
        let path = export_csv(
            table,
            title,
            &self.settings.export.dir,
            Local::now().date_naive(),
        )?;
        println!("Saved table to {}", path.display());
        Ok(())
    }
}

/// Run one command against the configured store.
pub(crate) async fn execute(command: Commands, settings: &Settings) -> Result<()> {
    let store = SqliteStore::new(&settings.database.path).with_context(|| {
        format!(
            "Failed to open database {}",
            settings.database.path.display()
        )
    })?;
    let app = App {
        settings,
        store: Arc::new(store),
    };
    let store = app.store.as_ref();

    match command {
        Commands::Update => {
            let summary = app.updater().update_all().await?;
            for (symbol, error) in &summary.failed {
                println!("Failed {symbol}: {error}");
            }
            println!("{summary}");
        }
        Commands::UpdateSymbol { host, symbol } => {
            let rows = app.updater().update_symbol(&host, &symbol).await?;
            match (rows.first(), rows.last()) {
                (Some(first), Some(last)) => println!(
                    "Updated {symbol}: {} rows from {} to {}",
                    rows.len(),
                    first.date,
                    last.date
                ),
                _ => println!("Not updated {symbol}"),
            }
        }
        Commands::Report => {
            for line in report(store).await? {
                println!("{line}");
            }
        }
        Commands::ImportProviders { path } => {
            let entries = replace_providers(store, &path).await?;
            println!("Imported {} providers from {}", entries.len(), path.display());
        }
        Commands::Resample {
            symbol,
            period,
            mean,
            window,
        } => {
            let aggregation = if mean {
                Aggregation::Mean
            } else {
                Aggregation::Last
            };
            let rows = ReturnEngine::new(store)
                .prices(&symbol, app.start(&window))
                .await?;
            for row in resample(&rows, period, aggregation)? {
                println!("{} {} {:.4}", row.date, row.symbol, row.price);
            }
        }
        Commands::Returns {
            symbols,
            period,
            title,
            window,
        } => {
            let engine = ReturnEngine::new(store);
            let start = app.start(&window);
            let period_length = app.period_length(&window);
            for symbol in &symbols {
                for row in engine.returns(symbol, start, period, period_length).await? {
                    println!(
                        "{} {} {:.4} {:.2} {:.2}",
                        row.date, row.symbol, row.price, row.percent_change, row.total_return
                    );
                }
            }
            let table = total_return_table(store, &symbols, start, period, period_length).await?;
            app.publish(&title, &table)?;
        }
        Commands::RealReturn {
            bond,
            cpi,
            label,
            window,
        } => {
            let label = label.unwrap_or_else(|| format!("{bond} against {cpi}"));
            println!("Real Return: {label}");
            let rows = ReturnEngine::new(store)
                .real_return(&bond, &cpi, app.start(&window))
                .await?;
            let cell = |v: Option<f64>| v.map(|v| format!("{v:.2}")).unwrap_or_default();
            for row in rows {
                println!(
                    "{} {:>8} {:>8} {:>8}",
                    row.date,
                    cell(row.bond),
                    cell(row.inflation),
                    cell(row.real_return)
                );
            }
        }
        Commands::CompareReal { window } => {
            let table =
                compare_real_returns(store, &RealReturnSpec::defaults(), app.start(&window))
                    .await?;
            app.publish(COMPARE_REAL_RETURNS, &table)?;
        }
        Commands::CompareGroups { window } => {
            for group in comparison_groups(store).await? {
                let table = compare_group(store, &group, app.start(&window)).await?;
                info!(group = %group, rows = table.len(), "Compared group");
                app.publish(&group, &table)?;
            }
        }
        Commands::CountryAssets { share, window } => {
            let table = country_assets(
                store,
                &RealReturnSpec::us(),
                &share,
                app.start(&window),
                app.period_length(&window),
            )
            .await?;
            app.publish(COUNTRY_ASSETS, &table)?;
        }
    }

    Ok(())
}
