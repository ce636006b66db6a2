//! Command line arguments.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use prices::{Period, Symbol};

/// Collect historical prices and compare returns
#[derive(Debug, Parser)]
#[command(name = "prices")]
#[command(about = "Collect historical prices and compare returns")]
#[command(version)]
pub(crate) struct Cli {
    /// Settings file
    #[arg(long, short, default_value = "prices.toml", global = true)]
    pub(crate) config: PathBuf,

    /// Subcommand to run
    #[command(subcommand)]
    pub(crate) command: Commands,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// Fetch new prices for every symbol of the provider catalog
    Update,
    /// Fetch new prices for one symbol
    UpdateSymbol {
        /// Provider host (quandl, yahoo)
        host: String,
        /// Provider symbol, e.g. GLD or FRED/DGS10
        symbol: Symbol,
    },
    /// Last stored date and row count of each catalog symbol
    Report,
    /// Replace the provider catalog with a CSV file
    ImportProviders {
        /// Catalog CSV (symbol,description,source,host,comparison)
        path: PathBuf,
    },
    /// Resample one symbol to a coarser period
    Resample {
        /// Symbol to resample
        symbol: Symbol,
        /// Period (w, m, q, a)
        #[arg(long, short, default_value = "m")]
        period: Period,
        /// Average each period instead of taking its last price
        #[arg(long)]
        mean: bool,
        #[command(flatten)]
        window: Window,
    },
    /// Percent change and total return of one or more symbols
    Returns {
        /// Symbols to compare
        #[arg(required = true)]
        symbols: Vec<Symbol>,
        /// Period (w, m, q, a)
        #[arg(long, short, default_value = "m")]
        period: Period,
        /// Title of the exported table
        #[arg(long, default_value = "Total Return")]
        title: String,
        #[command(flatten)]
        window: Window,
    },
    /// Real return of a bond against a consumer price index
    RealReturn {
        /// Bond yield symbol
        #[arg(long, default_value = "FRED/DGS10")]
        bond: Symbol,
        /// Consumer price index symbol
        #[arg(long, default_value = "RATEINF/CPI_USA")]
        cpi: Symbol,
        /// Heading printed above the rows, e.g. US
        #[arg(long)]
        label: Option<String>,
        #[command(flatten)]
        window: Window,
    },
    /// Real returns of US, UK, Euro area and Japan 10 year bonds
    CompareReal {
        #[command(flatten)]
        window: Window,
    },
    /// One price table per catalog comparison group
    CompareGroups {
        #[command(flatten)]
        window: Window,
    },
    /// US real rate against the total return of a share index
    CountryAssets {
        /// Share index symbol
        #[arg(long, default_value = "^GSPC")]
        share: Symbol,
        #[command(flatten)]
        window: Window,
    },
}

/// Date window and lookback shared by the analysis commands
#[derive(Debug, Args)]
pub(crate) struct Window {
    /// Earliest date (YYYY-MM-DD), defaults to the configured start date
    #[arg(long)]
    pub(crate) start: Option<NaiveDate>,
    /// Lookback of percent change in periods, defaults to the configured value
    #[arg(long)]
    pub(crate) period_length: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_returns() {
        let cli = Cli::try_parse_from([
            "prices", "returns", "^GSPC", "GLD", "--period", "q", "--start", "2015-01-01",
        ])
        .unwrap();

        match cli.command {
            Commands::Returns {
                symbols,
                period,
                window,
                ..
            } => {
                assert_eq!(symbols, vec![Symbol::new("^GSPC"), Symbol::new("GLD")]);
                assert_eq!(period, Period::Quarterly);
                assert_eq!(window.start, NaiveDate::from_ymd_opt(2015, 1, 1));
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(cli.config, PathBuf::from("prices.toml"));
    }

    #[test]
    fn test_parse_real_return_label() {
        let cli = Cli::try_parse_from(["prices", "real-return", "--label", "UK", "--cpi", "RATEINF/CPI_GBR"])
            .unwrap();

        match cli.command {
            Commands::RealReturn {
                bond, cpi, label, ..
            } => {
                assert_eq!(bond.as_str(), "FRED/DGS10");
                assert_eq!(cpi.as_str(), "RATEINF/CPI_GBR");
                assert_eq!(label.as_deref(), Some("UK"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_update_symbol() {
        let cli = Cli::try_parse_from(["prices", "-c", "alt.toml", "update-symbol", "quandl", "FRED/DGS10"])
            .unwrap();

        match cli.command {
            Commands::UpdateSymbol { host, symbol } => {
                assert_eq!(host, "quandl");
                assert_eq!(symbol.as_str(), "FRED/DGS10");
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(cli.config, PathBuf::from("alt.toml"));
    }
}
