//! Prices CLI
//!
//! Provides commands for:
//! - `update` / `update-symbol`: fetch new prices into the database
//! - `report`: last stored date per symbol
//! - `import-providers`: replace the provider catalog
//! - `resample`, `returns`, `real-return`: single series analytics
//! - `compare-real`, `compare-groups`, `country-assets`: exported comparison tables

mod cli;
mod commands;
mod telemetry;

use anyhow::{Context, Result};
use clap::Parser;
use prices::Settings;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(&cli.config)
        .with_context(|| format!("Failed to load settings from {}", cli.config.display()))?;

    // Held until exit so the log file is flushed at shutdown
    let _guard = telemetry::init(&settings.log)?;

    commands::execute(cli.command, &settings).await
}
