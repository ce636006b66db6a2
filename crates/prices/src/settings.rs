//! Settings loaded from `prices.toml`.
//!
//! Every field has a default, so a missing file or a partial file is fine.
//! Environment variables prefixed with `PRICES__` override file values
//! (e.g. `PRICES__ANALYSIS__PERIOD_LENGTH=24`), and `QUANDL_API_KEY`
//! overrides `quandl.api_key`.
//!
//! ```toml
//! [database]
//! path = "prices.db"
//!
//! [quandl]
//! api_key = "..."
//! rate_limit_ms = 500
//!
//! [analysis]
//! start_date = "2015-01-01"
//! period_length = 12
//!
//! [log]
//! level = "info"
//! file = "prices.log"
//! ```

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::debug;

use prices_core::{PriceError, Result, period::ANNUAL_PERIODS};

/// Prefix of environment overrides, sections separated by `__`.
pub const ENV_PREFIX: &str = "PRICES";

/// Environment variable overriding the Quandl API key.
pub const QUANDL_API_KEY_ENV: &str = "QUANDL_API_KEY";

/// Main settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Database location
    #[serde(default)]
    pub database: DatabaseSettings,
    /// Quandl source
    #[serde(default)]
    pub quandl: QuandlSettings,
    /// Yahoo source
    #[serde(default)]
    pub yahoo: YahooSettings,
    /// Analysis defaults
    #[serde(default)]
    pub analysis: AnalysisSettings,
    /// Table export
    #[serde(default)]
    pub export: ExportSettings,
    /// Logging
    #[serde(default)]
    pub log: LogSettings,
}

/// Database settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("prices.db")
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// Quandl source settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuandlSettings {
    /// API key, anonymous access when unset
    #[serde(default)]
    pub api_key: Option<String>,
    /// Minimum delay between requests
    #[serde(default = "default_quandl_rate_limit")]
    pub rate_limit_ms: u64,
}

fn default_quandl_rate_limit() -> u64 {
    500
}

impl Default for QuandlSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            rate_limit_ms: default_quandl_rate_limit(),
        }
    }
}

/// Yahoo source settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YahooSettings {
    /// Minimum delay between requests
    #[serde(default = "default_yahoo_rate_limit")]
    pub rate_limit_ms: u64,
}

fn default_yahoo_rate_limit() -> u64 {
    1000
}

impl Default for YahooSettings {
    fn default() -> Self {
        Self {
            rate_limit_ms: default_yahoo_rate_limit(),
        }
    }
}

/// Analysis defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// Earliest date considered, all history when unset
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Lookback of percent change in periods
    #[serde(default = "default_period_length")]
    pub period_length: usize,
}

fn default_period_length() -> usize {
    ANNUAL_PERIODS
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            start_date: None,
            period_length: default_period_length(),
        }
    }
}

/// Export settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Directory receiving exported tables
    #[serde(default = "default_export_dir")]
    pub dir: PathBuf,
}

fn default_export_dir() -> PathBuf {
    PathBuf::from("charts")
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            dir: default_export_dir(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSettings {
    /// Filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file, appended to
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Settings {
    /// Parse settings from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| PriceError::Parse(format!("Invalid settings: {e}")))
    }

    /// Load settings from `path`, falling back to defaults when it does not
    /// exist, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let settings = Self::layered(path.as_ref(), None)?;
        Ok(settings.with_quandl_key(std::env::var(QUANDL_API_KEY_ENV).ok()))
    }

    /// Layer the file under `PRICES__` variables, read from `env` when given
    /// instead of the process environment.
    fn layered(path: &Path, env: Option<config::Map<String, String>>) -> Result<Self> {
        debug!("Loading settings from {}", path.display());
        let layers = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()
            .map_err(|e| PriceError::Parse(format!("Invalid settings: {e}")))?;

        layers
            .try_deserialize()
            .map_err(|e| PriceError::Parse(format!("Invalid settings: {e}")))
    }

    /// Override the Quandl API key when `key` is set and non-empty.
    #[must_use]
    pub fn with_quandl_key(mut self, key: Option<String>) -> Self {
        if let Some(key) = key.filter(|k| !k.is_empty()) {
            self.quandl.api_key = Some(key);
        }
        self
    }
}
