//! Logging lifecycle of the binary.
//!
//! [`init`] installs the subscriber once at startup and returns a [`LogGuard`]
//! that must be held until shutdown; dropping it flushes the log file.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use prices::settings::LogSettings;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

type SharedBuffer = Arc<Mutex<BufWriter<File>>>;

/// Writer handed to the file layer for each event.
#[derive(Debug, Clone)]
struct FileWriter(SharedBuffer);

impl Write for FileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?
            .flush()
    }
}

/// Flushes the log file when dropped.
#[derive(Debug)]
pub(crate) struct LogGuard {
    file: Option<SharedBuffer>,
}

impl LogGuard {
    fn flush(&self) {
        if let Some(file) = &self.file {
            if let Ok(mut writer) = file.lock() {
                let _ = writer.flush();
            }
        }
    }
}

impl Drop for LogGuard {
    fn drop(&mut self) {
        self.flush();
    }
}

fn open_log_file(settings: &LogSettings) -> Result<Option<SharedBuffer>> {
    let Some(path) = &settings.file else {
        return Ok(None);
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;
    Ok(Some(Arc::new(Mutex::new(BufWriter::new(file)))))
}

/// Install the global subscriber: stderr always, the log file when configured.
///
/// `RUST_LOG` takes precedence over the configured level.
pub(crate) fn init(settings: &LogSettings) -> Result<LogGuard> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&settings.level)
            .with_context(|| format!("Invalid log level '{}'", settings.level))?,
    };

    let file = open_log_file(settings)?;
    let file_layer = file.clone().map(|buffer| {
        fmt::layer()
            .with_ansi(false)
            .with_writer(move || FileWriter(buffer.clone()))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(LogGuard { file })
}
