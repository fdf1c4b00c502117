//! Logging initialisation.
//!
//! Console output is always installed (plain text or JSON); a second,
//! ANSI-free file layer is added when `logging.file` is set. The filter comes
//! from `RUST_LOG` when present, otherwise from `logging.level`.

use std::fs;
use std::io;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{LogFormat, LoggingConfig};

/// Keeps the non-blocking file writer alive; dropping it flushes pending lines.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Install the global `tracing` subscriber.
///
/// # Errors
/// Returns an error if the log directory cannot be created, the filter
/// directive is invalid, or a global subscriber is already installed.
pub fn init_logging(cfg: &LoggingConfig) -> Result<LoggingGuard> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&cfg.level)
            .with_context(|| format!("invalid log level directive '{}'", cfg.level))?,
    };

    let console = match cfg.format {
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_writer(io::stdout)
            .with_target(true)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(io::stdout)
            .boxed(),
    };

    let (file_layer, file_guard) = match &cfg.file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let name = path
                .file_name()
                .with_context(|| format!("log file path has no file name: {}", path.display()))?;
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log dir {}", dir.display()))?;

            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .context("failed to install global tracing subscriber")?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}
