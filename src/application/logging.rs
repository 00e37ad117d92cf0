//! # Logging
//!
//! Installs the global `tracing` subscriber: an `EnvFilter` (from `RUST_LOG`, else
//! the configured filter), a session log file that is cleared on every start, and
//! an optional stdout layer.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::domain::config::LoggingConfig;

/// Sets up logging. Keep the returned guard alive for the life of the process or
/// buffered file output is lost.
pub fn init(config: &LoggingConfig) -> Result<WorkerGuard> {
    let directory = Path::new(&config.directory);
    if !directory.exists() {
        fs::create_dir_all(directory)
            .with_context(|| format!("Failed to create log directory {}", directory.display()))?;
    }

    // Clear previous session log
    let log_path = directory.join(&config.file);
    if log_path.exists() {
        let _ = fs::remove_file(&log_path);
    }

    let file_appender = tracing_appender::rolling::never(directory, &config.file);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.filter));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false);

    let console_layer = config
        .console
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stdout));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
