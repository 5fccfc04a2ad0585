use super::{RuntimeError, StatePaths};
use crate::config::{LogFormat, LoggingConfig};
use std::fs;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable that overrides the configured filter directive.
pub const LOG_FILTER_ENV: &str = "DOCFLOW_LOG";

pub fn log_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()))
}

/// Installs the process-wide subscriber appending to `logs/docflow.log`.
///
/// Returns `false` when another subscriber was already installed.
pub fn init_logging(paths: &StatePaths, config: &LoggingConfig) -> Result<bool, RuntimeError> {
    let path = paths.log_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| RuntimeError::CreateDir {
            path: parent.display().to_string(),
            source,
        })?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|source| RuntimeError::OpenLog {
            path: path.display().to_string(),
            source,
        })?;

    let registry = tracing_subscriber::registry().with(log_filter(config));
    let installed = match config.format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .try_init(),
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .try_init(),
    };
    Ok(installed.is_ok())
}
