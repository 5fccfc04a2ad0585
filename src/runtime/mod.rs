pub mod logging;
pub mod state_paths;

pub use logging::{init_logging, log_filter, LOG_FILTER_ENV};
pub use state_paths::{bootstrap_state_root, StatePaths};

use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("failed to create runtime path {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to open log file {path}: {source}")]
    OpenLog {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or(0)
}
