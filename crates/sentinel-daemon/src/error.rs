//! Error types for sentinel-daemon

use sentinel_core::SentinelError;
use thiserror::Error;

/// Errors surfaced by the daemon commands.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// File access failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input or output JSON could not be processed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The orchestrator reported an error
    #[error(transparent)]
    Core(#[from] SentinelError),
}

impl From<config::ConfigError> for DaemonError {
    fn from(err: config::ConfigError) -> Self {
        DaemonError::Config(err.to_string())
    }
}

/// Result type for daemon operations.
pub type DaemonResult<T> = Result<T, DaemonError>;
