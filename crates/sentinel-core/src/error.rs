//! Error types for sentinel-core.
//!
//! Defines pipeline, collaborator and control-loop errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while processing events or running the control loop.
#[derive(Debug, Clone, Error)]
pub enum SentinelError {
    /// The event could not be validated.
    #[error("validation error: {0}")]
    Validation(String),

    /// A collaborator call failed.
    #[error("{collaborator} failed: {reason}")]
    Collaborator {
        collaborator: &'static str,
        reason: String,
    },

    /// A collaborator call exceeded its time bound.
    #[error("{collaborator} timed out after {timeout_ms}ms")]
    CollaboratorTimeout {
        collaborator: &'static str,
        timeout_ms: u64,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Unexpected fault in pipeline or loop logic.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SentinelError {
    pub fn collaborator(collaborator: &'static str, reason: impl Into<String>) -> Self {
        SentinelError::Collaborator {
            collaborator,
            reason: reason.into(),
        }
    }

    /// Coarse classification used in failure records.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SentinelError::Validation(_) => ErrorKind::Validation,
            SentinelError::Collaborator { .. } | SentinelError::CollaboratorTimeout { .. } => {
                ErrorKind::Collaborator
            }
            SentinelError::Configuration(_) | SentinelError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Error taxonomy reported alongside failed events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Collaborator,
    Internal,
}

/// Result type for sentinel operations.
pub type SentinelResult<T> = Result<T, SentinelError>;
