//! Error types for sentinel-types

use thiserror::Error;

/// Errors raised while parsing Sentinel vocabulary from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    #[error("unknown threat level: {0}")]
    UnknownThreatLevel(String),

    #[error("unknown defense level: {0}")]
    UnknownDefenseLevel(String),

    #[error("unknown system mode: {0}")]
    UnknownSystemMode(String),
}

pub type TypesResult<T> = Result<T, TypesError>;
