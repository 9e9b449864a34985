//! Linker error types

use tether_types::TranslateError;
use thiserror::Error;

/// Link store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt link journal: {0}")]
    Corrupt(String),
}

/// Linker errors
#[derive(Debug, Error)]
pub enum LinkerError {
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Resolution failed: {0}")]
    Translate(#[from] TranslateError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Link directory error: {0}")]
    Directory(String),
}

/// Result type for link store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type for linker operations
pub type Result<T> = std::result::Result<T, LinkerError>;
