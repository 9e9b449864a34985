//! Service error types

use tether_linker::{LinkerError, StoreError};
use thiserror::Error;

/// Service errors
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Linker error: {0}")]
    Linker(#[from] LinkerError),

    #[error("Telemetry error: {0}")]
    Telemetry(String),
}

impl From<config::ConfigError> for ServiceError {
    fn from(err: config::ConfigError) -> Self {
        ServiceError::Config(err.to_string())
    }
}

/// Result type for service operations
pub type Result<T> = std::result::Result<T, ServiceError>;
