//! Authentication error types

use tether_linker::LinkerError;
use thiserror::Error;

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// The identity is not in a stage that permits the operation.
    #[error("State conflict: {0}")]
    StateConflict(String),

    /// No live token matches. Covers mistyped, expired and already used tokens.
    #[error("Token is not valid")]
    TokenInvalid,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Link store error: {0}")]
    Store(#[from] LinkerError),
}

/// Result type for authentication operations
pub type Result<T> = std::result::Result<T, AuthError>;
