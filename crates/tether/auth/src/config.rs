//! Authenticator configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AuthError, Result};

/// Longest accepted token lifetime, one day.
pub const MAX_TOKEN_TTL_SECS: u64 = 24 * 60 * 60;

/// Authenticator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Seconds a token stays valid after issuance
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,

    /// Buffered events per subscriber before the slowest one starts lagging
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_token_ttl_secs() -> u64 {
    60
}

fn default_event_capacity() -> usize {
    256
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_secs: default_token_ttl_secs(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl AuthConfig {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }

    /// Reject lifetimes that issue dead tokens or overflow deadline arithmetic.
    pub fn validate(&self) -> Result<()> {
        if self.token_ttl_secs == 0 || self.token_ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(AuthError::Config(format!(
                "token_ttl_secs must be between 1 and {}, got {}",
                MAX_TOKEN_TTL_SECS, self.token_ttl_secs
            )));
        }
        Ok(())
    }
}
