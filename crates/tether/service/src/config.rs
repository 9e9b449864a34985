//! Configuration for a tether service

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tether_auth::AuthConfig;

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TetherConfig {
    /// Token handshake configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Where links are kept
    #[serde(default)]
    pub storage: StorageConfig,

    /// External link directory; when set, reads go through it
    #[serde(default)]
    pub uplink: Option<UplinkConfig>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Link storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory links, lost on restart
    #[default]
    Memory,

    /// Append-only journal file
    File {
        /// Journal path
        path: PathBuf,
    },
}

/// Link directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UplinkConfig {
    /// Directory base URL; lookups go to `{base_url}/lookup?{id}`
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_uplink_timeout")]
    pub timeout_secs: u64,
}

impl UplinkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_uplink_timeout() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TetherConfig {
    /// Load configuration: defaults, then the optional file, then
    /// `TETHER_`-prefixed environment variables.
    ///
    /// Nested keys are separated by a double underscore, as in
    /// `TETHER_AUTH__TOKEN_TTL_SECS=120`.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&TetherConfig::default())?);

        // Add file configuration if provided
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        // Add environment variables with TETHER_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("TETHER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
