//! Tether Service - configuration and wiring for the link handshake
//!
//! [`TetherService`] assembles lookups, the link store, the linker, the
//! optional directory-backed reader and the authenticator from a
//! [`TetherConfig`]. Hosts supply resolvers for their own entity handles.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod service;
pub mod telemetry;

// Re-exports
pub use config::{LoggingConfig, StorageConfig, TetherConfig, UplinkConfig};
pub use error::{Result, ServiceError};
pub use service::{LocalResolver, RemoteResolver, TetherService};
pub use telemetry::init_tracing;
