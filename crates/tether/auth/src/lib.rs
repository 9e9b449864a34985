//! Tether Auth - link a remote account to a local identity with a one-time token
//!
//! The local identity receives a short token, the human types it on the remote
//! side, and the remote account redeems it. Tokens:
//!
//! - are five upper-case base-36 characters from a secure random source
//! - expire after a configurable time to live (60 seconds by default)
//! - are single use, and at most one is live per identity
//!
//! Expiry runs on a [`Scheduler`]: [`TokioScheduler`] in production,
//! [`ManualScheduler`] when tests drive time by hand.

#![deny(unsafe_code)]

pub mod authenticator;
pub mod config;
pub mod error;
pub mod events;
pub mod scheduler;
pub mod token;

// Re-exports
pub use authenticator::Authenticator;
pub use config::{AuthConfig, MAX_TOKEN_TTL_SECS};
pub use error::{AuthError, Result};
pub use events::AuthEvent;
pub use scheduler::{ManualScheduler, ScheduledTask, Scheduler, TokioScheduler};
pub use token::Token;
