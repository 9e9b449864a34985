//! Tether Types - the shared vocabulary of the tether workspace
//!
//! Tether links two otherwise unrelated identity spaces:
//!
//! - **Local identities** ([`LocalIdentity`], keyed by [`LocalId`]) carry a
//!   mutable [`AuthStage`] owned by the authentication layer.
//! - **Remote accounts** ([`RemoteAccount`], keyed by [`RemoteId`]) are
//!   immutable once obtained from the remote system.
//!
//! A [`Link`] is a confirmed one-to-one association between the two. Absence of
//! a link or of a resolution is never an error: operations report it as
//! `Ok(None)`. Genuine faults from resolution sources are [`TranslateError`]s.

#![deny(unsafe_code)]

pub mod entity;
pub mod error;
pub mod ids;
pub mod link;
pub mod stage;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-exports
pub use entity::{has_matching_identifier, Authenticatable, Entity, LocalIdentity, RemoteAccount};
pub use error::{TranslateError, TranslateResult};
pub use ids::{LocalId, RemoteId};
pub use link::Link;
pub use stage::AuthStage;
