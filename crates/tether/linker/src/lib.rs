//! Tether Linker - bidirectional links between local identities and remote accounts
//!
//! - [`LinkStore`]: the bijective link map ([`InMemoryLinkStore`], [`FileLinkStore`])
//! - [`LocalLinker`]: resolves counterparts through the store and the lookups,
//!   and is the [`AuthenticationStore`] that creates and destroys links
//! - [`UplinkedLinker`]: read-only linker backed by an external [`LinkDirectory`]
//!
//! An unlinked entity resolves to `Ok(None)`. Creating a link is
//! insert-if-absent: of several concurrent pushes for the same identity,
//! exactly one succeeds.

#![deny(unsafe_code)]

pub mod error;
pub mod local;
pub mod store;
pub mod traits;
pub mod uplink;

// Re-exports
pub use error::{LinkerError, Result, StoreError, StoreResult};
pub use local::LocalLinker;
pub use store::{FileLinkStore, InMemoryLinkStore, LinkStore};
pub use traits::{AuthenticationStore, EntityLinker};
pub use uplink::{HttpLinkDirectory, LinkDirectory, UplinkedLinker};
