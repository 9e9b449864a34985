//! Link storage
//!
//! A [`LinkStore`] holds the bidirectional map between local and remote ids.
//! Every implementation keeps the map injective in both directions, and
//! [`LinkStore::insert_if_absent`] is atomic with respect to concurrent
//! inserts: of several racing inserts touching the same id, exactly one wins.

mod file;
mod memory;
mod table;

pub use file::FileLinkStore;
pub use memory::InMemoryLinkStore;

use async_trait::async_trait;
use tether_types::{Link, LocalId, RemoteId};

use crate::error::StoreResult;

/// Storage backend for links
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// The remote id linked to `local`, if any
    async fn remote_for(&self, local: &LocalId) -> StoreResult<Option<RemoteId>>;

    /// The local id linked to `remote`, if any
    async fn local_for(&self, remote: &RemoteId) -> StoreResult<Option<LocalId>>;

    /// Link the pair unless either id is already linked.
    ///
    /// Returns `false` on conflict.
    async fn insert_if_absent(&self, local: LocalId, remote: RemoteId) -> StoreResult<bool>;

    /// Unlink by local id, returning the remote id it was linked to
    async fn remove_local(&self, local: &LocalId) -> StoreResult<Option<RemoteId>>;

    /// Unlink by remote id, returning the local id it was linked to
    async fn remove_remote(&self, remote: &RemoteId) -> StoreResult<Option<LocalId>>;

    /// All current links
    async fn links(&self) -> StoreResult<Vec<Link>>;

    /// Number of current links
    async fn len(&self) -> StoreResult<usize>;

    async fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len().await? == 0)
    }
}
