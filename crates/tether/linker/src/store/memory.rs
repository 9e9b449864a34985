//! In-memory link store for development, tests and caches.

use async_trait::async_trait;
use parking_lot::RwLock;
use tether_types::{Link, LocalId, RemoteId};

use super::table::LinkTable;
use super::LinkStore;
use crate::error::StoreResult;

/// In-memory link store
pub struct InMemoryLinkStore {
    table: RwLock<LinkTable>,
}

impl InMemoryLinkStore {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(LinkTable::default()),
        }
    }
}

impl Default for InMemoryLinkStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LinkStore for InMemoryLinkStore {
    async fn remote_for(&self, local: &LocalId) -> StoreResult<Option<RemoteId>> {
        Ok(self.table.read().remote_for(local))
    }

    async fn local_for(&self, remote: &RemoteId) -> StoreResult<Option<LocalId>> {
        Ok(self.table.read().local_for(remote))
    }

    async fn insert_if_absent(&self, local: LocalId, remote: RemoteId) -> StoreResult<bool> {
        Ok(self.table.write().insert_if_absent(Link::new(local, remote)))
    }

    async fn remove_local(&self, local: &LocalId) -> StoreResult<Option<RemoteId>> {
        Ok(self.table.write().remove_local(local))
    }

    async fn remove_remote(&self, remote: &RemoteId) -> StoreResult<Option<LocalId>> {
        Ok(self.table.write().remove_remote(remote))
    }

    async fn links(&self) -> StoreResult<Vec<Link>> {
        Ok(self.table.read().links())
    }

    async fn len(&self) -> StoreResult<usize> {
        Ok(self.table.read().len())
    }
}
