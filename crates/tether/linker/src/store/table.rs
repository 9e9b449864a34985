//! The bijective table behind every link store.

use std::collections::HashMap;

use tether_types::{Link, LocalId, RemoteId};

#[derive(Debug, Default, Clone)]
pub(crate) struct LinkTable {
    by_local: HashMap<LocalId, Link>,
    by_remote: HashMap<RemoteId, LocalId>,
}

impl LinkTable {
    pub(crate) fn remote_for(&self, local: &LocalId) -> Option<RemoteId> {
        self.by_local.get(local).map(|link| link.remote.clone())
    }

    pub(crate) fn local_for(&self, remote: &RemoteId) -> Option<LocalId> {
        self.by_remote.get(remote).copied()
    }

    /// Whether neither id is linked yet.
    pub(crate) fn is_vacant(&self, local: &LocalId, remote: &RemoteId) -> bool {
        !self.by_local.contains_key(local) && !self.by_remote.contains_key(remote)
    }

    /// Insert only if neither side is linked yet.
    pub(crate) fn insert_if_absent(&mut self, link: Link) -> bool {
        if !self.is_vacant(&link.local, &link.remote) {
            return false;
        }
        self.by_remote.insert(link.remote.clone(), link.local);
        self.by_local.insert(link.local, link);
        true
    }

    pub(crate) fn remove_local(&mut self, local: &LocalId) -> Option<RemoteId> {
        let link = self.by_local.remove(local)?;
        self.by_remote.remove(&link.remote);
        Some(link.remote)
    }

    pub(crate) fn remove_remote(&mut self, remote: &RemoteId) -> Option<LocalId> {
        let local = self.by_remote.remove(remote)?;
        self.by_local.remove(&local);
        Some(local)
    }

    pub(crate) fn links(&self) -> Vec<Link> {
        self.by_local.values().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_local.len()
    }
}
