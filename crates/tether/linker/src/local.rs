//! Store-backed linker
//!
//! [`LocalLinker`] owns the link store. It answers resolution queries by
//! reading the store and turning the stored id back into a live handle through
//! the matching [`Lookup`], and it is the [`AuthenticationStore`] the
//! authenticator mutates.

use std::sync::Arc;

use async_trait::async_trait;
use tether_translate::Lookup;
use tether_types::{AuthStage, Link, LocalId, LocalIdentity, RemoteAccount, RemoteId};
use tracing::{debug, info, warn};

use crate::error::{LinkerError, Result};
use crate::store::LinkStore;
use crate::traits::{AuthenticationStore, EntityLinker};

/// Linker over a persistent [`LinkStore`]
pub struct LocalLinker<L, R> {
    store: Arc<dyn LinkStore>,
    locals: Arc<Lookup<LocalId, Arc<L>>>,
    remotes: Arc<Lookup<RemoteId, Arc<R>>>,
}

impl<L, R> LocalLinker<L, R>
where
    L: LocalIdentity + 'static,
    R: RemoteAccount + 'static,
{
    pub fn new(
        store: Arc<dyn LinkStore>,
        locals: Arc<Lookup<LocalId, Arc<L>>>,
        remotes: Arc<Lookup<RemoteId, Arc<R>>>,
    ) -> Self {
        Self {
            store,
            locals,
            remotes,
        }
    }

    pub fn store(&self) -> &Arc<dyn LinkStore> {
        &self.store
    }

    pub fn local_lookup(&self) -> &Arc<Lookup<LocalId, Arc<L>>> {
        &self.locals
    }

    pub fn remote_lookup(&self) -> &Arc<Lookup<RemoteId, Arc<R>>> {
        &self.remotes
    }

    /// All current links
    pub async fn links(&self) -> Result<Vec<Link>> {
        Ok(self.store.links().await?)
    }
}

#[async_trait]
impl<L, R> EntityLinker<L, R> for LocalLinker<L, R>
where
    L: LocalIdentity + 'static,
    R: RemoteAccount + 'static,
{
    async fn translate_to_remote(&self, local: &L) -> Result<Option<Arc<R>>> {
        let id = local.unique_id().await;
        self.translate_local_id(&id).await
    }

    async fn translate_to_local(&self, remote: &R) -> Result<Option<Arc<L>>> {
        let id = remote.unique_id().await;
        self.translate_remote_id(&id).await
    }

    async fn translate_local_id(&self, local: &LocalId) -> Result<Option<Arc<R>>> {
        match self.store.remote_for(local).await? {
            Some(remote) => Ok(self.remotes.resolve(&remote).await?),
            None => {
                debug!(local = %local, "No link for local identity");
                Ok(None)
            }
        }
    }

    async fn translate_remote_id(&self, remote: &RemoteId) -> Result<Option<Arc<L>>> {
        match self.store.local_for(remote).await? {
            Some(local) => Ok(self.locals.resolve(&local).await?),
            None => {
                debug!(remote = %remote, "No link for remote account");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl<L, R> AuthenticationStore<L, R> for LocalLinker<L, R>
where
    L: LocalIdentity + 'static,
    R: RemoteAccount + 'static,
{
    async fn push(&self, local: &L, remote: &R) -> Result<bool> {
        let local_id = local.unique_id().await;
        let remote_id = remote.unique_id().await;

        let inserted = self
            .store
            .insert_if_absent(local_id, remote_id.clone())
            .await?;

        if inserted {
            local.set_authentication_stage(AuthStage::Authenticated);
            info!(local = %local_id, remote = %remote_id, "Linked");
        } else {
            debug!(local = %local_id, remote = %remote_id, "Push rejected, already linked");
        }
        Ok(inserted)
    }

    async fn remove(&self, local: Option<&L>, remote: Option<&R>) -> Result<bool> {
        match (local, remote) {
            (Some(local), None) => {
                let local_id = local.unique_id().await;
                match self.store.remove_local(&local_id).await? {
                    Some(remote_id) => {
                        local.set_authentication_stage(AuthStage::Unauthenticated);
                        info!(local = %local_id, remote = %remote_id, "Unlinked");
                        Ok(true)
                    }
                    None => Ok(false),
                }
            }
            (None, Some(remote)) => {
                let remote_id = remote.unique_id().await;
                let Some(local_id) = self.store.remove_remote(&remote_id).await? else {
                    return Ok(false);
                };
                info!(local = %local_id, remote = %remote_id, "Unlinked");

                // The link is gone either way; resetting the stage is best effort.
                match self.locals.resolve(&local_id).await {
                    Ok(Some(local)) => local.set_authentication_stage(AuthStage::Unauthenticated),
                    Ok(None) => {
                        debug!(local = %local_id, "Unlinked identity not resolvable, stage left as is");
                    }
                    Err(error) => {
                        warn!(local = %local_id, error = %error, "Could not resolve unlinked identity");
                    }
                }
                Ok(true)
            }
            (Some(_), Some(_)) => Err(LinkerError::Precondition(
                "remove takes either a local identity or a remote account, not both".into(),
            )),
            (None, None) => Err(LinkerError::Precondition(
                "remove requires a local identity or a remote account".into(),
            )),
        }
    }

    async fn contains(&self, local: Option<&L>, remote: Option<&R>) -> Result<bool> {
        if let Some(local) = local {
            let id = local.unique_id().await;
            if self.store.remote_for(&id).await?.is_some() {
                return Ok(true);
            }
        }
        if let Some(remote) = remote {
            let id = remote.unique_id().await;
            if self.store.local_for(&id).await?.is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
