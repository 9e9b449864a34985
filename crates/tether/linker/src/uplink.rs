//! Directory-backed linker
//!
//! Some deployments do not own their links: a shared link directory service
//! does. [`UplinkedLinker`] asks that directory for the counterpart id, caches
//! whatever it learns, and resolves live handles through the usual lookups.
//! It is read-only; links are created and destroyed at the directory.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tether_translate::Lookup;
use tether_types::{LocalId, LocalIdentity, RemoteAccount, RemoteId};
use tracing::{debug, warn};

use crate::error::{LinkerError, Result};
use crate::store::{InMemoryLinkStore, LinkStore};
use crate::traits::EntityLinker;

/// An external authority on which ids are linked
#[async_trait]
pub trait LinkDirectory: Send + Sync {
    async fn remote_for_local(&self, local: &LocalId) -> Result<Option<RemoteId>>;

    async fn local_for_remote(&self, remote: &RemoteId) -> Result<Option<LocalId>>;
}

/// Link directory reached over HTTP.
///
/// `GET {base_url}/lookup?{id}` answers with the linked id as plain text. Any
/// status other than 200, or an empty body, means "not linked".
pub struct HttpLinkDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLinkDirectory {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LinkerError::Directory(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn lookup_url(&self, id: &str) -> String {
        format!("{}/lookup?{}", self.base_url.trim_end_matches('/'), id)
    }

    async fn query(&self, id: &str) -> Result<Option<String>> {
        let url = self.lookup_url(id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LinkerError::Directory(e.to_string()))?;

        if response.status() != reqwest::StatusCode::OK {
            debug!(url = %url, status = %response.status(), "Directory has no link");
            return Ok(None);
        }

        let body = response
            .text()
            .await
            .map_err(|e| LinkerError::Directory(e.to_string()))?;
        let body = body.trim();
        Ok((!body.is_empty()).then(|| body.to_string()))
    }
}

#[async_trait]
impl LinkDirectory for HttpLinkDirectory {
    async fn remote_for_local(&self, local: &LocalId) -> Result<Option<RemoteId>> {
        Ok(self.query(&local.to_string()).await?.map(RemoteId::new))
    }

    async fn local_for_remote(&self, remote: &RemoteId) -> Result<Option<LocalId>> {
        let Some(body) = self.query(remote.as_str()).await? else {
            return Ok(None);
        };
        match body.parse::<LocalId>() {
            Ok(local) => Ok(Some(local)),
            Err(error) => {
                warn!(remote = %remote, error = %error, "Directory answered with a malformed local id");
                Ok(None)
            }
        }
    }
}

/// Linker whose links live in a [`LinkDirectory`]
pub struct UplinkedLinker<L, R> {
    directory: Arc<dyn LinkDirectory>,
    cache: InMemoryLinkStore,
    locals: Arc<Lookup<LocalId, Arc<L>>>,
    remotes: Arc<Lookup<RemoteId, Arc<R>>>,
}

impl<L, R> UplinkedLinker<L, R>
where
    L: LocalIdentity + 'static,
    R: RemoteAccount + 'static,
{
    pub fn new(
        directory: Arc<dyn LinkDirectory>,
        locals: Arc<Lookup<LocalId, Arc<L>>>,
        remotes: Arc<Lookup<RemoteId, Arc<R>>>,
    ) -> Self {
        Self {
            directory,
            cache: InMemoryLinkStore::new(),
            locals,
            remotes,
        }
    }

    /// Forget the cached link of `local`; the next query asks the directory.
    pub async fn uncache(&self, local: &L) -> Result<()> {
        let id = local.unique_id().await;
        self.cache.remove_local(&id).await?;
        Ok(())
    }

    async fn remember(&self, local: LocalId, remote: RemoteId) -> Result<()> {
        if !self.cache.insert_if_absent(local, remote.clone()).await? {
            debug!(local = %local, remote = %remote, "Cache already holds a conflicting link");
        }
        Ok(())
    }
}

#[async_trait]
impl<L, R> EntityLinker<L, R> for UplinkedLinker<L, R>
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
        let remote = match self.cache.remote_for(local).await? {
            Some(remote) => remote,
            None => match self.directory.remote_for_local(local).await? {
                Some(remote) => {
                    self.remember(*local, remote.clone()).await?;
                    remote
                }
                None => return Ok(None),
            },
        };
        Ok(self.remotes.resolve(&remote).await?)
    }

    async fn translate_remote_id(&self, remote: &RemoteId) -> Result<Option<Arc<L>>> {
        let local = match self.cache.local_for(remote).await? {
            Some(local) => local,
            None => match self.directory.local_for_remote(remote).await? {
                Some(local) => {
                    self.remember(local, remote.clone()).await?;
                    local
                }
                None => return Ok(None),
            },
        };
        Ok(self.locals.resolve(&local).await?)
    }
}
