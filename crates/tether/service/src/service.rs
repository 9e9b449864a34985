//! Explicit wiring of every tether component

use std::sync::Arc;

use tether_auth::{Authenticator, Scheduler, TokioScheduler};
use tether_linker::{
    EntityLinker, FileLinkStore, HttpLinkDirectory, InMemoryLinkStore, LinkStore, LocalLinker,
    UplinkedLinker,
};
use tether_translate::{Lookup, Translator};
use tether_types::{LocalId, LocalIdentity, RemoteAccount, RemoteId};
use tracing::info;

use crate::config::{StorageConfig, TetherConfig};
use crate::error::{Result, ServiceError};

/// Resolver the host provides for local identities.
pub type LocalResolver<L> = Arc<dyn Translator<LocalId, Arc<L>>>;

/// Resolver the host provides for remote accounts.
pub type RemoteResolver<R> = Arc<dyn Translator<RemoteId, Arc<R>>>;

/// A fully wired link handshake.
pub struct TetherService<L, R> {
    config: TetherConfig,
    locals: Arc<Lookup<LocalId, Arc<L>>>,
    remotes: Arc<Lookup<RemoteId, Arc<R>>>,
    linker: Arc<LocalLinker<L, R>>,
    uplinked: Option<Arc<UplinkedLinker<L, R>>>,
    authenticator: Arc<Authenticator<L, R>>,
}

impl<L, R> TetherService<L, R>
where
    L: LocalIdentity + 'static,
    R: RemoteAccount + 'static,
{
    /// Build the service on the current tokio runtime.
    pub async fn from_config(
        config: &TetherConfig,
        local_builtin: Option<LocalResolver<L>>,
        remote_builtin: Option<RemoteResolver<R>>,
    ) -> Result<Self> {
        let scheduler = TokioScheduler::try_current()
            .ok_or_else(|| ServiceError::Config("No tokio runtime to schedule on".into()))?;
        Self::with_scheduler(config, local_builtin, remote_builtin, Arc::new(scheduler)).await
    }

    /// Build the service with an explicit scheduler.
    ///
    /// Fails with `ServiceError::Config` when the auth settings are out of range.
    pub async fn with_scheduler(
        config: &TetherConfig,
        local_builtin: Option<LocalResolver<L>>,
        remote_builtin: Option<RemoteResolver<R>>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Result<Self> {
        config
            .auth
            .validate()
            .map_err(|e| ServiceError::Config(e.to_string()))?;

        let locals = Arc::new(match local_builtin {
            Some(builtin) => Lookup::with_builtin("local-identities", builtin),
            None => Lookup::new("local-identities"),
        });
        let remotes = Arc::new(match remote_builtin {
            Some(builtin) => Lookup::with_builtin("remote-accounts", builtin),
            None => Lookup::new("remote-accounts"),
        });

        let store: Arc<dyn LinkStore> = match &config.storage {
            StorageConfig::Memory => Arc::new(InMemoryLinkStore::new()),
            StorageConfig::File { path } => Arc::new(FileLinkStore::open(path.clone()).await?),
        };
        let linker = Arc::new(LocalLinker::new(store, locals.clone(), remotes.clone()));

        let uplinked = match &config.uplink {
            Some(uplink) => {
                let directory = HttpLinkDirectory::new(uplink.base_url.clone(), uplink.timeout())?;
                info!(base_url = %uplink.base_url, "Reading links from directory");
                Some(Arc::new(UplinkedLinker::new(
                    Arc::new(directory),
                    locals.clone(),
                    remotes.clone(),
                )))
            }
            None => None,
        };

        let authenticator = Arc::new(Authenticator::new(
            linker.clone(),
            scheduler,
            config.auth.clone(),
        ));

        info!(
            storage = ?config.storage,
            token_ttl_secs = config.auth.token_ttl_secs,
            "Tether service ready"
        );

        Ok(Self {
            config: config.clone(),
            locals,
            remotes,
            linker,
            uplinked,
            authenticator,
        })
    }

    pub fn config(&self) -> &TetherConfig {
        &self.config
    }

    /// Lookup for local identities; register extra resolvers here.
    pub fn local_lookup(&self) -> &Arc<Lookup<LocalId, Arc<L>>> {
        &self.locals
    }

    /// Lookup for remote accounts; register extra resolvers here.
    pub fn remote_lookup(&self) -> &Arc<Lookup<RemoteId, Arc<R>>> {
        &self.remotes
    }

    /// The store-backed linker that owns link creation and removal.
    pub fn linker(&self) -> &Arc<LocalLinker<L, R>> {
        &self.linker
    }

    pub fn uplinked(&self) -> Option<&Arc<UplinkedLinker<L, R>>> {
        self.uplinked.as_ref()
    }

    pub fn authenticator(&self) -> &Arc<Authenticator<L, R>> {
        &self.authenticator
    }

    /// The linker reads should go through: the directory when one is
    /// configured, the local store otherwise.
    pub fn reader(&self) -> Arc<dyn EntityLinker<L, R>> {
        match &self.uplinked {
            Some(uplinked) => uplinked.clone(),
            None => self.linker.clone(),
        }
    }
}
