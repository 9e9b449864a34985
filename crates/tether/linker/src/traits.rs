//! Linker seams: the read side and the mutation side

use std::sync::Arc;

use async_trait::async_trait;
use tether_types::{LocalId, LocalIdentity, RemoteAccount, RemoteId};

use crate::error::Result;

/// Resolves the counterpart of an entity across a link.
///
/// An entity without a link resolves to `Ok(None)`.
#[async_trait]
pub trait EntityLinker<L, R>: Send + Sync
where
    L: LocalIdentity + 'static,
    R: RemoteAccount + 'static,
{
    /// The remote account linked to `local`
    async fn translate_to_remote(&self, local: &L) -> Result<Option<Arc<R>>>;

    /// The local identity linked to `remote`
    async fn translate_to_local(&self, remote: &R) -> Result<Option<Arc<L>>>;

    /// The remote account linked to the local identity with this id
    async fn translate_local_id(&self, local: &LocalId) -> Result<Option<Arc<R>>>;

    /// The local identity linked to the remote account with this id
    async fn translate_remote_id(&self, remote: &RemoteId) -> Result<Option<Arc<L>>>;
}

/// The mutation side of a linker.
///
/// Implementations set the local identity's authentication stage as part of
/// every successful push or remove.
#[async_trait]
pub trait AuthenticationStore<L, R>: Send + Sync
where
    L: LocalIdentity + 'static,
    R: RemoteAccount + 'static,
{
    /// Link the pair unless the local identity (or the remote account) is
    /// already linked. `Ok(false)` means "already linked".
    ///
    /// Of several concurrent pushes for the same local identity, exactly one
    /// returns `Ok(true)`.
    async fn push(&self, local: &L, remote: &R) -> Result<bool>;

    /// Remove the link keyed by whichever side is given.
    ///
    /// Exactly one of `local` and `remote` must be provided. `Ok(false)` means
    /// there was no such link.
    async fn remove(&self, local: Option<&L>, remote: Option<&R>) -> Result<bool>;

    /// Whether either supplied entity takes part in any link.
    async fn contains(&self, local: Option<&L>, remote: Option<&R>) -> Result<bool>;
}
