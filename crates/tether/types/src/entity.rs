//! Capabilities the host platform exposes for its entities
//!
//! Hosts implement these traits for their concrete player, user or account
//! handles. Tether only ever reads identifiers and names through them, and only
//! the authentication layer writes an identity's stage.

use async_trait::async_trait;

use crate::ids::{LocalId, RemoteId};
use crate::stage::AuthStage;

/// Anything with a stable unique identifier and a display name.
#[async_trait]
pub trait Entity: Send + Sync {
    type Id: Clone
        + Eq
        + std::hash::Hash
        + std::fmt::Debug
        + std::fmt::Display
        + Send
        + Sync
        + 'static;

    /// The entity's unique identifier.
    async fn unique_id(&self) -> Self::Id;

    /// Human-readable name, for messages and logs.
    async fn name(&self) -> String;
}

/// An entity that takes part in the link handshake.
pub trait Authenticatable: Entity {
    fn authentication_stage(&self) -> AuthStage;

    fn set_authentication_stage(&self, stage: AuthStage);

    /// Set the stage to `new` only if it currently is `current`.
    ///
    /// The default reads then writes. Hosts whose entities can be touched from
    /// several tasks at once should override it with an atomic exchange.
    fn compare_and_set_stage(&self, current: AuthStage, new: AuthStage) -> bool {
        if self.authentication_stage() == current {
            self.set_authentication_stage(new);
            true
        } else {
            false
        }
    }
}

/// An identity in the local identifier domain.
pub trait LocalIdentity: Authenticatable<Id = LocalId> {}

impl<T> LocalIdentity for T where T: Authenticatable<Id = LocalId> + ?Sized {}

/// An account in the remote identifier domain.
pub trait RemoteAccount: Entity<Id = RemoteId> {}

impl<T> RemoteAccount for T where T: Entity<Id = RemoteId> + ?Sized {}

/// Whether two entities carry the same unique identifier.
pub async fn has_matching_identifier<A, B>(a: &A, b: &B) -> bool
where
    A: Entity + ?Sized,
    B: Entity<Id = A::Id> + ?Sized,
{
    a.unique_id().await == b.unique_id().await
}
