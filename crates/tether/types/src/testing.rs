//! In-memory entities for tests across the workspace.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::entity::{Authenticatable, Entity};
use crate::ids::{LocalId, RemoteId};
use crate::stage::AuthStage;

/// A local identity whose stage lives in an atomic.
#[derive(Debug)]
pub struct TestIdentity {
    id: LocalId,
    name: String,
    stage: AtomicU8,
}

impl TestIdentity {
    pub fn new(name: &str) -> Arc<Self> {
        Self::with_id(LocalId::generate(), name)
    }

    pub fn with_id(id: LocalId, name: &str) -> Arc<Self> {
        Arc::new(Self {
            id,
            name: name.to_string(),
            stage: AtomicU8::new(AuthStage::Unauthenticated.as_u8()),
        })
    }

    pub fn id(&self) -> LocalId {
        self.id
    }
}

#[async_trait]
impl Entity for TestIdentity {
    type Id = LocalId;

    async fn unique_id(&self) -> LocalId {
        self.id
    }

    async fn name(&self) -> String {
        self.name.clone()
    }
}

impl Authenticatable for TestIdentity {
    fn authentication_stage(&self) -> AuthStage {
        AuthStage::from_u8(self.stage.load(Ordering::SeqCst))
    }

    fn set_authentication_stage(&self, stage: AuthStage) {
        self.stage.store(stage.as_u8(), Ordering::SeqCst);
    }

    fn compare_and_set_stage(&self, current: AuthStage, new: AuthStage) -> bool {
        self.stage
            .compare_exchange(
                current.as_u8(),
                new.as_u8(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }
}

/// An immutable remote account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestAccount {
    id: RemoteId,
    name: String,
}

impl TestAccount {
    pub fn new(id: &str, name: &str) -> Arc<Self> {
        Arc::new(Self {
            id: RemoteId::new(id),
            name: name.to_string(),
        })
    }

    pub fn id(&self) -> RemoteId {
        self.id.clone()
    }
}

#[async_trait]
impl Entity for TestAccount {
    type Id = RemoteId;

    async fn unique_id(&self) -> RemoteId {
        self.id.clone()
    }

    async fn name(&self) -> String {
        self.name.clone()
    }
}
