//! A confirmed association between a local identity and a remote account

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{LocalId, RemoteId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub local: LocalId,
    pub remote: RemoteId,
    pub linked_at: DateTime<Utc>,
}

impl Link {
    pub fn new(local: LocalId, remote: RemoteId) -> Self {
        Self {
            local,
            remote,
            linked_at: Utc::now(),
        }
    }
}

impl std::fmt::Display for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <-> {}", self.local, self.remote)
    }
}
