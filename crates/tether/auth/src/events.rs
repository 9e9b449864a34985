//! Handshake lifecycle events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tether_types::{LocalId, RemoteId};

/// What happened to a token or a link.
///
/// Events never carry token values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuthEvent {
    TokenIssued {
        local: LocalId,
        expires_at: DateTime<Utc>,
    },
    TokenExpired {
        local: LocalId,
    },
    TokenInvalidated {
        local: LocalId,
    },
    Linked {
        local: LocalId,
        remote: RemoteId,
    },
    Unlinked {
        local: Option<LocalId>,
        remote: Option<RemoteId>,
    },
}
