//! Authentication stage of a local identity

use serde::{Deserialize, Serialize};

/// Where a local identity stands in the link handshake.
///
/// The cycle is `Unauthenticated -> Authenticating -> Authenticated -> Unauthenticated`,
/// with `Authenticating -> Unauthenticated` on token expiry or invalidation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStage {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated,
}

impl AuthStage {
    pub fn as_u8(self) -> u8 {
        match self {
            AuthStage::Unauthenticated => 0,
            AuthStage::Authenticating => 1,
            AuthStage::Authenticated => 2,
        }
    }

    /// Inverse of [`AuthStage::as_u8`]; unknown values read as unauthenticated.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => AuthStage::Authenticating,
            2 => AuthStage::Authenticated,
            _ => AuthStage::Unauthenticated,
        }
    }
}

impl std::fmt::Display for AuthStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthStage::Unauthenticated => write!(f, "unauthenticated"),
            AuthStage::Authenticating => write!(f, "authenticating"),
            AuthStage::Authenticated => write!(f, "authenticated"),
        }
    }
}
