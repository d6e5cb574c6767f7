//! Token claim sets.

use serde::{Deserialize, Serialize};

use vitrine_core::{PrincipalId, RoleSet};

/// Claims carried by the short-lived access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Principal id.
    pub sub: PrincipalId,
    /// Issuer.
    pub iss: String,
    /// Roles, normalized when the token is decoded.
    #[serde(default)]
    pub roles: RoleSet,
    /// Issued-at, Unix seconds.
    pub iat: i64,
    /// Expiry, Unix seconds.
    pub exp: i64,
    /// Unique token id, used downstream as an idempotency key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

/// Claims carried by the long-lived refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Principal id.
    pub sub: PrincipalId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Roles at sign-in time.
    #[serde(default)]
    pub roles: RoleSet,
    /// Issued-at, Unix seconds.
    pub iat: i64,
    /// Expiry, Unix seconds.
    pub exp: i64,
}

pub(crate) trait Expiring {
    fn expires_at(&self) -> i64;
}

impl Expiring for AccessClaims {
    fn expires_at(&self) -> i64 {
        self.exp
    }
}

impl Expiring for RefreshClaims {
    fn expires_at(&self) -> i64 {
        self.exp
    }
}
