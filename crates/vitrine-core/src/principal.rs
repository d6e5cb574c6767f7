//! Authenticated identities.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::role::RoleSet;

/// Opaque principal identifier.
///
/// Identity authorities report ids as either JSON strings or numbers; both
/// deserialize to the same textual form, so `42` and `"42"` are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PrincipalId(String);

impl PrincipalId {
    /// Wrap an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PrincipalId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for PrincipalId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl<'de> Deserialize<'de> for PrincipalId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(u64),
        }

        match RawId::deserialize(deserializer)? {
            RawId::Text(text) if text.trim().is_empty() => {
                Err(serde::de::Error::custom("principal id must not be blank"))
            }
            RawId::Text(text) => Ok(Self(text)),
            RawId::Number(n) => Ok(Self(n.to_string())),
        }
    }
}

/// Whether the account has completed first-access enrollment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EstablishmentState {
    /// First access pending; the account has no password yet.
    Unestablished,
    /// Password set; the account can sign in.
    #[default]
    Established,
}

/// An identity as reported by the identity gateway. Read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    /// Unique identifier.
    pub id: PrincipalId,
    /// Name shown in the storefront header.
    #[serde(default)]
    pub display_name: String,
    /// Normalized roles.
    #[serde(default)]
    pub roles: RoleSet,
    /// Enrollment state.
    #[serde(default)]
    pub establishment_state: EstablishmentState,
}

impl Principal {
    /// Build an established principal.
    pub fn new(id: impl Into<PrincipalId>, display_name: impl Into<String>, roles: RoleSet) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            roles,
            establishment_state: EstablishmentState::Established,
        }
    }
}
