//! Role names and role sets.
//!
//! Identity payloads carry roles in several shapes: a bare string, an object
//! with a `name` field, or an array mixing both. [`RoleSet`]'s `Deserialize`
//! implementation accepts all of them and produces a flat set of lowercase
//! names, so consumers never deal with the raw representation.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// A single lowercase role name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    /// Normalize a role name. Returns `None` for blank names.
    pub fn new(name: impl AsRef<str>) -> Option<Self> {
        let name = name.as_ref().trim();
        if name.is_empty() {
            return None;
        }
        Some(Self(name.to_lowercase()))
    }

    /// The normalized name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A role as it may appear on the wire.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawRole {
    Name(String),
    Object { name: String },
}

impl RawRole {
    fn into_role(self) -> Option<Role> {
        match self {
            RawRole::Name(name) | RawRole::Object { name } => Role::new(name),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRoles {
    Many(Vec<RawRole>),
    One(RawRole),
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawRole::deserialize(deserializer)?
            .into_role()
            .ok_or_else(|| serde::de::Error::custom("role name must not be blank"))
    }
}

/// A flat, ordered set of normalized roles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the set contains a role with this (unnormalized) name.
    pub fn contains(&self, name: &str) -> bool {
        Role::new(name).is_some_and(|role| self.0.contains(&role))
    }

    /// Whether the two sets share at least one role.
    pub fn intersects(&self, other: &RoleSet) -> bool {
        self.0.intersection(&other.0).next().is_some()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of roles.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over the roles in order.
    pub fn iter(&self) -> impl Iterator<Item = &Role> {
        self.0.iter()
    }

    /// Role names as plain strings.
    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|r| r.0.clone()).collect()
    }
}

impl<'de> Deserialize<'de> for RoleSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<RawRoles>::deserialize(deserializer)?;
        let roles = match raw {
            None => Vec::new(),
            Some(RawRoles::One(role)) => vec![role],
            Some(RawRoles::Many(roles)) => roles,
        };
        Ok(Self(roles.into_iter().filter_map(RawRole::into_role).collect()))
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a str> for RoleSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(iter.into_iter().filter_map(Role::new).collect())
    }
}

impl<'a> IntoIterator for &'a RoleSet {
    type Item = &'a Role;
    type IntoIter = std::collections::btree_set::Iter<'a, Role>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
