//! Route table: public routes, public prefixes and the role ACL.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use vitrine_core::RoleSet;

/// What a public exact route does for a visitor who is already signed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PublicPolicy {
    /// Send signed-in visitors to the home route (e.g. the sign-in page).
    RedirectIfAuthenticated,
    /// Let everyone through.
    #[default]
    AlwaysAllow,
}

/// A public route matched by exact path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicRoute {
    /// Exact path.
    pub path: String,
    /// Behavior for signed-in visitors.
    #[serde(default)]
    pub policy: PublicPolicy,
}

/// How a path is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Listed as a public exact route.
    PublicExact(PublicPolicy),
    /// Starts with a public prefix.
    PublicPrefix,
    /// Everything else.
    Private,
}

/// Routing rules consulted on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteTable {
    /// Sign-in route.
    pub sign_in: String,
    /// Home route.
    pub home: String,
    /// Where principals lacking a required role are sent.
    pub not_authorized: String,
    /// Query parameter carrying the original path to the sign-in route.
    pub callback_param: String,
    /// Public exact routes.
    pub public: Vec<PublicRoute>,
    /// Public path prefixes.
    pub public_prefixes: Vec<String>,
    /// Exact path to the roles allowed to reach it.
    pub acl: BTreeMap<String, RoleSet>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self {
            sign_in: "/login".to_string(),
            home: "/".to_string(),
            not_authorized: "/not-authorized".to_string(),
            callback_param: "callbackUrl".to_string(),
            public: vec![
                PublicRoute {
                    path: "/login".to_string(),
                    policy: PublicPolicy::RedirectIfAuthenticated,
                },
                PublicRoute {
                    path: "/not-authorized".to_string(),
                    policy: PublicPolicy::AlwaysAllow,
                },
            ],
            public_prefixes: Vec::new(),
            acl: BTreeMap::new(),
        }
    }
}

impl RouteTable {
    /// Add a public exact route.
    #[must_use]
    pub fn with_public(mut self, path: impl Into<String>, policy: PublicPolicy) -> Self {
        self.public.push(PublicRoute {
            path: path.into(),
            policy,
        });
        self
    }

    /// Add a public prefix.
    #[must_use]
    pub fn with_public_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.public_prefixes.push(prefix.into());
        self
    }

    /// Require one of `roles` for `path`.
    #[must_use]
    pub fn with_acl(mut self, path: impl Into<String>, roles: RoleSet) -> Self {
        self.acl.insert(path.into(), roles);
        self
    }

    /// Classify a path (no query string).
    ///
    /// Exact routes win over prefixes. A prefix covers itself and the paths
    /// below it, so `/session` covers `/session/refresh` but not `/sessions`.
    pub fn classify(&self, path: &str) -> RouteClass {
        if let Some(route) = self.public.iter().find(|r| r.path == path) {
            return RouteClass::PublicExact(route.policy);
        }
        if self
            .public_prefixes
            .iter()
            .any(|prefix| is_under(path, prefix))
        {
            return RouteClass::PublicPrefix;
        }
        RouteClass::Private
    }

    /// Roles required for `path`, if an ACL rule matches.
    pub fn required_roles(&self, path: &str) -> Option<&RoleSet> {
        self.acl.get(path).filter(|roles| !roles.is_empty())
    }
}

fn is_under(path: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return false;
    }
    path.strip_prefix(prefix.trim_end_matches('/'))
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}
