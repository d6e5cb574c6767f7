//! Vitrine edge authorization.
//!
//! Every request is classified against a [`RouteTable`]:
//!
//! - **public exact** routes carry a [`PublicPolicy`]; signed-in visitors
//!   are sent home from `RedirectIfAuthenticated` routes,
//! - **public prefixes** always pass,
//! - everything else is **private** and needs a valid `access` cookie, plus
//!   one of the ACL roles when the path has a rule.
//!
//! [`decide`] is a pure function over the path, the cookie value and the
//! table. [`GatekeeperLayer`] applies it as Tower middleware.

#![forbid(unsafe_code)]

pub mod decision;
pub mod middleware;
pub mod routes;

pub use decision::{AccessVerifier, Decision, Evaluation, decide, evaluate};
pub use middleware::{GatekeeperLayer, GatekeeperService};
pub use routes::{PublicPolicy, PublicRoute, RouteClass, RouteTable};
