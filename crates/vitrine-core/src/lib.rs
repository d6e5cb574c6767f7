//! Vitrine Core: shared types, error taxonomy, and key material.
//!
//! This crate has no internal Vitrine dependencies (dependency level 0).
//!
//! # Modules
//!
//! - [`error`]: The error taxonomy shared by every component
//! - [`principal`]: Authenticated identities as reported by the identity gateway
//! - [`role`]: Role names, normalized once at ingress
//! - [`keyring`]: The injected signing and encryption secrets
//! - [`clock`]: Wall-clock abstraction used for token lifetimes
//! - [`bearer`]: Source of the system-to-system upstream bearer credential

#![forbid(unsafe_code)]

pub mod bearer;
pub mod clock;
pub mod error;
pub mod keyring;
pub mod principal;
pub mod role;

// Re-export key types at crate root for convenience
pub use bearer::{BearerSource, ExchangedToken, StaticBearer};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{
    EncryptionError, GatewayError, KeyRingError, StorageError, TokenError, UpstreamCredentialError,
    ValidationError,
};
pub use keyring::KeyRing;
pub use principal::{EstablishmentState, Principal, PrincipalId};
pub use role::{Role, RoleSet};
