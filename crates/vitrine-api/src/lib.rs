//! # vitrine-api
//!
//! HTTP surface of the storefront identity core:
//! - session endpoints driving sign-in, recovery, refresh and logout
//! - the gatekeeper applied to every request
//! - configuration loading (TOML file plus `VITRINE_*` overrides)

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::{ConfigError, VitrineConfig};
pub use error::{ApiError, Result};
pub use routes::router;
pub use state::{AppState, BootstrapError};
