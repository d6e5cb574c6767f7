//! Identity gateway adapter.
//!
//! Provides:
//! - [`IdentityGateway`]: the boundary to the external identity authority
//! - [`HttpIdentityGateway`]: reqwest client with a bounded per-call timeout
//! - [`ClientCredentialsExchange`]: static application credential exchange
//!   feeding the upstream credential cache
//! - [`MemoryIdentityGateway`]: an in-process authority for tests and local
//!   development
//!
//! Adapters never retry internally; every call is safe to retry at the call
//! site.

#![forbid(unsafe_code)]

mod http;
mod memory;
mod types;

use std::sync::Arc;

use async_trait::async_trait;

use vitrine_core::{GatewayError, Principal};

pub use http::{ClientCredentialsExchange, HttpIdentityGateway};
pub use memory::{MemoryIdentityGateway, SentNotification};
pub use types::{AccountStatus, NewPassword, PasswordChange, PreAuthentication, RecoveryCode};

/// The external identity authority.
#[async_trait]
pub trait IdentityGateway: Send + Sync + 'static {
    /// Look up the account state for `username`.
    ///
    /// For accounts that have not completed first access the authority
    /// sends a one-time code and reports [`AccountStatus::CodeSent`].
    async fn pre_authenticate(&self, username: &str) -> Result<PreAuthentication, GatewayError>;

    /// Verify a username/password pair.
    async fn authenticate(&self, username: &str, password: &str)
    -> Result<Principal, GatewayError>;

    /// Check a one-time code without consuming it.
    async fn verify_one_time_code(&self, username: &str, code: &str) -> Result<(), GatewayError>;

    /// Issue a recovery code; the authority notifies the user out of band.
    async fn request_recovery_code(&self, username: &str) -> Result<RecoveryCode, GatewayError>;

    /// Set a new password using a verified one-time code.
    ///
    /// Mismatched confirmations are impossible here: [`NewPassword`] can
    /// only be built from matching inputs.
    async fn set_password(
        &self,
        username: &str,
        code: &str,
        password: &NewPassword,
    ) -> Result<PasswordChange, GatewayError>;
}

#[async_trait]
impl<T: IdentityGateway + ?Sized> IdentityGateway for Arc<T> {
    async fn pre_authenticate(&self, username: &str) -> Result<PreAuthentication, GatewayError> {
        (**self).pre_authenticate(username).await
    }

    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Principal, GatewayError> {
        (**self).authenticate(username, password).await
    }

    async fn verify_one_time_code(&self, username: &str, code: &str) -> Result<(), GatewayError> {
        (**self).verify_one_time_code(username, code).await
    }

    async fn request_recovery_code(&self, username: &str) -> Result<RecoveryCode, GatewayError> {
        (**self).request_recovery_code(username).await
    }

    async fn set_password(
        &self,
        username: &str,
        code: &str,
        password: &NewPassword,
    ) -> Result<PasswordChange, GatewayError> {
        (**self).set_password(username, code, password).await
    }
}
