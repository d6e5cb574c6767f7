//! Error types for session issuing and refreshing.

use thiserror::Error;

use vitrine_core::{EncryptionError, TokenError};

/// The only text shown to a user when a session operation fails.
///
/// Every failure renders the same message, whichever verification step
/// rejected the credential.
pub const SESSION_EXPIRED_MESSAGE: &str = "session expired, please sign in again";

/// Failures minting, refreshing or opening a session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// A token failed to sign or verify.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// The refresh credential failed to encrypt or decrypt.
    #[error(transparent)]
    Encryption(#[from] EncryptionError),
}

impl SessionError {
    /// The message to show the user.
    pub fn user_message(&self) -> &'static str {
        SESSION_EXPIRED_MESSAGE
    }

    /// Whether the presented credential was at fault (403) rather than the
    /// server (500).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SessionError::Token(
                TokenError::Malformed(_) | TokenError::Expired | TokenError::SignatureInvalid
            ) | SessionError::Encryption(EncryptionError::Malformed)
        )
    }
}

/// Rejected session settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// The token issuer name was blank.
    #[error("session issuer must not be empty")]
    EmptyIssuer,

    /// The access lifetime must be positive and shorter than the refresh
    /// lifetime.
    #[error("access lifetime ({access_secs}s) must be positive and shorter than refresh lifetime ({refresh_secs}s)")]
    InvalidLifetimes {
        /// Access token lifetime in seconds.
        access_secs: u64,
        /// Refresh token lifetime in seconds.
        refresh_secs: u64,
    },
}

/// Convenience `Result` alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
