//! Error taxonomy shared across Vitrine components.
//!
//! Each component reports failures with one of these enums so that callers
//! at the HTTP edge can map them without knowing which component produced
//! them. None of the messages include secrets, tokens, or one-time codes.

use thiserror::Error;

/// Malformed input caught before any network call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// New password and its confirmation differ.
    #[error("password and confirmation do not match")]
    Mismatch,

    /// A required field was empty.
    #[error("{field} must not be empty")]
    Empty {
        /// Name of the empty field.
        field: &'static str,
    },
}

/// The external identity authority rejected a request or could not be reached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum GatewayError {
    /// Username/password pair was rejected.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// One-time code was wrong or has expired.
    #[error("invalid or expired one-time code")]
    InvalidOrExpiredCode,

    /// The username is not known to the identity authority.
    #[error("unknown user")]
    UnknownUser,

    /// Connection-level failure talking to the identity authority.
    #[error("identity gateway unreachable: {0}")]
    Unreachable(String),

    /// The outbound call exceeded its bounded timeout.
    #[error("identity gateway timed out after {millis}ms")]
    Timeout {
        /// Configured timeout in milliseconds.
        millis: u64,
    },

    /// Any other non-success HTTP status.
    #[error("identity gateway rejected the request (HTTP {status})")]
    Rejected {
        /// HTTP status code returned by the authority.
        status: u16,
    },

    /// The response body could not be understood.
    #[error("invalid gateway response: {0}")]
    InvalidResponse(String),

    /// The upstream bearer credential needed for the call was unavailable.
    #[error("upstream credential unavailable: {0}")]
    Credential(String),
}

impl GatewayError {
    /// Whether the authority rejected what the user submitted (vs. an
    /// infrastructure failure).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            GatewayError::InvalidCredentials
                | GatewayError::InvalidOrExpiredCode
                | GatewayError::UnknownUser
        )
    }

    /// Whether retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayError::Unreachable(_) | GatewayError::Timeout { .. }
        )
    }
}

/// Failures decoding or verifying a signed token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Not a well-formed token, or a required claim is missing.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The token's `exp` has passed.
    #[error("token has expired")]
    Expired,

    /// Signature does not verify against the expected key.
    #[error("invalid token signature")]
    SignatureInvalid,

    /// Minting a token failed.
    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Failures in the symmetric encryption codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncryptionError {
    /// Input lacks the expected framing or failed authentication.
    #[error("malformed ciphertext")]
    Malformed,

    /// Encrypting failed (never expected with a valid key).
    #[error("encryption failed: {0}")]
    Encrypt(String),

    /// The operating system RNG failed.
    #[error("random number generation failed: {0}")]
    Rng(String),
}

/// The keyed store backing the upstream credential cache is unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The store could not be reached.
    #[error("keyed store unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be decoded.
    #[error("corrupt row for '{key}': {reason}")]
    Corrupt {
        /// Row key.
        key: String,
        /// What was wrong with it.
        reason: String,
    },
}

/// Failures obtaining the upstream bearer credential.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamCredentialError {
    /// Keyed store failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Credential exchange against the identity gateway failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Stored credential could not be decrypted.
    #[error(transparent)]
    Encryption(#[from] EncryptionError),
}

/// Invalid key material supplied to the [`KeyRing`](crate::KeyRing).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyRingError {
    /// A key has the wrong length or encoding.
    #[error("invalid {which} key: {reason}")]
    InvalidKey {
        /// Which key was rejected.
        which: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// Access and refresh tokens must be signed with distinct keys.
    #[error("access and refresh signing keys must differ")]
    IdenticalSigningKeys,

    /// The operating system RNG failed while generating keys.
    #[error("random number generation failed: {0}")]
    Rng(String),
}
