//! Source of the system-to-system bearer credential.
//!
//! Outbound calls to the identity gateway and the commerce API authenticate
//! as the application itself, independent of any user session. The
//! upstream credential cache implements [`BearerSource`]; tests and local
//! development use [`StaticBearer`].

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};

use crate::error::UpstreamCredentialError;

/// Result of exchanging the application's static credentials for a bearer
/// token.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ExchangedToken {
    /// The bearer token.
    #[serde(alias = "access_token")]
    pub token: String,
    /// Lifetime in seconds as reported by the issuer.
    #[serde(deserialize_with = "seconds_from_number_or_text")]
    pub expires_in: u64,
}

impl std::fmt::Debug for ExchangedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangedToken")
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

fn seconds_from_number_or_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Provides the current upstream bearer token.
#[async_trait]
pub trait BearerSource: Send + Sync + 'static {
    /// Return a bearer token usable for the next outbound call.
    async fn bearer_token(&self) -> Result<String, UpstreamCredentialError>;

    /// Replace a token the upstream rejected and return the new one.
    ///
    /// `None` means this source has nothing fresher to offer.
    async fn rotate(&self) -> Result<Option<String>, UpstreamCredentialError> {
        Ok(None)
    }
}

/// A fixed bearer token.
#[derive(Clone)]
pub struct StaticBearer(String);

impl StaticBearer {
    /// Wrap a token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticBearer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticBearer(..)")
    }
}

#[async_trait]
impl BearerSource for StaticBearer {
    async fn bearer_token(&self) -> Result<String, UpstreamCredentialError> {
        Ok(self.0.clone())
    }
}
