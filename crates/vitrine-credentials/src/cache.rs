//! The encrypted upstream credential cache.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use vitrine_core::{Clock, ExchangedToken, GatewayError, KeyRing, UpstreamCredentialError};
use vitrine_crypto::EncryptionCodec;

use crate::store::{CredentialRow, KeyedStore};

/// Reuse policy for cached rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CachePolicy {
    /// When `true`, rows whose `updated_at + expires_in` has passed are
    /// treated as missing. Off by default: stored tokens are trusted as-is.
    pub enforce_expiry: bool,
}

/// Caches one encrypted bearer token per application.
pub struct UpstreamCredentialCache<S> {
    store: S,
    codec: EncryptionCodec,
    clock: Arc<dyn Clock>,
    policy: CachePolicy,
}

impl<S: KeyedStore> UpstreamCredentialCache<S> {
    /// Create a cache over `store`, encrypting with the key ring's
    /// encryption key.
    pub fn new(store: S, keys: &KeyRing, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            codec: EncryptionCodec::new(keys),
            clock,
            policy: CachePolicy::default(),
        }
    }

    /// Replace the reuse policy.
    #[must_use]
    pub fn with_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Return the decrypted token for `application`, if a row exists.
    pub async fn get(&self, application: &str) -> Result<Option<String>, UpstreamCredentialError> {
        let Some(row) = self.store.get(application).await? else {
            return Ok(None);
        };

        if self.policy.enforce_expiry && self.is_stale(&row) {
            log::debug!("Cached upstream credential for '{application}' is stale");
            return Ok(None);
        }

        Ok(Some(self.codec.decrypt_from_str(&row.token)?))
    }

    /// Run `exchange`, encrypt the resulting token and upsert it.
    pub async fn refresh<F, Fut>(
        &self,
        application: &str,
        exchange: F,
    ) -> Result<String, UpstreamCredentialError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ExchangedToken, GatewayError>>,
    {
        let exchanged = exchange().await?;
        let row = CredentialRow {
            application: application.to_string(),
            token: self.codec.encrypt_to_string(&exchanged.token)?,
            expires_in: exchanged.expires_in.to_string(),
            updated_at: DateTime::<Utc>::from_timestamp(self.clock.now(), 0).unwrap_or_default(),
        };
        self.store.upsert(row).await?;
        log::info!("Refreshed upstream credential for '{application}'");
        Ok(exchanged.token)
    }

    /// [`get`](Self::get), falling back to [`refresh`](Self::refresh) on a
    /// miss.
    pub async fn get_or_refresh<F, Fut>(
        &self,
        application: &str,
        exchange: F,
    ) -> Result<String, UpstreamCredentialError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ExchangedToken, GatewayError>>,
    {
        match self.get(application).await? {
            Some(token) => Ok(token),
            None => self.refresh(application, exchange).await,
        }
    }

    fn is_stale(&self, row: &CredentialRow) -> bool {
        match row.expires_in.trim().parse::<i64>() {
            Ok(lifetime) => row.updated_at.timestamp().saturating_add(lifetime) <= self.clock.now(),
            Err(_) => true,
        }
    }
}
