//! Cache-backed [`BearerSource`].

use std::sync::Arc;

use async_trait::async_trait;

use vitrine_core::{BearerSource, ExchangedToken, GatewayError, UpstreamCredentialError};
use vitrine_gateway::ClientCredentialsExchange;

use crate::cache::UpstreamCredentialCache;
use crate::store::KeyedStore;

/// Something that trades static application credentials for a bearer token.
#[async_trait]
pub trait CredentialExchange: Send + Sync + 'static {
    /// Perform the exchange.
    async fn exchange(&self) -> Result<ExchangedToken, GatewayError>;
}

#[async_trait]
impl CredentialExchange for ClientCredentialsExchange {
    async fn exchange(&self) -> Result<ExchangedToken, GatewayError> {
        ClientCredentialsExchange::exchange(self).await
    }
}

/// Bearer source that serves the cached token for one application and
/// exchanges for a new one on a miss.
pub struct UpstreamBearer<S> {
    cache: Arc<UpstreamCredentialCache<S>>,
    application: String,
    exchange: Arc<dyn CredentialExchange>,
}

impl<S: KeyedStore> UpstreamBearer<S> {
    /// Bind `cache` to `application`.
    pub fn new(
        cache: Arc<UpstreamCredentialCache<S>>,
        application: impl Into<String>,
        exchange: Arc<dyn CredentialExchange>,
    ) -> Self {
        Self {
            cache,
            application: application.into(),
            exchange,
        }
    }
}

#[async_trait]
impl<S: KeyedStore> BearerSource for UpstreamBearer<S> {
    async fn bearer_token(&self) -> Result<String, UpstreamCredentialError> {
        let exchange = Arc::clone(&self.exchange);
        self.cache
            .get_or_refresh(&self.application, || async move { exchange.exchange().await })
            .await
    }

    /// Force a new exchange, replacing the cached row.
    async fn rotate(&self) -> Result<Option<String>, UpstreamCredentialError> {
        log::info!("Rotating upstream credential for '{}'", self.application);
        let exchange = Arc::clone(&self.exchange);
        self.cache
            .refresh(&self.application, || async move { exchange.exchange().await })
            .await
            .map(Some)
    }
}
