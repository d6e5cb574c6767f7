//! Shared handler state and its construction from configuration.

use std::sync::Arc;

use thiserror::Error;

use vitrine_core::{BearerSource, Clock, GatewayError, KeyRing, StorageError, SystemClock};
use vitrine_credentials::{
    CachePolicy, KeyedStore, MemoryCredentialStore, RedisCredentialStore, UpstreamBearer,
    UpstreamCredentialCache,
};
use vitrine_flow::{AuthFlowState, FlowController};
use vitrine_gatekeeper::{PublicPolicy, RouteTable};
use vitrine_gateway::{
    ClientCredentialsExchange, HttpIdentityGateway, IdentityGateway, MemoryIdentityGateway,
};
use vitrine_session::{AccessTokenCodec, SessionIssuer, SessionRefresher, SessionSettings};

use crate::config::{ConfigError, GatewayMode, StoreKind, VitrineConfig};

/// Path prefix of the session endpoints.
pub const SESSION_PREFIX: &str = "/session";

/// Liveness endpoint.
pub const HEALTH_PATH: &str = "/health";

/// The flow controller as the handlers use it.
pub type Controller = FlowController<Arc<dyn IdentityGateway>, Arc<SessionIssuer>>;

/// Failures building the server from configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BootstrapError {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// HTTP client construction failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The credential store could not be reached.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Everything the handlers share.
#[derive(Clone)]
pub struct AppState {
    /// The identity authority.
    pub gateway: Arc<dyn IdentityGateway>,
    /// Mints sessions.
    pub issuer: Arc<SessionIssuer>,
    /// Renews access cookies.
    pub refresher: Arc<SessionRefresher>,
    /// Verifies access cookies.
    pub access: Arc<AccessTokenCodec>,
    /// Gatekeeper rules, with the session endpoints made public.
    pub routes: RouteTable,
}

impl AppState {
    /// Assemble state from its parts.
    pub fn new(
        gateway: Arc<dyn IdentityGateway>,
        keys: &KeyRing,
        settings: SessionSettings,
        routes: RouteTable,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            gateway,
            issuer: Arc::new(SessionIssuer::new(keys, settings.clone(), clock.clone())),
            refresher: Arc::new(SessionRefresher::new(keys, settings.clone(), clock.clone())),
            access: Arc::new(AccessTokenCodec::new(keys, &settings, clock)),
            routes: expose_session_endpoints(routes),
        }
    }

    /// Build state for a validated configuration.
    pub async fn from_config(config: &VitrineConfig) -> Result<Self, BootstrapError> {
        let keys = config.key_ring()?;
        if config.uses_ephemeral_keys() {
            tracing::warn!("No keys configured; sessions will not survive a restart");
        }
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let gateway = build_gateway(config, &keys, clock.clone()).await?;
        Ok(Self::new(
            gateway,
            &keys,
            config.session_settings()?,
            config.routes.clone(),
            clock,
        ))
    }

    /// A flow controller resuming from `state`.
    pub fn controller(&self, state: AuthFlowState) -> Controller {
        FlowController::resume(self.gateway.clone(), self.issuer.clone(), state)
    }
}

/// The session endpoints answer with status codes, never with sign-in
/// redirects, so the gatekeeper must let them through.
fn expose_session_endpoints(routes: RouteTable) -> RouteTable {
    let mut routes = routes;
    if !routes.public_prefixes.iter().any(|p| p == SESSION_PREFIX) {
        routes = routes.with_public_prefix(SESSION_PREFIX);
    }
    if !routes.public.iter().any(|r| r.path == HEALTH_PATH) {
        routes = routes.with_public(HEALTH_PATH, PublicPolicy::AlwaysAllow);
    }
    routes
}

async fn build_gateway(
    config: &VitrineConfig,
    keys: &KeyRing,
    clock: Arc<dyn Clock>,
) -> Result<Arc<dyn IdentityGateway>, BootstrapError> {
    let gateway = &config.gateway;
    match gateway.mode {
        GatewayMode::Memory => {
            tracing::warn!(
                accounts = gateway.accounts.len(),
                "Using the in-process identity authority"
            );
            let authority: MemoryIdentityGateway = gateway
                .accounts
                .iter()
                .fold(MemoryIdentityGateway::new(), |authority, account| {
                    match &account.password {
                        Some(password) => authority.with_account(
                            &account.username,
                            password,
                            &account.email,
                            account.principal(),
                        ),
                        None => authority.with_pending_account(
                            &account.username,
                            &account.email,
                            account.principal(),
                        ),
                    }
                });
            let authority: Arc<dyn IdentityGateway> = Arc::new(authority);
            Ok(authority)
        }
        GatewayMode::Http => {
            let base_url = required(&gateway.base_url, "gateway.base_url")?;
            let exchange = Arc::new(ClientCredentialsExchange::new(
                required(&gateway.token_url, "gateway.token_url")?,
                required(&gateway.client_id, "gateway.client_id")?,
                required(&gateway.client_secret, "gateway.client_secret")?,
                gateway.timeout(),
            )?);
            let policy = CachePolicy {
                enforce_expiry: config.credentials.enforce_expiry,
            };

            let bearer: Arc<dyn BearerSource> = match config.credentials.store {
                StoreKind::Memory => Arc::new(upstream_bearer(
                    MemoryCredentialStore::new(),
                    keys,
                    clock,
                    policy,
                    &gateway.application,
                    exchange,
                )),
                StoreKind::Redis => {
                    let url = required(&config.credentials.redis_url, "credentials.redis_url")?;
                    let store = RedisCredentialStore::connect(url).await?;
                    Arc::new(upstream_bearer(
                        store,
                        keys,
                        clock,
                        policy,
                        &gateway.application,
                        exchange,
                    ))
                }
            };

            tracing::info!(base_url, store = ?config.credentials.store, "Using the HTTP identity authority");
            let http: Arc<dyn IdentityGateway> =
                Arc::new(HttpIdentityGateway::new(base_url, gateway.timeout(), bearer)?);
            Ok(http)
        }
    }
}

fn upstream_bearer<S: KeyedStore>(
    store: S,
    keys: &KeyRing,
    clock: Arc<dyn Clock>,
    policy: CachePolicy,
    application: &str,
    exchange: Arc<ClientCredentialsExchange>,
) -> UpstreamBearer<S> {
    let cache = UpstreamCredentialCache::new(store, keys, clock).with_policy(policy);
    UpstreamBearer::new(Arc::new(cache), application, exchange)
}

fn required<'a>(value: &'a Option<String>, key: &'static str) -> Result<&'a str, ConfigError> {
    value.as_deref().ok_or(ConfigError::Missing(key))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_session_endpoints_are_public() {
        let routes = expose_session_endpoints(RouteTable::default());
        assert_eq!(routes.public_prefixes, vec![SESSION_PREFIX.to_string()]);
        assert!(routes.public.iter().any(|r| r.path == HEALTH_PATH));
    }

    #[test]
    fn test_exposing_twice_adds_nothing() {
        let once = expose_session_endpoints(RouteTable::default());
        let twice = expose_session_endpoints(once.clone());
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn test_memory_mode_builds_seeded_authority() {
        let mut config = VitrineConfig::default();
        config.gateway.mode = GatewayMode::Memory;
        config.gateway.accounts = vec![crate::config::SeedAccount {
            username: "alice".into(),
            password: Some("correct-pw".into()),
            email: "alice@example.com".into(),
            id: "42".into(),
            display_name: "Alice".into(),
            roles: vec!["cliente".into()],
        }];

        let state = AppState::from_config(&config).await.unwrap();
        let principal = state.gateway.authenticate("alice", "correct-pw").await.unwrap();
        assert_eq!(principal.id.as_str(), "42");
    }
}
