//! Server configuration.
//!
//! Loaded from a TOML file, then overridden by `VITRINE_*` environment
//! variables:
//!
//! | Variable | Field |
//! |---|---|
//! | `VITRINE_BIND` | `server.bind` |
//! | `VITRINE_SESSION_ISSUER` | `session.issuer` |
//! | `VITRINE_SECURE_COOKIES` | `session.secure_cookies` |
//! | `VITRINE_ACCESS_TTL_SECS` | `session.access_ttl_secs` |
//! | `VITRINE_REFRESH_TTL_SECS` | `session.refresh_ttl_secs` |
//! | `VITRINE_ACCESS_SIGNING_KEY` | `keys.access_signing` |
//! | `VITRINE_REFRESH_SIGNING_KEY` | `keys.refresh_signing` |
//! | `VITRINE_ENCRYPTION_KEY` | `keys.encryption` |
//! | `VITRINE_GATEWAY_MODE` | `gateway.mode` |
//! | `VITRINE_GATEWAY_URL` | `gateway.base_url` |
//! | `VITRINE_GATEWAY_TIMEOUT_MS` | `gateway.timeout_ms` |
//! | `VITRINE_TOKEN_URL` | `gateway.token_url` |
//! | `VITRINE_CLIENT_ID` | `gateway.client_id` |
//! | `VITRINE_CLIENT_SECRET` | `gateway.client_secret` |
//! | `VITRINE_APPLICATION` | `gateway.application` |
//! | `VITRINE_CREDENTIAL_STORE` | `credentials.store` |
//! | `VITRINE_REDIS_URL` | `credentials.redis_url` |
//! | `VITRINE_ENFORCE_EXPIRY` | `credentials.enforce_expiry` |

use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use vitrine_core::{KeyRing, KeyRingError, Principal, RoleSet};
use vitrine_gatekeeper::RouteTable;
use vitrine_session::{
    DEFAULT_ACCESS_TTL, DEFAULT_REFRESH_TTL, SessionSettings, SettingsError,
};

/// Configuration problems found while loading or validating.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// File path.
        path: String,
        /// Parser message.
        message: String,
    },

    /// A value could not be interpreted.
    #[error("invalid value for {key}: {message}")]
    InvalidValue {
        /// Config key or environment variable.
        key: String,
        /// What was wrong.
        message: String,
    },

    /// A value required by the selected mode is absent.
    #[error("{0} is required")]
    Missing(&'static str),

    /// Session lifetimes or issuer rejected.
    #[error(transparent)]
    Session(#[from] SettingsError),

    /// Key material rejected.
    #[error(transparent)]
    Keys(#[from] KeyRingError),
}

impl ConfigError {
    fn invalid(key: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.to_string(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VitrineConfig {
    /// Listener.
    pub server: ServerConfig,
    /// Cookie and token settings.
    pub session: SessionConfig,
    /// Base64-encoded key material.
    pub keys: KeysConfig,
    /// Identity authority connection.
    pub gateway: GatewayConfig,
    /// Upstream credential cache backend.
    pub credentials: CredentialsConfig,
    /// Gatekeeper route table.
    pub routes: RouteTable,
}

/// Listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Token issuer name.
    pub issuer: String,
    /// Mark cookies `Secure`.
    pub secure_cookies: bool,
    /// Access token lifetime.
    pub access_ttl_secs: u64,
    /// Refresh token lifetime.
    pub refresh_ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            issuer: "vitrine".to_string(),
            secure_cookies: true,
            access_ttl_secs: DEFAULT_ACCESS_TTL.as_secs(),
            refresh_ttl_secs: DEFAULT_REFRESH_TTL.as_secs(),
        }
    }
}

/// Key material, standard base64.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    /// Access token signing key.
    pub access_signing: Option<String>,
    /// Refresh token signing key.
    pub refresh_signing: Option<String>,
    /// AES-256 key for refresh tokens and cached credentials.
    pub encryption: Option<String>,
}

impl fmt::Debug for KeysConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeysConfig")
            .field("access_signing", &self.access_signing.as_ref().map(|_| ".."))
            .field("refresh_signing", &self.refresh_signing.as_ref().map(|_| ".."))
            .field("encryption", &self.encryption.as_ref().map(|_| ".."))
            .finish()
    }
}

/// Which identity authority to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayMode {
    /// The authority's REST API.
    #[default]
    Http,
    /// An in-process authority seeded from `gateway.accounts`.
    Memory,
}

impl FromStr for GatewayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "memory" => Ok(Self::Memory),
            other => Err(format!("expected 'http' or 'memory', got '{other}'")),
        }
    }
}

/// An account seeded into the in-process authority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedAccount {
    /// Sign-in name.
    pub username: String,
    /// Password; absent for accounts that have not completed first access.
    #[serde(default)]
    pub password: Option<String>,
    /// Where codes are "sent".
    pub email: String,
    /// Principal id.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub display_name: String,
    /// Role names.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl SeedAccount {
    /// The principal this account signs in as.
    pub fn principal(&self) -> Principal {
        let roles: RoleSet = self.roles.iter().map(String::as_str).collect();
        Principal::new(self.id.as_str(), self.display_name.as_str(), roles)
    }
}

/// Identity authority settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Backend.
    pub mode: GatewayMode,
    /// REST API base URL.
    pub base_url: Option<String>,
    /// Per-request timeout.
    pub timeout_ms: u64,
    /// Client-credentials token endpoint.
    pub token_url: Option<String>,
    /// Client id for the exchange.
    pub client_id: Option<String>,
    /// Client secret for the exchange.
    pub client_secret: Option<String>,
    /// Application name keying the cached upstream credential.
    pub application: String,
    /// Accounts for [`GatewayMode::Memory`].
    pub accounts: Vec<SeedAccount>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            mode: GatewayMode::Http,
            base_url: None,
            timeout_ms: 5_000,
            token_url: None,
            client_id: None,
            client_secret: None,
            application: "storefront".to_string(),
            accounts: Vec::new(),
        }
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("mode", &self.mode)
            .field("base_url", &self.base_url)
            .field("timeout_ms", &self.timeout_ms)
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("application", &self.application)
            .field("accounts", &self.accounts.len())
            .finish_non_exhaustive()
    }
}

impl GatewayConfig {
    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Keyed store backing the upstream credential cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Process memory; lost on restart.
    #[default]
    Memory,
    /// Redis.
    Redis,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            other => Err(format!("expected 'memory' or 'redis', got '{other}'")),
        }
    }
}

/// Upstream credential cache settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Backend.
    pub store: StoreKind,
    /// Connection URL for [`StoreKind::Redis`].
    pub redis_url: Option<String>,
    /// Re-exchange once the cached credential's lifetime has passed.
    pub enforce_expiry: bool,
}

impl VitrineConfig {
    /// Load `path` (or defaults when `None`), apply process environment
    /// overrides and validate.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file without overrides or validation.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Apply `VITRINE_*` overrides, looking each variable up with `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("VITRINE_BIND") {
            self.server.bind = v;
        }
        if let Some(v) = lookup("VITRINE_SESSION_ISSUER") {
            self.session.issuer = v;
        }
        if let Some(v) = lookup("VITRINE_SECURE_COOKIES") {
            self.session.secure_cookies = parse_bool("VITRINE_SECURE_COOKIES", &v)?;
        }
        if let Some(v) = lookup("VITRINE_ACCESS_TTL_SECS") {
            self.session.access_ttl_secs = parse_env("VITRINE_ACCESS_TTL_SECS", &v)?;
        }
        if let Some(v) = lookup("VITRINE_REFRESH_TTL_SECS") {
            self.session.refresh_ttl_secs = parse_env("VITRINE_REFRESH_TTL_SECS", &v)?;
        }
        if let Some(v) = lookup("VITRINE_ACCESS_SIGNING_KEY") {
            self.keys.access_signing = Some(v);
        }
        if let Some(v) = lookup("VITRINE_REFRESH_SIGNING_KEY") {
            self.keys.refresh_signing = Some(v);
        }
        if let Some(v) = lookup("VITRINE_ENCRYPTION_KEY") {
            self.keys.encryption = Some(v);
        }
        if let Some(v) = lookup("VITRINE_GATEWAY_MODE") {
            self.gateway.mode = parse_env("VITRINE_GATEWAY_MODE", &v)?;
        }
        if let Some(v) = lookup("VITRINE_GATEWAY_URL") {
            self.gateway.base_url = Some(v);
        }
        if let Some(v) = lookup("VITRINE_GATEWAY_TIMEOUT_MS") {
            self.gateway.timeout_ms = parse_env("VITRINE_GATEWAY_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("VITRINE_TOKEN_URL") {
            self.gateway.token_url = Some(v);
        }
        if let Some(v) = lookup("VITRINE_CLIENT_ID") {
            self.gateway.client_id = Some(v);
        }
        if let Some(v) = lookup("VITRINE_CLIENT_SECRET") {
            self.gateway.client_secret = Some(v);
        }
        if let Some(v) = lookup("VITRINE_APPLICATION") {
            self.gateway.application = v;
        }
        if let Some(v) = lookup("VITRINE_CREDENTIAL_STORE") {
            self.credentials.store = parse_env("VITRINE_CREDENTIAL_STORE", &v)?;
        }
        if let Some(v) = lookup("VITRINE_REDIS_URL") {
            self.credentials.redis_url = Some(v);
        }
        if let Some(v) = lookup("VITRINE_ENFORCE_EXPIRY") {
            self.credentials.enforce_expiry = parse_bool("VITRINE_ENFORCE_EXPIRY", &v)?;
        }
        Ok(())
    }

    /// Check everything the server needs at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        self.session_settings()?;
        self.key_ring()?;

        if self.gateway.timeout_ms == 0 {
            return Err(ConfigError::invalid("gateway.timeout_ms", "must be positive"));
        }
        if self.gateway.mode == GatewayMode::Http {
            require(&self.gateway.base_url, "gateway.base_url")?;
            require(&self.gateway.token_url, "gateway.token_url")?;
            require(&self.gateway.client_id, "gateway.client_id")?;
            require(&self.gateway.client_secret, "gateway.client_secret")?;
            if self.gateway.application.trim().is_empty() {
                return Err(ConfigError::Missing("gateway.application"));
            }
            if self.credentials.store == StoreKind::Redis {
                require(&self.credentials.redis_url, "credentials.redis_url")?;
            }
        }
        Ok(())
    }

    /// Parsed listener address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .bind
            .parse()
            .map_err(|e| ConfigError::invalid("server.bind", e))
    }

    /// Validated session settings.
    pub fn session_settings(&self) -> Result<SessionSettings, ConfigError> {
        let settings = SessionSettings::new(&self.session.issuer, self.session.secure_cookies)?
            .with_lifetimes(
                Duration::from_secs(self.session.access_ttl_secs),
                Duration::from_secs(self.session.refresh_ttl_secs),
            )?;
        Ok(settings)
    }

    /// The key ring.
    ///
    /// With no keys configured, the in-process authority gets an ephemeral
    /// ring; the HTTP authority requires all three keys.
    pub fn key_ring(&self) -> Result<KeyRing, ConfigError> {
        let keys = &self.keys;
        match (&keys.access_signing, &keys.refresh_signing, &keys.encryption) {
            (Some(access), Some(refresh), Some(encryption)) => {
                Ok(KeyRing::from_base64(access, refresh, encryption)?)
            }
            (None, None, None) if self.gateway.mode == GatewayMode::Memory => {
                Ok(KeyRing::generate()?)
            }
            (None, _, _) => Err(ConfigError::Missing("keys.access_signing")),
            (_, None, _) => Err(ConfigError::Missing("keys.refresh_signing")),
            (_, _, None) => Err(ConfigError::Missing("keys.encryption")),
        }
    }

    /// Whether [`key_ring`](Self::key_ring) will generate throwaway keys.
    pub fn uses_ephemeral_keys(&self) -> bool {
        self.gateway.mode == GatewayMode::Memory
            && self.keys.access_signing.is_none()
            && self.keys.refresh_signing.is_none()
            && self.keys.encryption.is_none()
    }
}

fn require(value: &Option<String>, key: &'static str) -> Result<(), ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(ConfigError::Missing(key)),
    }
}

fn parse_env<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value.trim().parse().map_err(|e| ConfigError::invalid(key, e))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::invalid(key, format!("not a boolean: '{other}'"))),
    }
}
