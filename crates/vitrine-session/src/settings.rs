//! Session lifetimes, issuer name and cookie security.

use std::time::Duration;

use crate::error::SettingsError;

/// Name of the access token cookie.
pub const ACCESS_COOKIE: &str = "access";

/// Name of the refresh token cookie.
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Default access token lifetime (15 minutes).
pub const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(15 * 60);

/// Default refresh token lifetime (7 days).
pub const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Validated session settings.
///
/// The access lifetime is always shorter than the refresh lifetime; the
/// constructors reject anything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    issuer: String,
    secure_cookies: bool,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl SessionSettings {
    /// Settings with the default lifetimes.
    ///
    /// `secure_cookies` should be `true` whenever the storefront is served
    /// over TLS.
    pub fn new(issuer: impl Into<String>, secure_cookies: bool) -> Result<Self, SettingsError> {
        let issuer = issuer.into();
        if issuer.trim().is_empty() {
            return Err(SettingsError::EmptyIssuer);
        }
        Ok(Self {
            issuer,
            secure_cookies,
            access_ttl: DEFAULT_ACCESS_TTL,
            refresh_ttl: DEFAULT_REFRESH_TTL,
        })
    }

    /// Replace both lifetimes.
    pub fn with_lifetimes(
        mut self,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Result<Self, SettingsError> {
        if access_ttl.as_secs() == 0 || access_ttl >= refresh_ttl {
            return Err(SettingsError::InvalidLifetimes {
                access_secs: access_ttl.as_secs(),
                refresh_secs: refresh_ttl.as_secs(),
            });
        }
        self.access_ttl = access_ttl;
        self.refresh_ttl = refresh_ttl;
        Ok(self)
    }

    /// The `iss` claim written into access tokens.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Whether cookies carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.secure_cookies
    }

    /// Access token lifetime.
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Refresh token lifetime.
    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }
}
