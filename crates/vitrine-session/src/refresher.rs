//! Access token renewal from a refresh cookie.
//!
//! The refresh token is never re-minted: each call opens the same sealed
//! value and mints a fresh access token from its claims. Two calls with the
//! same refresh value produce two independent, equally valid access tokens.

use std::sync::Arc;

use axum_extra::extract::cookie::Cookie;

use vitrine_core::{Clock, KeyRing};

use crate::claims::AccessClaims;
use crate::cookies;
use crate::error::Result;
use crate::settings::SessionSettings;
use crate::token::{AccessTokenCodec, RefreshTokenCodec};

/// A renewed access cookie.
pub struct RefreshedSession {
    /// The new `access` cookie.
    pub access_cookie: Cookie<'static>,
    /// Claims of the new access token.
    pub claims: AccessClaims,
    /// Display name carried by the refresh token.
    pub display_name: String,
}

/// Exchanges a refresh cookie value for a new access cookie.
pub struct SessionRefresher {
    access: AccessTokenCodec,
    refresh: RefreshTokenCodec,
    settings: SessionSettings,
}

impl SessionRefresher {
    /// Create a refresher.
    pub fn new(keys: &KeyRing, settings: SessionSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            access: AccessTokenCodec::new(keys, &settings, clock.clone()),
            refresh: RefreshTokenCodec::new(keys, &settings, clock),
            settings,
        }
    }

    /// Decrypt and verify `refresh_cookie_value`, then mint a new access
    /// cookie from its subject and roles.
    pub fn refresh(&self, refresh_cookie_value: &str) -> Result<RefreshedSession> {
        let payload = self.refresh.open(refresh_cookie_value).inspect_err(|e| {
            log::debug!("Refresh credential rejected: {e}");
        })?;
        let (token, claims) = self.access.mint(&payload.sub, &payload.roles)?;

        Ok(RefreshedSession {
            access_cookie: cookies::access_cookie(token, &self.settings),
            claims,
            display_name: payload.name,
        })
    }
}
