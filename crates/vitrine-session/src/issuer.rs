//! Session issuing after primary authentication.

use std::sync::Arc;

use axum_extra::extract::cookie::Cookie;

use vitrine_core::{Clock, KeyRing, Principal};

use crate::claims::AccessClaims;
use crate::cookies;
use crate::error::Result;
use crate::settings::SessionSettings;
use crate::token::{AccessTokenCodec, RefreshTokenCodec};

/// The two cookies produced for a new session.
pub struct IssuedSession {
    /// `access` cookie carrying the signed access token.
    pub access_cookie: Cookie<'static>,
    /// `refreshToken` cookie carrying the sealed refresh token.
    pub refresh_cookie: Cookie<'static>,
    /// Claims of the access token just minted.
    pub claims: AccessClaims,
}

/// Mints a new session for an authenticated principal.
///
/// Produces cookie values only; writing them to a response is the caller's
/// job.
pub struct SessionIssuer {
    access: AccessTokenCodec,
    refresh: RefreshTokenCodec,
    settings: SessionSettings,
}

impl SessionIssuer {
    /// Create an issuer.
    pub fn new(keys: &KeyRing, settings: SessionSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            access: AccessTokenCodec::new(keys, &settings, clock.clone()),
            refresh: RefreshTokenCodec::new(keys, &settings, clock),
            settings,
        }
    }

    /// Issue access and refresh cookies for `principal`.
    pub fn issue(&self, principal: &Principal) -> Result<IssuedSession> {
        let (access_token, claims) = self.access.mint(&principal.id, &principal.roles)?;
        let sealed = self.refresh.seal(principal)?;

        log::debug!("Issued session for principal {}", principal.id);

        Ok(IssuedSession {
            access_cookie: cookies::access_cookie(access_token, &self.settings),
            refresh_cookie: cookies::refresh_cookie(sealed, &self.settings),
            claims,
        })
    }

    /// Removal cookies that end the session in the browser.
    pub fn clear_cookies(&self) -> [Cookie<'static>; 2] {
        cookies::removal_cookies(&self.settings)
    }

    /// The settings this issuer was built with.
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }
}
