//! Vitrine session issuing and refreshing.
//!
//! A session is two cookies:
//!
//! | Cookie | Content | Max-Age |
//! |---|---|---|
//! | `access` | HS256 access token (access-signing key) | 900s |
//! | `refreshToken` | HS256 refresh token (refresh-signing key), encrypted | 604800s |
//!
//! [`SessionIssuer`] mints both after primary authentication.
//! [`SessionRefresher`] turns a refresh cookie into a new access cookie.
//! [`AccessTokenCodec`] verifies access tokens for the gatekeeper and the
//! `whoami` endpoint.

#![forbid(unsafe_code)]

pub mod claims;
pub mod cookies;
pub mod error;
pub mod issuer;
pub mod refresher;
pub mod settings;
pub mod token;

pub use claims::{AccessClaims, RefreshClaims};
pub use error::{Result, SESSION_EXPIRED_MESSAGE, SessionError, SettingsError};
pub use issuer::{IssuedSession, SessionIssuer};
pub use refresher::{RefreshedSession, SessionRefresher};
pub use settings::{
    ACCESS_COOKIE, DEFAULT_ACCESS_TTL, DEFAULT_REFRESH_TTL, REFRESH_COOKIE, SessionSettings,
};
pub use token::{AccessTokenCodec, RefreshTokenCodec};
