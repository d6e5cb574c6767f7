//! Session cookie construction.

use std::time::Duration as StdDuration;

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use crate::settings::{ACCESS_COOKIE, REFRESH_COOKIE, SessionSettings};

/// Build the access cookie for a signed access token.
pub fn access_cookie(token: String, settings: &SessionSettings) -> Cookie<'static> {
    session_cookie(ACCESS_COOKIE, token, settings.access_ttl(), settings.secure_cookies())
}

/// Build the refresh cookie for a sealed refresh token.
pub fn refresh_cookie(sealed: String, settings: &SessionSettings) -> Cookie<'static> {
    session_cookie(REFRESH_COOKIE, sealed, settings.refresh_ttl(), settings.secure_cookies())
}

/// Removal cookies for both session cookies.
pub fn removal_cookies(settings: &SessionSettings) -> [Cookie<'static>; 2] {
    [
        removal_cookie(ACCESS_COOKIE, settings.secure_cookies()),
        removal_cookie(REFRESH_COOKIE, settings.secure_cookies()),
    ]
}

fn session_cookie(
    name: &'static str,
    value: String,
    max_age: StdDuration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::try_from(max_age).unwrap_or(Duration::MAX))
        .build()
}

fn removal_cookie(name: &'static str, secure: bool) -> Cookie<'static> {
    Cookie::build((name, ""))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}
