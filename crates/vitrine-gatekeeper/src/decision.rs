//! The per-request authorization decision.
//!
//! Deciding never fails: an absent, malformed, expired or forged access
//! token only ever changes which redirect is chosen.

use vitrine_core::TokenError;
use vitrine_session::{AccessClaims, AccessTokenCodec};

use crate::routes::{PublicPolicy, RouteClass, RouteTable};

/// Verifies an access token. Implemented by [`AccessTokenCodec`].
pub trait AccessVerifier: Send + Sync + 'static {
    /// Verify signature and expiry, returning the decoded claims.
    fn verify(&self, token: &str) -> Result<AccessClaims, TokenError>;
}

impl AccessVerifier for AccessTokenCodec {
    fn verify(&self, token: &str) -> Result<AccessClaims, TokenError> {
        AccessTokenCodec::verify(self, token)
    }
}

/// Terminal outcome for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Let the request through.
    Allow,
    /// Send the visitor to sign in, then back to `callback`.
    RedirectToSignIn {
        /// The original path and query, verbatim.
        callback: String,
    },
    /// Signed in, but without a role the route requires.
    RedirectToNotAuthorized,
    /// Signed in and visiting a page meant for signed-out visitors.
    RedirectToHome,
}

impl Decision {
    /// Redirect target, or `None` for [`Decision::Allow`].
    pub fn location(&self, table: &RouteTable) -> Option<String> {
        match self {
            Decision::Allow => None,
            Decision::RedirectToSignIn { callback } => Some(format!(
                "{}?{}={}",
                table.sign_in,
                table.callback_param,
                urlencoding::encode(callback)
            )),
            Decision::RedirectToNotAuthorized => Some(table.not_authorized.clone()),
            Decision::RedirectToHome => Some(table.home.clone()),
        }
    }
}

/// A decision plus the claims verified along the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// The decision.
    pub decision: Decision,
    /// Claims of a valid access token, when one was checked.
    pub claims: Option<AccessClaims>,
}

impl Evaluation {
    fn bare(decision: Decision) -> Self {
        Self {
            decision,
            claims: None,
        }
    }
}

/// Decide what to do with a request for `path_and_query`.
pub fn decide<V: AccessVerifier + ?Sized>(
    path_and_query: &str,
    access_cookie: Option<&str>,
    table: &RouteTable,
    verifier: &V,
) -> Decision {
    evaluate(path_and_query, access_cookie, table, verifier).decision
}

/// Like [`decide`], also returning the verified claims.
pub fn evaluate<V: AccessVerifier + ?Sized>(
    path_and_query: &str,
    access_cookie: Option<&str>,
    table: &RouteTable,
    verifier: &V,
) -> Evaluation {
    let path = path_and_query
        .split_once('?')
        .map_or(path_and_query, |(path, _)| path);

    match table.classify(path) {
        RouteClass::PublicPrefix | RouteClass::PublicExact(PublicPolicy::AlwaysAllow) => {
            Evaluation::bare(Decision::Allow)
        }
        RouteClass::PublicExact(PublicPolicy::RedirectIfAuthenticated) => {
            match verify(access_cookie, verifier) {
                Some(_) => Evaluation::bare(Decision::RedirectToHome),
                None => Evaluation::bare(Decision::Allow),
            }
        }
        RouteClass::Private => {
            if path == table.sign_in {
                return Evaluation::bare(Decision::Allow);
            }
            let Some(claims) = verify(access_cookie, verifier) else {
                return Evaluation::bare(Decision::RedirectToSignIn {
                    callback: path_and_query.to_string(),
                });
            };
            if let Some(required) = table.required_roles(path)
                && !claims.roles.intersects(required)
            {
                log::debug!("Principal {} lacks a role required by {path}", claims.sub);
                return Evaluation::bare(Decision::RedirectToNotAuthorized);
            }
            Evaluation {
                decision: Decision::Allow,
                claims: Some(claims),
            }
        }
    }
}

fn verify<V: AccessVerifier + ?Sized>(access_cookie: Option<&str>, verifier: &V) -> Option<AccessClaims> {
    let token = access_cookie.filter(|t| !t.is_empty())?;
    verifier
        .verify(token)
        .inspect_err(|e| log::debug!("Access token rejected: {e}"))
        .ok()
}
