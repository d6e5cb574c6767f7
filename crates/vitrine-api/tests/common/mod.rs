//! Common test utilities and harness for the session endpoint tests.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Method, Request};
use axum::response::Response;
use axum_extra::extract::cookie::Cookie;
use serde_json::Value;
use tower::ServiceExt;

use vitrine_api::{AppState, router};
use vitrine_core::{FixedClock, KeyRing, Principal, RoleSet};
use vitrine_gatekeeper::RouteTable;
use vitrine_gateway::MemoryIdentityGateway;
use vitrine_session::{AccessTokenCodec, RefreshTokenCodec, SessionSettings};

/// Time the harness clock starts at.
pub const NOW: i64 = 1_700_000_000;

/// A router over an in-process authority with two accounts:
/// - `alice` / `correct-pw`, principal 42, role `cliente`
/// - `bob`, principal 43, not yet established
pub struct TestHarness {
    /// The authority, for reading "sent" codes.
    pub gateway: Arc<MemoryIdentityGateway>,
    /// Keys the server signs and encrypts with.
    pub keys: KeyRing,
    /// Session settings the server uses.
    pub settings: SessionSettings,
    /// Shared with the server.
    pub clock: FixedClock,
    state: AppState,
}

impl TestHarness {
    /// Harness with `/admin` restricted to the `admin` role.
    pub fn new() -> Self {
        let gateway = Arc::new(
            MemoryIdentityGateway::new()
                .with_account(
                    "alice",
                    "correct-pw",
                    "alice@example.com",
                    Principal::new("42", "Alice", roles(&["Cliente"])),
                )
                .with_pending_account(
                    "bob",
                    "bob@example.com",
                    Principal::new("43", "Bob", roles(&["cliente"])),
                ),
        );
        let keys = KeyRing::new(&[1; 32], &[2; 32], &[3; 32]).unwrap();
        let settings = SessionSettings::new("vitrine", false).unwrap();
        let clock = FixedClock::new(NOW);
        let routes = RouteTable::default().with_acl("/admin", roles(&["admin"]));

        let state = AppState::new(
            gateway.clone(),
            &keys,
            settings.clone(),
            routes,
            Arc::new(clock.clone()),
        );

        Self {
            gateway,
            keys,
            settings,
            clock,
            state,
        }
    }

    /// A fresh router.
    pub fn app(&self) -> Router {
        router(self.state.clone())
    }

    /// Send one request through the router.
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.app().oneshot(request).await.unwrap()
    }

    /// Sign in as alice and return the cookies set.
    pub async fn sign_in_alice(&self) -> HashMap<String, String> {
        let response = self
            .send(post_json(
                "/session",
                serde_json::json!({"username": "alice", "password": "correct-pw"}),
                &[],
            ))
            .await;
        assert_eq!(response.status(), 200);
        set_cookies(&response)
    }

    /// Verifier for access cookies, independent of the server.
    pub fn access_codec(&self) -> AccessTokenCodec {
        AccessTokenCodec::new(&self.keys, &self.settings, Arc::new(self.clock.clone()))
    }

    /// Opener for refresh cookies, independent of the server.
    pub fn refresh_codec(&self) -> RefreshTokenCodec {
        RefreshTokenCodec::new(&self.keys, &self.settings, Arc::new(self.clock.clone()))
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a role set from names.
pub fn roles(names: &[&str]) -> RoleSet {
    names.iter().copied().collect()
}

/// A JSON POST carrying `cookies`.
pub fn post_json(uri: &str, body: Value, cookies: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");
    if let Some(header) = cookie_header(cookies) {
        builder = builder.header(COOKIE, header);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// A GET carrying `cookies`.
pub fn get(uri: &str, cookies: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(header) = cookie_header(cookies) {
        builder = builder.header(COOKIE, header);
    }
    builder.body(Body::empty()).unwrap()
}

fn cookie_header(cookies: &[(&str, &str)]) -> Option<String> {
    if cookies.is_empty() {
        return None;
    }
    Some(
        cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; "),
    )
}

/// Every `Set-Cookie` on `response`, parsed.
pub fn parsed_set_cookies(response: &Response) -> Vec<Cookie<'static>> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| Cookie::parse(v.to_str().unwrap().to_string()).unwrap())
        .collect()
}

/// `Set-Cookie` values on `response`, by cookie name.
pub fn set_cookies(response: &Response) -> HashMap<String, String> {
    parsed_set_cookies(response)
        .into_iter()
        .map(|c| (c.name().to_string(), c.value().to_string()))
        .collect()
}

/// Read the response body as JSON.
pub async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
