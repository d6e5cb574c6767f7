//! The gatekeeper in front of the router.

use axum::http::StatusCode;
use axum::http::header::LOCATION;
use axum::response::Response;

use vitrine_session::ACCESS_COOKIE;

use crate::common::{TestHarness, get};

fn location(response: &Response) -> &str {
    response.headers().get(LOCATION).unwrap().to_str().unwrap()
}

#[tokio::test]
async fn test_private_page_without_session_redirects_to_sign_in() {
    let harness = TestHarness::new();
    let response = harness.send(get("/account?tab=orders", &[])).await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        location(&response),
        "/login?callbackUrl=%2Faccount%3Ftab%3Dorders"
    );
}

#[tokio::test]
async fn test_private_page_with_session_is_forwarded() {
    let harness = TestHarness::new();
    let cookies = harness.sign_in_alice().await;

    let response = harness
        .send(get("/account", &[(ACCESS_COOKIE, cookies[ACCESS_COOKIE].as_str())]))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sign_in_page_sends_signed_in_visitors_home() {
    let harness = TestHarness::new();
    let cookies = harness.sign_in_alice().await;

    let response = harness
        .send(get("/login", &[(ACCESS_COOKIE, cookies[ACCESS_COOKIE].as_str())]))
        .await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/");

    let response = harness.send(get("/login", &[])).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_role_redirects_to_not_authorized() {
    let harness = TestHarness::new();
    let cookies = harness.sign_in_alice().await;

    let response = harness
        .send(get("/admin", &[(ACCESS_COOKIE, cookies[ACCESS_COOKIE].as_str())]))
        .await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/not-authorized");
}

#[tokio::test]
async fn test_expired_access_cookie_redirects_to_sign_in() {
    let harness = TestHarness::new();
    let cookies = harness.sign_in_alice().await;
    harness.clock.advance(900);

    let response = harness
        .send(get("/account", &[(ACCESS_COOKIE, cookies[ACCESS_COOKIE].as_str())]))
        .await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/login?callbackUrl=%2Faccount");
}

#[tokio::test]
async fn test_session_endpoints_are_not_redirected() {
    let harness = TestHarness::new();
    let response = harness.send(get("/session/whoami", &[])).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(LOCATION).is_none());
}

#[tokio::test]
async fn test_paths_beside_session_prefix_stay_private() {
    let harness = TestHarness::new();
    for uri in ["/sessions", "/session-admin"] {
        let response = harness.send(get(uri, &[])).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert!(location(&response).starts_with("/login?callbackUrl="));
    }
}
