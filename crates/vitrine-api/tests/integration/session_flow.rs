//! Sign-in, refresh, whoami, token-id and logout through the router.

use axum::http::StatusCode;
use axum::http::header::SET_COOKIE;
use axum_extra::extract::cookie::SameSite;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::json;

use vitrine_session::{ACCESS_COOKIE, REFRESH_COOKIE, SESSION_EXPIRED_MESSAGE};

use crate::common::{TestHarness, get, json_body, parsed_set_cookies, post_json, set_cookies};

fn flip_last_byte(sealed: &str) -> String {
    let mut bytes = URL_SAFE_NO_PAD.decode(sealed).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;
    URL_SAFE_NO_PAD.encode(bytes)
}

#[tokio::test]
async fn test_sign_in_issues_cookies_for_subject_42() {
    let harness = TestHarness::new();
    let response = harness
        .send(post_json(
            "/session",
            json!({"username": "alice", "password": "correct-pw"}),
            &[],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = set_cookies(&response);
    let body = json_body(response).await;
    assert_eq!(body["principal"]["id"], "42");
    assert_eq!(body["principal"]["roles"], json!(["cliente"]));

    let access = harness.access_codec().verify(&cookies[ACCESS_COOKIE]).unwrap();
    assert_eq!(access.sub.as_str(), "42");
    assert_eq!(access.iss, "vitrine");

    let refresh = harness.refresh_codec().open(&cookies[REFRESH_COOKIE]).unwrap();
    assert_eq!(refresh.sub.as_str(), "42");
    assert_eq!(refresh.name, "Alice");
}

#[tokio::test]
async fn test_session_cookie_attributes() {
    let harness = TestHarness::new();
    let response = harness
        .send(post_json(
            "/session",
            json!({"username": "alice", "password": "correct-pw"}),
            &[],
        ))
        .await;

    let cookies = parsed_set_cookies(&response);
    assert_eq!(cookies.len(), 2);
    for cookie in &cookies {
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
    }
    let max_age = |name: &str| {
        cookies
            .iter()
            .find(|c| c.name() == name)
            .and_then(|c| c.max_age())
            .map(|d| d.whole_seconds())
    };
    assert_eq!(max_age(ACCESS_COOKIE), Some(900));
    assert_eq!(max_age(REFRESH_COOKIE), Some(604_800));
}

#[tokio::test]
async fn test_wrong_password_sets_no_cookies() {
    let harness = TestHarness::new();
    let response = harness
        .send(post_json(
            "/session",
            json!({"username": "alice", "password": "wrong"}),
            &[],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(SET_COOKIE).is_none());
    let body = json_body(response).await;
    assert_eq!(body["field"], "password");
}

#[tokio::test]
async fn test_blank_username_is_rejected_before_the_authority() {
    let harness = TestHarness::new();
    let response = harness
        .send(post_json(
            "/session",
            json!({"username": "  ", "password": "x"}),
            &[],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["field"], "username");
}

#[tokio::test]
async fn test_refresh_renews_access_cookie_only() {
    let harness = TestHarness::new();
    let cookies = harness.sign_in_alice().await;
    harness.clock.advance(600);

    let response = harness
        .send(get(
            "/session/refresh",
            &[(REFRESH_COOKIE, cookies[REFRESH_COOKIE].as_str())],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let renewed = set_cookies(&response);
    assert!(!renewed.contains_key(REFRESH_COOKIE));
    let claims = harness.access_codec().verify(&renewed[ACCESS_COOKIE]).unwrap();
    assert_eq!(claims.sub.as_str(), "42");
    assert_eq!(claims.exp, crate::common::NOW + 600 + 900);

    let body = json_body(response).await;
    assert_eq!(body["principalId"], "42");
}

#[tokio::test]
async fn test_refresh_is_repeatable() {
    let harness = TestHarness::new();
    let cookies = harness.sign_in_alice().await;
    let refresh = cookies[REFRESH_COOKIE].as_str();

    for _ in 0..2 {
        let response = harness
            .send(get("/session/refresh", &[(REFRESH_COOKIE, refresh)]))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn test_tampered_refresh_cookie_is_forbidden() {
    let harness = TestHarness::new();
    let cookies = harness.sign_in_alice().await;
    let tampered = flip_last_byte(&cookies[REFRESH_COOKIE]);

    let response = harness
        .send(get("/session/refresh", &[(REFRESH_COOKIE, tampered.as_str())]))
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(response.headers().get(SET_COOKIE).is_none());
    assert_eq!(json_body(response).await["error"], SESSION_EXPIRED_MESSAGE);
}

#[tokio::test]
async fn test_expired_refresh_cookie_is_forbidden() {
    let harness = TestHarness::new();
    let cookies = harness.sign_in_alice().await;
    harness.clock.advance(604_800);

    let response = harness
        .send(get(
            "/session/refresh",
            &[(REFRESH_COOKIE, cookies[REFRESH_COOKIE].as_str())],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["error"], SESSION_EXPIRED_MESSAGE);
}

#[tokio::test]
async fn test_refresh_without_cookie_is_forbidden() {
    let harness = TestHarness::new();
    let response = harness.send(get("/session/refresh", &[])).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_whoami() {
    let harness = TestHarness::new();
    let cookies = harness.sign_in_alice().await;

    let response = harness
        .send(get(
            "/session/whoami",
            &[(ACCESS_COOKIE, cookies[ACCESS_COOKIE].as_str())],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({"principalId": "42", "roles": ["cliente"]})
    );
}

#[tokio::test]
async fn test_whoami_requires_valid_access_cookie() {
    let harness = TestHarness::new();
    let cookies = harness.sign_in_alice().await;

    let response = harness.send(get("/session/whoami", &[])).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = harness
        .send(get("/session/whoami", &[(ACCESS_COOKIE, "garbage")]))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    harness.clock.advance(900);
    let response = harness
        .send(get(
            "/session/whoami",
            &[(ACCESS_COOKIE, cookies[ACCESS_COOKIE].as_str())],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_id_matches_claims_and_differs_per_session() {
    let harness = TestHarness::new();
    let first = harness.sign_in_alice().await;
    let second = harness.sign_in_alice().await;

    let mut ids = Vec::new();
    for cookies in [&first, &second] {
        let access = cookies[ACCESS_COOKIE].as_str();
        let response = harness
            .send(get("/session/token-id", &[(ACCESS_COOKIE, access)]))
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let token_id = json_body(response).await["tokenId"]
            .as_str()
            .unwrap()
            .to_string();
        let claims = harness.access_codec().verify(access).unwrap();
        assert_eq!(claims.jti.as_deref(), Some(token_id.as_str()));
        ids.push(token_id);
    }
    assert_ne!(ids[0], ids[1]);
}

#[tokio::test]
async fn test_token_id_requires_access_cookie() {
    let harness = TestHarness::new();
    let response = harness.send(get("/session/token-id", &[])).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_clears_both_cookies() {
    let harness = TestHarness::new();
    let cookies = harness.sign_in_alice().await;

    let response = harness
        .send(post_json(
            "/session/logout",
            json!({}),
            &[
                (ACCESS_COOKIE, cookies[ACCESS_COOKIE].as_str()),
                (REFRESH_COOKIE, cookies[REFRESH_COOKIE].as_str()),
            ],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let cleared = parsed_set_cookies(&response);
    assert_eq!(cleared.len(), 2);
    for cookie in &cleared {
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age().map(|d| d.whole_seconds()), Some(0));
    }
}

#[tokio::test]
async fn test_health() {
    let harness = TestHarness::new();
    let response = harness.send(get("/health", &[])).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({"status": "ok"}));
}
