//! Identify, first access and password recovery through the router.

use axum::http::StatusCode;
use serde_json::json;

use vitrine_session::{ACCESS_COOKIE, REFRESH_COOKIE};

use crate::common::{TestHarness, json_body, post_json, set_cookies};

#[tokio::test]
async fn test_identify_established_account() {
    let harness = TestHarness::new();
    let response = harness
        .send(post_json("/session/identify", json!({"username": "alice"}), &[]))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["next"], "sign-in");
    assert_eq!(body["isFirstAccess"], false);
    assert!(harness.gateway.sent_notifications().is_empty());
}

#[tokio::test]
async fn test_identify_pending_account_sends_code() {
    let harness = TestHarness::new();
    let response = harness
        .send(post_json("/session/identify", json!({"username": "bob"}), &[]))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["next"], "code");
    assert_eq!(body["isFirstAccess"], true);
    assert_eq!(body["email"], "bob@example.com");
    assert!(harness.gateway.last_code_for("bob").is_some());
}

#[tokio::test]
async fn test_identify_unknown_user() {
    let harness = TestHarness::new();
    let response = harness
        .send(post_json("/session/identify", json!({"username": "carol"}), &[]))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["field"], "username");
}

#[tokio::test]
async fn test_first_access_sets_password_and_signs_in() {
    let harness = TestHarness::new();
    harness
        .send(post_json("/session/identify", json!({"username": "bob"}), &[]))
        .await;
    let code = harness.gateway.last_code_for("bob").unwrap();

    let response = harness
        .send(post_json(
            "/session/recovery/verify",
            json!({"username": "bob", "code": code, "firstAccess": true}),
            &[],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["next"], "password");

    let response = harness
        .send(post_json(
            "/session/recovery/complete",
            json!({
                "username": "bob",
                "code": code,
                "password": "first-pw",
                "confirm": "first-pw",
                "firstAccess": true
            }),
            &[],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookies(&response);
    assert!(cookies.contains_key(ACCESS_COOKIE));
    assert!(cookies.contains_key(REFRESH_COOKIE));
    assert_eq!(json_body(response).await["principal"]["id"], "43");

    let response = harness
        .send(post_json(
            "/session",
            json!({"username": "bob", "password": "first-pw"}),
            &[],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_password_recovery_replaces_password() {
    let harness = TestHarness::new();

    let response = harness
        .send(post_json(
            "/session/recovery/request",
            json!({"username": "alice"}),
            &[],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["next"], "code");
    let code = harness.gateway.last_code_for("alice").unwrap();

    let response = harness
        .send(post_json(
            "/session/recovery/verify",
            json!({"username": "alice", "code": code}),
            &[],
        ))
        .await;
    assert_eq!(json_body(response).await["next"], "reset-password");

    let response = harness
        .send(post_json(
            "/session/recovery/complete",
            json!({"username": "alice", "code": code, "password": "new-pw", "confirm": "new-pw"}),
            &[],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["principal"]["id"], "42");

    let old = harness
        .send(post_json(
            "/session",
            json!({"username": "alice", "password": "correct-pw"}),
            &[],
        ))
        .await;
    assert_eq!(old.status(), StatusCode::UNAUTHORIZED);

    let new = harness
        .send(post_json(
            "/session",
            json!({"username": "alice", "password": "new-pw"}),
            &[],
        ))
        .await;
    assert_eq!(new.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_wrong_code_is_a_code_field_error() {
    let harness = TestHarness::new();
    harness
        .send(post_json(
            "/session/recovery/request",
            json!({"username": "alice"}),
            &[],
        ))
        .await;

    let response = harness
        .send(post_json(
            "/session/recovery/verify",
            json!({"username": "alice", "code": "999999"}),
            &[],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["field"], "code");
}

#[tokio::test]
async fn test_mismatched_confirmation_keeps_code_usable() {
    let harness = TestHarness::new();
    harness
        .send(post_json(
            "/session/recovery/request",
            json!({"username": "alice"}),
            &[],
        ))
        .await;
    let code = harness.gateway.last_code_for("alice").unwrap();

    let response = harness
        .send(post_json(
            "/session/recovery/complete",
            json!({"username": "alice", "code": code, "password": "a", "confirm": "b"}),
            &[],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["field"], "confirm");

    let response = harness
        .send(post_json(
            "/session/recovery/complete",
            json!({"username": "alice", "code": code, "password": "b", "confirm": "b"}),
            &[],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_complete_requires_code() {
    let harness = TestHarness::new();
    let response = harness
        .send(post_json(
            "/session/recovery/complete",
            json!({"username": "alice", "code": " ", "password": "p", "confirm": "p"}),
            &[],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["field"], "code");
}
