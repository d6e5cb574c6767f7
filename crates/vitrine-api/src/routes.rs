//! Session endpoints.
//!
//! | Method | Path | Purpose |
//! |---|---|---|
//! | `POST` | `/session` | username + password sign-in, sets both cookies |
//! | `POST` | `/session/identify` | username step: can sign in, or a code was sent |
//! | `GET` | `/session/refresh` | new access cookie from the refresh cookie |
//! | `POST` | `/session/recovery/request` | send a recovery code |
//! | `POST` | `/session/recovery/verify` | check a code |
//! | `POST` | `/session/recovery/complete` | set a password and sign in |
//! | `GET` | `/session/whoami` | principal id and roles from the access cookie |
//! | `GET` | `/session/token-id` | the access token's unique id |
//! | `POST` | `/session/logout` | clear both cookies |
//! | `GET` | `/health` | liveness |
//!
//! The whole router sits behind the gatekeeper, so any other path is
//! subject to the route table.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use vitrine_core::{Principal, ValidationError};
use vitrine_flow::{AuthFlowState, FlowError, FlowEvent, FlowOutcome, Phase};
use vitrine_gatekeeper::{AccessVerifier, GatekeeperLayer};
use vitrine_session::{ACCESS_COOKIE, AccessClaims, IssuedSession, REFRESH_COOKIE};

use crate::error::{ApiError, Result};
use crate::state::{AppState, Controller, HEALTH_PATH};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let verifier: Arc<dyn AccessVerifier> = state.access.clone();
    let gatekeeper = GatekeeperLayer::new(state.routes.clone(), verifier);

    Router::new()
        .route(HEALTH_PATH, get(health))
        .route("/session", post(login))
        .route("/session/identify", post(identify))
        .route("/session/refresh", get(refresh))
        .route("/session/recovery/request", post(recovery_request))
        .route("/session/recovery/verify", post(recovery_verify))
        .route("/session/recovery/complete", post(recovery_complete))
        .route("/session/whoami", get(whoami))
        .route("/session/token-id", get(token_id))
        .route("/session/logout", post(logout))
        .fallback(not_found)
        .layer(gatekeeper)
        .with_state(state)
}

// ── Request and response bodies ────────────────────────────────────

#[derive(Deserialize)]
struct Credentials {
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct Username {
    username: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CodeSubmission {
    username: String,
    code: String,
    #[serde(default)]
    first_access: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordSubmission {
    username: String,
    code: String,
    password: String,
    confirm: String,
    #[serde(default)]
    first_access: bool,
}

#[derive(Serialize)]
struct SignedIn {
    principal: Principal,
}

/// Where the visitor goes next in the sign-in flow.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NextStep {
    next: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    is_first_access: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Identity {
    principal_id: String,
    roles: Vec<String>,
}

impl From<&AccessClaims> for Identity {
    fn from(claims: &AccessClaims) -> Self {
        Self {
            principal_id: claims.sub.to_string(),
            roles: claims.roles.names(),
        }
    }
}

// ── Sign-in ────────────────────────────────────────────────────────

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<Credentials>,
) -> Result<(CookieJar, Json<SignedIn>)> {
    let username = non_empty(&body.username, "username")?;
    let mut flow = state.controller(AuthFlowState {
        phase: Phase::SignIn,
        username: Some(username),
        ..AuthFlowState::default()
    });
    let outcome = flow
        .handle(FlowEvent::SubmitPassword {
            password: body.password,
        })
        .await?;
    signed_in(jar, outcome)
}

async fn identify(
    State(state): State<AppState>,
    Json(body): Json<Username>,
) -> Result<Json<NextStep>> {
    let mut flow = state.controller(AuthFlowState::default());
    let outcome = flow
        .handle(FlowEvent::SubmitUsername {
            username: body.username,
        })
        .await?;
    next_step(&flow, outcome)
}

// ── Recovery and first access ──────────────────────────────────────

async fn recovery_request(
    State(state): State<AppState>,
    Json(body): Json<Username>,
) -> Result<Json<NextStep>> {
    let username = non_empty(&body.username, "username")?;
    let mut flow = state.controller(AuthFlowState {
        phase: Phase::SignIn,
        username: Some(username),
        ..AuthFlowState::default()
    });
    let outcome = flow.handle(FlowEvent::ForgotPassword).await?;
    next_step(&flow, outcome)
}

async fn recovery_verify(
    State(state): State<AppState>,
    Json(body): Json<CodeSubmission>,
) -> Result<Json<NextStep>> {
    let username = non_empty(&body.username, "username")?;
    let mut flow = state.controller(AuthFlowState {
        phase: Phase::Code,
        username: Some(username),
        is_first_access: body.first_access,
        ..AuthFlowState::default()
    });
    let outcome = flow
        .handle(FlowEvent::SubmitCode { code: body.code })
        .await?;
    next_step(&flow, outcome)
}

async fn recovery_complete(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<PasswordSubmission>,
) -> Result<(CookieJar, Json<SignedIn>)> {
    let username = non_empty(&body.username, "username")?;
    let code = non_empty(&body.code, "code")?;
    let phase = if body.first_access {
        Phase::Password
    } else {
        Phase::ResetPassword
    };
    let mut flow = state.controller(AuthFlowState {
        phase,
        username: Some(username),
        email: None,
        is_first_access: body.first_access,
        verified_code: Some(code),
    });
    let outcome = flow
        .handle(FlowEvent::SubmitNewPassword {
            password: body.password,
            confirm: body.confirm,
        })
        .await?;
    signed_in(jar, outcome)
}

// ── Session ────────────────────────────────────────────────────────

async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<Identity>)> {
    let cookie = jar
        .get(REFRESH_COOKIE)
        .ok_or(ApiError::NoRefreshCredential)?;
    let refreshed = state.refresher.refresh(cookie.value())?;

    tracing::debug!(principal = %refreshed.claims.sub, "Access cookie renewed");
    let identity = Identity::from(&refreshed.claims);
    Ok((jar.add(refreshed.access_cookie), Json(identity)))
}

async fn whoami(State(state): State<AppState>, jar: CookieJar) -> Result<Json<Identity>> {
    let claims = access_claims(&state, &jar)?;
    Ok(Json(Identity::from(&claims)))
}

async fn token_id(State(state): State<AppState>, jar: CookieJar) -> Result<Json<Value>> {
    let claims = access_claims(&state, &jar)?;
    let token_id = claims.jti.ok_or(ApiError::MissingTokenId)?;
    Ok(Json(json!({ "tokenId": token_id })))
}

async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, StatusCode) {
    let [access, refresh] = state.issuer.clear_cookies();
    tracing::debug!("Session cookies cleared");
    (jar.add(access).add(refresh), StatusCode::NO_CONTENT)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

// ── Helpers ────────────────────────────────────────────────────────

fn non_empty(value: &str, field: &'static str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(FlowError::from(ValidationError::Empty { field }).into());
    }
    Ok(value.to_string())
}

fn access_claims(state: &AppState, jar: &CookieJar) -> Result<AccessClaims> {
    let cookie = jar.get(ACCESS_COOKIE).ok_or(ApiError::Unauthenticated)?;
    state.access.verify(cookie.value()).map_err(|e| {
        tracing::debug!(error = %e, "Access cookie rejected");
        ApiError::Unauthenticated
    })
}

fn signed_in(
    jar: CookieJar,
    outcome: FlowOutcome<IssuedSession>,
) -> Result<(CookieJar, Json<SignedIn>)> {
    match outcome {
        FlowOutcome::SessionEstablished { principal, session } => {
            tracing::info!(principal = %principal.id, "Signed in");
            let jar = jar.add(session.access_cookie).add(session.refresh_cookie);
            Ok((jar, Json(SignedIn { principal })))
        }
        FlowOutcome::Continue(_) => Err(ApiError::UnexpectedOutcome),
    }
}

fn next_step(flow: &Controller, outcome: FlowOutcome<IssuedSession>) -> Result<Json<NextStep>> {
    match outcome {
        FlowOutcome::Continue(phase) => {
            let state = flow.state();
            Ok(Json(NextStep {
                next: phase.to_string(),
                email: state.email.clone(),
                is_first_access: state.is_first_access,
            }))
        }
        FlowOutcome::SessionEstablished { .. } => Err(ApiError::UnexpectedOutcome),
    }
}
