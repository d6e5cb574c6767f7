//! HTTP adapter for the identity authority.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use vitrine_core::{BearerSource, ExchangedToken, GatewayError, Principal, UpstreamCredentialError};

use crate::IdentityGateway;
use crate::types::{NewPassword, PasswordChange, PreAuthentication, RecoveryCode};

const PRE_AUTHENTICATE_PATH: &str = "/auth/pre-authenticate";
const AUTHENTICATE_PATH: &str = "/auth/authenticate";
const VERIFY_CODE_PATH: &str = "/auth/one-time-codes/verify";
const RECOVERY_CODE_PATH: &str = "/auth/recovery-codes";
const PASSWORD_PATH: &str = "/auth/password";

/// Maps an endpoint-specific non-success status to a domain error.
type StatusMapper = fn(StatusCode) -> Option<GatewayError>;

/// Identity gateway backed by the authority's REST API.
///
/// Every call carries the upstream bearer credential and is bounded by the
/// configured timeout.
pub struct HttpIdentityGateway {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    bearer: Arc<dyn BearerSource>,
}

impl HttpIdentityGateway {
    /// Create an adapter for the authority at `base_url`.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        bearer: Arc<dyn BearerSource>,
    ) -> Result<Self, GatewayError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            bearer,
        })
    }

    async fn post<B, T>(&self, path: &str, body: &B, on_status: StatusMapper) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let token = self.bearer.bearer_token().await.map_err(credential_error)?;
        let mut response = self.send(path, body, &token).await?;

        // One retry with a rotated bearer; a second 401 is the endpoint's answer.
        if response.status() == StatusCode::UNAUTHORIZED {
            if let Some(fresh) = self.bearer.rotate().await.map_err(credential_error)? {
                log::info!("Identity gateway {path} rejected the upstream bearer, retrying once");
                response = self.send(path, body, &fresh).await?;
            }
        }

        let status = response.status();
        if !status.is_success() {
            log::debug!("Identity gateway {path} returned HTTP {status}");
            return Err(on_status(status).unwrap_or(GatewayError::Rejected {
                status: status.as_u16(),
            }));
        }

        response
            .json()
            .await
            .map_err(|e| classify_body_error(e, self.timeout))
    }

    async fn send<B>(&self, path: &str, body: &B, token: &str) -> Result<reqwest::Response, GatewayError>
    where
        B: Serialize + ?Sized,
    {
        self.client
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| classify_send_error(e, self.timeout))
    }
}

#[async_trait]
impl IdentityGateway for HttpIdentityGateway {
    async fn pre_authenticate(&self, username: &str) -> Result<PreAuthentication, GatewayError> {
        self.post(
            PRE_AUTHENTICATE_PATH,
            &json!({ "username": username }),
            unknown_user,
        )
        .await
    }

    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Principal, GatewayError> {
        self.post(
            AUTHENTICATE_PATH,
            &json!({ "username": username, "password": password }),
            invalid_credentials,
        )
        .await
    }

    async fn verify_one_time_code(&self, username: &str, code: &str) -> Result<(), GatewayError> {
        #[derive(serde::Deserialize)]
        struct Verified {
            ok: bool,
        }

        let verified: Verified = self
            .post(
                VERIFY_CODE_PATH,
                &json!({ "username": username, "code": code }),
                invalid_code,
            )
            .await?;
        if verified.ok {
            Ok(())
        } else {
            Err(GatewayError::InvalidOrExpiredCode)
        }
    }

    async fn request_recovery_code(&self, username: &str) -> Result<RecoveryCode, GatewayError> {
        self.post(
            RECOVERY_CODE_PATH,
            &json!({ "username": username }),
            unknown_user,
        )
        .await
    }

    async fn set_password(
        &self,
        username: &str,
        code: &str,
        password: &NewPassword,
    ) -> Result<PasswordChange, GatewayError> {
        self.post(
            PASSWORD_PATH,
            &json!({
                "username": username,
                "code": code,
                "password": password.expose(),
                "confirm": password.expose(),
            }),
            invalid_code,
        )
        .await
    }
}

/// Exchanges the application's static client credentials for an upstream
/// bearer token. Used as the upstream credential cache's exchange function.
pub struct ClientCredentialsExchange {
    client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    timeout: Duration,
}

impl ClientCredentialsExchange {
    /// Create an exchange against `token_url`.
    pub fn new(
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        Ok(Self {
            client: build_client(timeout)?,
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            timeout,
        })
    }

    /// Perform the exchange.
    pub async fn exchange(&self) -> Result<ExchangedToken, GatewayError> {
        let response = self
            .client
            .post(&self.token_url)
            .json(&json!({
                "grant_type": "client_credentials",
                "client_id": self.client_id,
                "client_secret": self.client_secret,
            }))
            .send()
            .await
            .map_err(|e| classify_send_error(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            log::warn!("Client credential exchange rejected (HTTP {status})");
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
            });
        }

        let exchanged: ExchangedToken = response
            .json()
            .await
            .map_err(|e| classify_body_error(e, self.timeout))?;
        log::info!(
            "Exchanged client credentials for upstream token (expires in {}s)",
            exchanged.expires_in
        );
        Ok(exchanged)
    }
}

fn build_client(timeout: Duration) -> Result<reqwest::Client, GatewayError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| GatewayError::Unreachable(format!("failed to build HTTP client: {e}")))
}

fn credential_error(error: UpstreamCredentialError) -> GatewayError {
    GatewayError::Credential(error.to_string())
}

fn classify_send_error(error: reqwest::Error, timeout: Duration) -> GatewayError {
    if error.is_timeout() {
        timeout_error(timeout)
    } else {
        GatewayError::Unreachable(error.to_string())
    }
}

fn timeout_error(timeout: Duration) -> GatewayError {
    GatewayError::Timeout {
        millis: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
    }
}

fn classify_body_error(error: reqwest::Error, timeout: Duration) -> GatewayError {
    if error.is_timeout() {
        classify_send_error(error, timeout)
    } else {
        GatewayError::InvalidResponse(error.to_string())
    }
}

fn unknown_user(status: StatusCode) -> Option<GatewayError> {
    (status == StatusCode::NOT_FOUND).then_some(GatewayError::UnknownUser)
}

fn invalid_credentials(status: StatusCode) -> Option<GatewayError> {
    matches!(
        status,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
    )
    .then_some(GatewayError::InvalidCredentials)
}

fn invalid_code(status: StatusCode) -> Option<GatewayError> {
    matches!(
        status,
        StatusCode::BAD_REQUEST
            | StatusCode::UNAUTHORIZED
            | StatusCode::GONE
            | StatusCode::UNPROCESSABLE_ENTITY
    )
    .then_some(GatewayError::InvalidOrExpiredCode)
}
