//! HTTP error mapping.
//!
//! Flow failures become field-level JSON so a form can show the message
//! next to the right input. Session failures all render the same generic
//! message.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use vitrine_core::GatewayError;
use vitrine_flow::FlowError;
use vitrine_session::{SESSION_EXPIRED_MESSAGE, SessionError};

/// Result type alias for handlers.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors returned by the session endpoints.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    /// A sign-in or recovery step failed.
    #[error(transparent)]
    Flow(#[from] FlowError),

    /// A refresh credential was rejected, or minting failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The refresh cookie is absent.
    #[error("no refresh credential")]
    NoRefreshCredential,

    /// No valid access cookie.
    #[error("not signed in")]
    Unauthenticated,

    /// The access token carries no token id.
    #[error("access token has no token id")]
    MissingTokenId,

    /// The flow did not end where the endpoint expects.
    #[error("sign-in flow ended in an unexpected state")]
    UnexpectedOutcome,
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Message safe to show the user.
    pub error: String,
    /// Form field the error belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Flow(e) => flow_status(e),
            ApiError::Session(e) if e.is_client_error() => StatusCode::FORBIDDEN,
            ApiError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NoRefreshCredential => StatusCode::FORBIDDEN,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::MissingTokenId => StatusCode::BAD_REQUEST,
            ApiError::UnexpectedOutcome => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            ApiError::Session(_) | ApiError::NoRefreshCredential => ErrorBody {
                error: SESSION_EXPIRED_MESSAGE.to_string(),
                field: None,
            },
            ApiError::Flow(FlowError::Session(_)) => ErrorBody {
                error: "could not start a session".to_string(),
                field: None,
            },
            ApiError::Flow(FlowError::Gateway(e)) if !e.is_client_error() => ErrorBody {
                error: "identity service unavailable, please try again".to_string(),
                field: None,
            },
            ApiError::Flow(e) => ErrorBody {
                error: e.to_string(),
                field: e.field(),
            },
            other => ErrorBody {
                error: other.to_string(),
                field: None,
            },
        }
    }
}

fn flow_status(error: &FlowError) -> StatusCode {
    match error {
        FlowError::Validation(_) | FlowError::PasswordNotChanged => StatusCode::BAD_REQUEST,
        FlowError::Gateway(GatewayError::InvalidCredentials) => StatusCode::UNAUTHORIZED,
        FlowError::Gateway(GatewayError::UnknownUser) => StatusCode::NOT_FOUND,
        FlowError::Gateway(GatewayError::InvalidOrExpiredCode) => StatusCode::BAD_REQUEST,
        FlowError::Gateway(GatewayError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
        FlowError::Gateway(_) => StatusCode::BAD_GATEWAY,
        FlowError::InvalidTransition { .. } | FlowError::Finished => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Session endpoint failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Session request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use vitrine_core::{EncryptionError, TokenError, ValidationError};

    #[test]
    fn test_session_failures_share_one_message() {
        let errors = [
            ApiError::Session(SessionError::Encryption(EncryptionError::Malformed)),
            ApiError::Session(SessionError::Token(TokenError::Expired)),
            ApiError::Session(SessionError::Token(TokenError::SignatureInvalid)),
            ApiError::NoRefreshCredential,
        ];
        for e in errors {
            assert_eq!(e.status(), StatusCode::FORBIDDEN);
            assert_eq!(e.body().error, SESSION_EXPIRED_MESSAGE);
        }
    }

    #[test]
    fn test_signing_failure_is_server_error() {
        let e = ApiError::Session(SessionError::Token(TokenError::Signing("boom".into())));
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_flow_errors_carry_fields() {
        let e = ApiError::Flow(FlowError::Gateway(GatewayError::InvalidCredentials));
        assert_eq!(e.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(e.body().field, Some("password"));

        let e = ApiError::Flow(FlowError::Validation(ValidationError::Mismatch));
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);
        assert_eq!(e.body().field, Some("confirm"));
    }

    #[test]
    fn test_timeout_is_distinct_from_unreachable() {
        let timeout = ApiError::Flow(FlowError::Gateway(GatewayError::Timeout { millis: 50 }));
        let down = ApiError::Flow(FlowError::Gateway(GatewayError::Unreachable("connection refused".into())));
        assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(down.status(), StatusCode::BAD_GATEWAY);
        assert!(!down.body().error.contains("refused"));
    }

    #[test]
    fn test_body_omits_absent_field() {
        let json = serde_json::to_value(ApiError::Unauthenticated.body()).unwrap();
        assert_eq!(json, serde_json::json!({"error": "not signed in"}));
    }
}
