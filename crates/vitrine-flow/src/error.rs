//! Flow controller errors.

use thiserror::Error;

use vitrine_core::{GatewayError, ValidationError};
use vitrine_session::SessionError;

use crate::state::Phase;

/// Failures driving the sign-in flow.
///
/// Every variant except [`FlowError::Finished`] leaves the flow in the
/// phase it was in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum FlowError {
    /// The event is not accepted in the current phase.
    #[error("'{event}' is not valid in the {phase} step")]
    InvalidTransition {
        /// Phase the flow was in.
        phase: Phase,
        /// Rejected event.
        event: &'static str,
    },

    /// Input rejected before any network call.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The identity authority rejected the call or was unreachable.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The authority did not accept the new password.
    #[error("password was not changed")]
    PasswordNotChanged,

    /// Minting the session failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The flow already ended.
    #[error("sign-in flow already finished")]
    Finished,
}

impl FlowError {
    /// The form field the error belongs to, for field-level display.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            FlowError::Validation(ValidationError::Mismatch) => Some("confirm"),
            FlowError::Validation(ValidationError::Empty { field }) => Some(*field),
            FlowError::Gateway(GatewayError::UnknownUser) => Some("username"),
            FlowError::Gateway(GatewayError::InvalidCredentials) => Some("password"),
            FlowError::Gateway(GatewayError::InvalidOrExpiredCode) => Some("code"),
            FlowError::PasswordNotChanged => Some("password"),
            _ => None,
        }
    }
}
