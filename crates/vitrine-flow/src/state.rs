//! Flow phases, events and per-attempt state.

use std::fmt;

/// Step of the sign-in protocol the visitor is on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Asking for the username.
    #[default]
    Username,
    /// Asking for the password of an established account.
    SignIn,
    /// Asking for a one-time code.
    Code,
    /// Choosing a first password.
    Password,
    /// Choosing a replacement password.
    ResetPassword,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Username => "username",
            Phase::SignIn => "sign-in",
            Phase::Code => "code",
            Phase::Password => "password",
            Phase::ResetPassword => "reset-password",
        };
        f.write_str(name)
    }
}

/// Input from the visitor.
#[derive(Clone, PartialEq, Eq)]
pub enum FlowEvent {
    /// Username submitted.
    SubmitUsername {
        /// The username.
        username: String,
    },
    /// Password submitted on the sign-in step.
    SubmitPassword {
        /// The password.
        password: String,
    },
    /// "Forgot password" chosen on the sign-in step.
    ForgotPassword,
    /// One-time code submitted.
    SubmitCode {
        /// The code.
        code: String,
    },
    /// Another code requested.
    ResendCode,
    /// New password and confirmation submitted.
    SubmitNewPassword {
        /// The password.
        password: String,
        /// Its confirmation.
        confirm: String,
    },
}

impl FlowEvent {
    /// Short name for logs and errors. Never includes secrets.
    pub fn name(&self) -> &'static str {
        match self {
            FlowEvent::SubmitUsername { .. } => "submit-username",
            FlowEvent::SubmitPassword { .. } => "submit-password",
            FlowEvent::ForgotPassword => "forgot-password",
            FlowEvent::SubmitCode { .. } => "submit-code",
            FlowEvent::ResendCode => "resend-code",
            FlowEvent::SubmitNewPassword { .. } => "submit-new-password",
        }
    }

    /// Whether the event is accepted in `phase`.
    pub fn is_allowed_in(&self, phase: Phase) -> bool {
        matches!(
            (phase, self),
            (Phase::Username, FlowEvent::SubmitUsername { .. })
                | (Phase::SignIn, FlowEvent::SubmitPassword { .. })
                | (Phase::SignIn, FlowEvent::ForgotPassword)
                | (Phase::Code, FlowEvent::SubmitCode { .. })
                | (Phase::Code, FlowEvent::ResendCode)
                | (
                    Phase::Password | Phase::ResetPassword,
                    FlowEvent::SubmitNewPassword { .. }
                )
        )
    }
}

impl fmt::Debug for FlowEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowEvent::SubmitUsername { username } => f
                .debug_struct("SubmitUsername")
                .field("username", username)
                .finish(),
            other => f.write_str(other.name()),
        }
    }
}

/// Client-local state of one sign-in attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthFlowState {
    /// Current phase.
    pub phase: Phase,
    /// Username once submitted.
    pub username: Option<String>,
    /// Address codes are sent to, when the authority reported it.
    pub email: Option<String>,
    /// Whether the account is completing first access.
    pub is_first_access: bool,
    /// Code accepted on the `Code` step.
    pub verified_code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = AuthFlowState::default();
        assert_eq!(state.phase, Phase::Username);
        assert!(state.username.is_none());
        assert!(!state.is_first_access);
    }

    #[test]
    fn test_event_table() {
        let code = FlowEvent::SubmitCode {
            code: "000001".into(),
        };
        assert!(code.is_allowed_in(Phase::Code));
        assert!(!code.is_allowed_in(Phase::SignIn));
        assert!(FlowEvent::ForgotPassword.is_allowed_in(Phase::SignIn));
        assert!(!FlowEvent::ForgotPassword.is_allowed_in(Phase::Username));
        let new_password = FlowEvent::SubmitNewPassword {
            password: "a".into(),
            confirm: "a".into(),
        };
        assert!(new_password.is_allowed_in(Phase::Password));
        assert!(new_password.is_allowed_in(Phase::ResetPassword));
        assert!(!new_password.is_allowed_in(Phase::Code));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let event = FlowEvent::SubmitPassword {
            password: "hunter22".into(),
        };
        assert_eq!(format!("{event:?}"), "submit-password");
    }
}
