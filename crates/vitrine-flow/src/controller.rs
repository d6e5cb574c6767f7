//! The sign-in / first-access / recovery state machine.
//!
//! ```text
//! Username --CanLogin--> SignIn --password ok--> session established
//!    |                     |
//!    | CodeSent            | forgot password
//!    v                     v
//!   Code (first access)   Code (recovery) --resend--> Code
//!    |                     |
//!    v                     v
//! Password             ResetPassword --new password ok--> session established
//! ```
//!
//! Each gateway call is awaited before any state is written, so dropping
//! [`FlowController::handle`] mid-call leaves the previous state intact.

use std::sync::Arc;

use vitrine_core::{Principal, ValidationError};
use vitrine_gateway::{AccountStatus, IdentityGateway, NewPassword};
use vitrine_session::{IssuedSession, SessionError, SessionIssuer};

use crate::error::FlowError;
use crate::state::{AuthFlowState, FlowEvent, Phase};

/// Hands a verified principal to the session layer.
pub trait SessionEstablisher: Send + Sync {
    /// What a new session looks like to the caller (e.g. cookies).
    type Session: Send;

    /// Mint a session for `principal`.
    fn establish(&self, principal: &Principal) -> Result<Self::Session, SessionError>;
}

impl SessionEstablisher for SessionIssuer {
    type Session = IssuedSession;

    fn establish(&self, principal: &Principal) -> Result<IssuedSession, SessionError> {
        self.issue(principal)
    }
}

impl<T: SessionEstablisher + ?Sized> SessionEstablisher for Arc<T> {
    type Session = T::Session;

    fn establish(&self, principal: &Principal) -> Result<Self::Session, SessionError> {
        (**self).establish(principal)
    }
}

/// Result of a successfully handled event.
#[derive(Debug)]
pub enum FlowOutcome<S> {
    /// The flow continues in this phase.
    Continue(Phase),
    /// The visitor is signed in; the flow is over.
    SessionEstablished {
        /// Who signed in.
        principal: Principal,
        /// The new session.
        session: S,
    },
}

/// Drives one sign-in attempt.
pub struct FlowController<G, E> {
    gateway: G,
    establisher: E,
    state: AuthFlowState,
    finished: bool,
}

impl<G: IdentityGateway, E: SessionEstablisher> FlowController<G, E> {
    /// Start a new attempt in [`Phase::Username`].
    pub fn new(gateway: G, establisher: E) -> Self {
        Self::resume(gateway, establisher, AuthFlowState::default())
    }

    /// Continue an attempt from a previously captured state.
    pub fn resume(gateway: G, establisher: E, state: AuthFlowState) -> Self {
        Self {
            gateway,
            establisher,
            state,
            finished: false,
        }
    }

    /// Current state.
    pub fn state(&self) -> &AuthFlowState {
        &self.state
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Whether a session has been established.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Give up on the attempt. Returns the phase it was abandoned in.
    ///
    /// Anything the authority already did (a code already sent) stays done.
    pub fn abandon(self) -> Phase {
        log::debug!("Sign-in flow abandoned in the {} step", self.state.phase);
        self.state.phase
    }

    /// Apply `event`.
    pub async fn handle(&mut self, event: FlowEvent) -> Result<FlowOutcome<E::Session>, FlowError> {
        if self.finished {
            return Err(FlowError::Finished);
        }
        let phase = self.state.phase;
        if !event.is_allowed_in(phase) {
            return Err(FlowError::InvalidTransition {
                phase,
                event: event.name(),
            });
        }
        log::debug!("Sign-in flow {phase}: {}", event.name());

        match event {
            FlowEvent::SubmitUsername { username } => self.submit_username(&username).await,
            FlowEvent::SubmitPassword { password } => self.submit_password(&password).await,
            FlowEvent::ForgotPassword => self.forgot_password().await,
            FlowEvent::SubmitCode { code } => self.submit_code(&code).await,
            FlowEvent::ResendCode => self.resend_code().await,
            FlowEvent::SubmitNewPassword { password, confirm } => {
                self.submit_new_password(&password, &confirm).await
            }
        }
    }

    async fn submit_username(&mut self, username: &str) -> Result<FlowOutcome<E::Session>, FlowError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ValidationError::Empty { field: "username" }.into());
        }

        let pre = self.gateway.pre_authenticate(username).await?;

        let phase = match pre.account_status {
            AccountStatus::CodeSent => Phase::Code,
            AccountStatus::CanLogin => Phase::SignIn,
        };
        self.state = AuthFlowState {
            phase,
            username: Some(username.to_string()),
            email: pre.email,
            is_first_access: pre.account_status == AccountStatus::CodeSent,
            verified_code: None,
        };
        Ok(FlowOutcome::Continue(phase))
    }

    async fn submit_password(&mut self, password: &str) -> Result<FlowOutcome<E::Session>, FlowError> {
        let username = self.username("submit-password")?;
        let principal = self.gateway.authenticate(&username, password).await?;
        self.establish(principal)
    }

    async fn forgot_password(&mut self) -> Result<FlowOutcome<E::Session>, FlowError> {
        let username = self.username("forgot-password")?;
        self.gateway.request_recovery_code(&username).await?;

        self.state.phase = Phase::Code;
        self.state.is_first_access = false;
        self.state.verified_code = None;
        Ok(FlowOutcome::Continue(Phase::Code))
    }

    async fn submit_code(&mut self, code: &str) -> Result<FlowOutcome<E::Session>, FlowError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ValidationError::Empty { field: "code" }.into());
        }
        let username = self.username("submit-code")?;
        self.gateway.verify_one_time_code(&username, code).await?;

        let phase = if self.state.is_first_access {
            Phase::Password
        } else {
            Phase::ResetPassword
        };
        self.state.verified_code = Some(code.to_string());
        self.state.phase = phase;
        Ok(FlowOutcome::Continue(phase))
    }

    async fn resend_code(&mut self) -> Result<FlowOutcome<E::Session>, FlowError> {
        let username = self.username("resend-code")?;
        self.gateway.request_recovery_code(&username).await?;
        Ok(FlowOutcome::Continue(self.state.phase))
    }

    async fn submit_new_password(
        &mut self,
        password: &str,
        confirm: &str,
    ) -> Result<FlowOutcome<E::Session>, FlowError> {
        let new_password = NewPassword::new(password, confirm)?;
        let username = self.username("submit-new-password")?;
        let code = self
            .state
            .verified_code
            .clone()
            .ok_or(FlowError::InvalidTransition {
                phase: self.state.phase,
                event: "submit-new-password",
            })?;

        let change = self
            .gateway
            .set_password(&username, &code, &new_password)
            .await?;
        if !change.ok {
            return Err(FlowError::PasswordNotChanged);
        }

        let principal = match change.principal {
            Some(principal) => principal,
            None => {
                self.gateway
                    .authenticate(&username, new_password.expose())
                    .await?
            }
        };
        self.establish(principal)
    }

    fn username(&self, event: &'static str) -> Result<String, FlowError> {
        self.state
            .username
            .clone()
            .ok_or(FlowError::InvalidTransition {
                phase: self.state.phase,
                event,
            })
    }

    fn establish(&mut self, principal: Principal) -> Result<FlowOutcome<E::Session>, FlowError> {
        let session = self.establisher.establish(&principal)?;
        log::info!("Session established for principal {}", principal.id);
        self.finished = true;
        self.state = AuthFlowState::default();
        Ok(FlowOutcome::SessionEstablished { principal, session })
    }
}
