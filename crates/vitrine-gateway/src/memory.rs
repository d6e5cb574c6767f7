//! In-process identity authority.
//!
//! Holds accounts and one-time codes in memory and records every code it
//! "sends" instead of delivering it. Codes are sequential, so this is for
//! tests and local development only.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use vitrine_core::{EstablishmentState, GatewayError, Principal};

use crate::IdentityGateway;
use crate::types::{AccountStatus, NewPassword, PasswordChange, PreAuthentication, RecoveryCode};

/// Lifetime of an issued one-time code.
const CODE_TTL: Duration = Duration::from_secs(5 * 60);

/// A one-time code notification that would have been delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    /// Recipient username.
    pub username: String,
    /// Recipient address.
    pub email: String,
    /// The code.
    pub code: String,
}

struct Account {
    principal: Principal,
    email: String,
    password: Option<String>,
}

struct IssuedCode {
    code: String,
    issued_at: Instant,
}

#[derive(Default)]
struct State {
    accounts: HashMap<String, Account>,
    codes: HashMap<String, IssuedCode>,
    sent: Vec<SentNotification>,
    next_code: u32,
}

impl State {
    fn issue_code(&mut self, username: &str) -> Result<String, GatewayError> {
        let email = self
            .accounts
            .get(username)
            .map(|a| a.email.clone())
            .ok_or(GatewayError::UnknownUser)?;
        self.next_code += 1;
        let code = format!("{:06}", self.next_code % 1_000_000);
        self.codes.insert(
            username.to_string(),
            IssuedCode {
                code: code.clone(),
                issued_at: Instant::now(),
            },
        );
        self.sent.push(SentNotification {
            username: username.to_string(),
            email,
            code: code.clone(),
        });
        Ok(code)
    }

    fn check_code(&self, username: &str, code: &str) -> Result<(), GatewayError> {
        match self.codes.get(username) {
            Some(issued) if issued.code == code && issued.issued_at.elapsed() <= CODE_TTL => Ok(()),
            _ => Err(GatewayError::InvalidOrExpiredCode),
        }
    }
}

/// An identity authority living in this process.
#[derive(Default)]
pub struct MemoryIdentityGateway {
    state: Mutex<State>,
}

impl MemoryIdentityGateway {
    /// An authority with no accounts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an established account with a password.
    pub fn with_account(
        self,
        username: &str,
        password: &str,
        email: &str,
        mut principal: Principal,
    ) -> Self {
        principal.establishment_state = EstablishmentState::Established;
        self.insert(username, email, Some(password.to_string()), principal);
        self
    }

    /// Add an account that has not completed first access.
    pub fn with_pending_account(self, username: &str, email: &str, mut principal: Principal) -> Self {
        principal.establishment_state = EstablishmentState::Unestablished;
        self.insert(username, email, None, principal);
        self
    }

    /// Every notification sent so far.
    pub fn sent_notifications(&self) -> Vec<SentNotification> {
        self.lock().sent.clone()
    }

    /// The most recent code sent to `username`.
    pub fn last_code_for(&self, username: &str) -> Option<String> {
        self.lock()
            .sent
            .iter()
            .rev()
            .find(|n| n.username == username)
            .map(|n| n.code.clone())
    }

    fn insert(&self, username: &str, email: &str, password: Option<String>, principal: Principal) {
        self.lock().accounts.insert(
            username.to_string(),
            Account {
                principal,
                email: email.to_string(),
                password,
            },
        );
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl IdentityGateway for MemoryIdentityGateway {
    async fn pre_authenticate(&self, username: &str) -> Result<PreAuthentication, GatewayError> {
        let mut state = self.lock();
        let (established, email) = match state.accounts.get(username) {
            Some(account) => (account.password.is_some(), account.email.clone()),
            None => return Err(GatewayError::UnknownUser),
        };

        if established {
            return Ok(PreAuthentication {
                account_status: AccountStatus::CanLogin,
                email: Some(email),
                is_first_access: false,
                otc: None,
            });
        }

        state.issue_code(username)?;
        Ok(PreAuthentication {
            account_status: AccountStatus::CodeSent,
            email: Some(email),
            is_first_access: true,
            otc: None,
        })
    }

    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Principal, GatewayError> {
        let state = self.lock();
        match state.accounts.get(username) {
            Some(account) if account.password.as_deref() == Some(password) => {
                Ok(account.principal.clone())
            }
            _ => Err(GatewayError::InvalidCredentials),
        }
    }

    async fn verify_one_time_code(&self, username: &str, code: &str) -> Result<(), GatewayError> {
        self.lock().check_code(username, code)
    }

    async fn request_recovery_code(&self, username: &str) -> Result<RecoveryCode, GatewayError> {
        self.lock().issue_code(username)?;
        Ok(RecoveryCode { otc: None })
    }

    async fn set_password(
        &self,
        username: &str,
        code: &str,
        password: &NewPassword,
    ) -> Result<PasswordChange, GatewayError> {
        let mut state = self.lock();
        state.check_code(username, code)?;
        state.codes.remove(username);

        let account = state
            .accounts
            .get_mut(username)
            .ok_or(GatewayError::UnknownUser)?;
        account.password = Some(password.expose().to_string());
        account.principal.establishment_state = EstablishmentState::Established;

        Ok(PasswordChange {
            ok: true,
            principal: Some(account.principal.clone()),
        })
    }
}
