//! Request and response values exchanged with the identity authority.

use serde::{Deserialize, Serialize};

use vitrine_core::{Principal, ValidationError};

/// Whether the account can sign in with a password yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    /// Established account; continue with a password.
    CanLogin,
    /// Not yet established; a first-access code was sent.
    CodeSent,
}

/// Result of `pre_authenticate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreAuthentication {
    /// Account state.
    pub account_status: AccountStatus,
    /// Address the code was (or would be) delivered to.
    #[serde(default)]
    pub email: Option<String>,
    /// Whether this is the account's first access.
    #[serde(default)]
    pub is_first_access: bool,
    /// The code itself, when the authority chooses to return it.
    #[serde(default)]
    pub otc: Option<String>,
}

/// Result of `request_recovery_code`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryCode {
    /// The code itself, when the authority chooses to return it.
    #[serde(default)]
    pub otc: Option<String>,
}

/// Result of `set_password`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordChange {
    /// Whether the authority accepted the new password.
    pub ok: bool,
    /// The now-established principal, when the authority returns it.
    #[serde(default)]
    pub principal: Option<Principal>,
}

/// A new password whose confirmation has been checked.
#[derive(Clone, PartialEq, Eq)]
pub struct NewPassword(String);

impl NewPassword {
    /// Check `password == confirm` and that the password is not empty.
    pub fn new(password: &str, confirm: &str) -> Result<Self, ValidationError> {
        if password.is_empty() {
            return Err(ValidationError::Empty { field: "password" });
        }
        if password != confirm {
            return Err(ValidationError::Mismatch);
        }
        Ok(Self(password.to_string()))
    }

    /// The password text.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for NewPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("NewPassword(..)")
    }
}
