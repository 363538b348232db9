//! Request and result shapes exchanged between the HTTP shell, the workflow
//! and the identity provider. None of these outlive a single request.

use secrecy::SecretString;
use std::fmt;
use std::time::Duration;
use ulid::Ulid;

/// Login form input.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
    pub remember_me: bool,
}

/// Registration form input. The new account's user name is its email.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    pub email: String,
    pub password: SecretString,
    pub confirm_password: SecretString,
}

/// Administrator-driven reset. `target_email` is looked up as a user name.
#[derive(Debug, Clone)]
pub struct ResetRequest {
    pub target_email: String,
    pub new_password: SecretString,
    pub confirm_password: SecretString,
}

/// Opaque reference to a provider-owned user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserHandle(Ulid);

impl UserHandle {
    #[must_use]
    pub fn new(id: Ulid) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn id(&self) -> Ulid {
        self.0
    }
}

impl fmt::Display for UserHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the caller presented with the request (the raw session token, if any).
#[derive(Debug, Clone, Default)]
pub struct CallerContext {
    session_token: Option<SecretString>,
}

impl CallerContext {
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_session_token(token: SecretString) -> Self {
        Self {
            session_token: Some(token),
        }
    }

    #[must_use]
    pub fn session_token(&self) -> Option<&SecretString> {
        self.session_token.as_ref()
    }
}

/// A freshly established session, handed to the HTTP shell to set the cookie.
#[derive(Debug, Clone)]
pub struct SessionTicket {
    pub token: SecretString,
    pub persistent: bool,
    pub max_age: Duration,
}

/// Why a password sign-in did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInFailure {
    UnknownUser,
    InvalidPassword,
    NotAllowed,
}

#[derive(Debug, Clone)]
pub enum SignInOutcome {
    Succeeded(SessionTicket),
    LockedOut,
    Failed(SignInFailure),
}

/// Result of a provider mutation: success, or an ordered list of messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityResult {
    pub succeeded: bool,
    pub errors: Vec<String>,
}

impl IdentityResult {
    #[must_use]
    pub fn success() -> Self {
        Self {
            succeeded: true,
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub fn failed<I, S>(errors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            succeeded: false,
            errors: errors.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateUserResult {
    pub result: IdentityResult,
    /// Present only when `result.succeeded`.
    pub user: Option<UserHandle>,
}

/// One-time password reset token. Never leaves the process in this flow.
#[derive(Debug, Clone)]
pub struct ResetToken(SecretString);

impl ResetToken {
    #[must_use]
    pub fn new(token: SecretString) -> Self {
        Self(token)
    }

    #[must_use]
    pub fn secret(&self) -> &SecretString {
        &self.0
    }
}
