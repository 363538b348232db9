//! Port to the identity stack that owns users, passwords and sessions.
//!
//! The workflow talks only to this trait, so handlers and tests can swap the
//! backing implementation (the in-memory provider, a database-backed one, or a
//! mock) without touching the request logic.

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;

use super::types::{
    CallerContext, CreateUserResult, IdentityResult, ResetToken, SessionTicket, SignInOutcome,
    UserHandle,
};

/// Infrastructure failures. Business outcomes (wrong password, duplicate
/// user, bad token) are reported through the return values instead.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("identity store unavailable: {0}")]
    Unavailable(String),
    #[error("unknown user {0}")]
    UnknownUser(String),
    #[error("failed to generate secret: {0}")]
    Secret(String),
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("{0} does not fit the clock")]
    Expiry(&'static str),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Check a password and, on success, open a session.
    async fn password_sign_in(
        &self,
        user_name: &str,
        password: &SecretString,
        remember_me: bool,
        lockout_on_failure: bool,
    ) -> Result<SignInOutcome, ProviderError>;

    /// Create a user; atomic from the caller's point of view.
    async fn create_user(
        &self,
        user_name: &str,
        email: &str,
        password: &SecretString,
    ) -> Result<CreateUserResult, ProviderError>;

    async fn sign_in(
        &self,
        user: &UserHandle,
        persistent: bool,
    ) -> Result<SessionTicket, ProviderError>;

    async fn sign_out(&self, caller: &CallerContext) -> Result<(), ProviderError>;

    async fn is_signed_in(&self, caller: &CallerContext) -> Result<bool, ProviderError>;

    async fn current_user(&self, caller: &CallerContext)
        -> Result<Option<UserHandle>, ProviderError>;

    async fn user_name(&self, user: &UserHandle) -> Result<String, ProviderError>;

    async fn find_user_by_name(&self, name: &str) -> Result<Option<UserHandle>, ProviderError>;

    async fn generate_password_reset_token(
        &self,
        user: &UserHandle,
    ) -> Result<ResetToken, ProviderError>;

    async fn reset_password(
        &self,
        user: &UserHandle,
        token: &ResetToken,
        new_password: &SecretString,
    ) -> Result<IdentityResult, ProviderError>;
}
