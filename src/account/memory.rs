//! In-memory identity provider.
//!
//! Keeps users, sessions and reset tokens in process memory so the service
//! runs without an external identity stack. Everything is lost on restart.
//!
//! - Passwords are stored as argon2 PHC strings.
//! - Session and reset tokens are random 32-byte values; only their SHA-256
//!   hashes are kept.
//! - User names are matched case-insensitively (trimmed, uppercased).
//! - Failed passwords count towards lockout only when the caller asks for it.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use rand::rngs::OsRng;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;
use ulid::Ulid;

use super::{
    provider::{IdentityProvider, ProviderError},
    tokens::{generate_token, hash_token},
    types::{
        CallerContext, CreateUserResult, IdentityResult, ResetToken, SessionTicket, SignInFailure,
        SignInOutcome, UserHandle,
    },
};

const DEFAULT_PASSWORD_LENGTH: usize = 6;
const DEFAULT_MAX_FAILED_ATTEMPTS: u32 = 5;
const DEFAULT_LOCKOUT_SECONDS: u64 = 5 * 60;
const DEFAULT_SESSION_TTL_SECONDS: u64 = 14 * 24 * 60 * 60;
const DEFAULT_RESET_TOKEN_TTL_SECONDS: u64 = 24 * 60 * 60;

pub const INVALID_TOKEN: &str = "Invalid token.";

#[derive(Clone, Debug)]
pub struct IdentityOptions {
    password_required_length: usize,
    max_failed_attempts: u32,
    lockout_duration: Duration,
    session_ttl: Duration,
    reset_token_ttl: Duration,
}

impl IdentityOptions {
    /// Defaults: 6 character passwords with digit, lower, upper and symbol,
    /// 5 attempts before a 5 minute lockout, 14 day sessions, 1 day reset tokens.
    #[must_use]
    pub fn new() -> Self {
        Self {
            password_required_length: DEFAULT_PASSWORD_LENGTH,
            max_failed_attempts: DEFAULT_MAX_FAILED_ATTEMPTS,
            lockout_duration: Duration::from_secs(DEFAULT_LOCKOUT_SECONDS),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECONDS),
            reset_token_ttl: Duration::from_secs(DEFAULT_RESET_TOKEN_TTL_SECONDS),
        }
    }

    #[must_use]
    pub fn with_max_failed_attempts(mut self, attempts: u32) -> Self {
        self.max_failed_attempts = attempts.max(1);
        self
    }

    #[must_use]
    pub fn with_lockout_seconds(mut self, seconds: u64) -> Self {
        self.lockout_duration = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: u64) -> Self {
        self.session_ttl = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_reset_token_ttl_seconds(mut self, seconds: u64) -> Self {
        self.reset_token_ttl = Duration::from_secs(seconds);
        self
    }

    /// Policy violations, in a stable order.
    #[must_use]
    pub fn password_errors(&self, password: &str) -> Vec<String> {
        let mut errors = Vec::new();
        if password.chars().count() < self.password_required_length {
            errors.push(format!(
                "Passwords must be at least {} characters.",
                self.password_required_length
            ));
        }
        if password.chars().all(char::is_alphanumeric) {
            errors.push("Passwords must have at least one non alphanumeric character.".to_string());
        }
        if !password.chars().any(|c| c.is_ascii_digit()) {
            errors.push("Passwords must have at least one digit ('0'-'9').".to_string());
        }
        if !password.chars().any(|c| c.is_ascii_lowercase()) {
            errors.push("Passwords must have at least one lowercase ('a'-'z').".to_string());
        }
        if !password.chars().any(|c| c.is_ascii_uppercase()) {
            errors.push("Passwords must have at least one uppercase ('A'-'Z').".to_string());
        }
        errors
    }
}

impl Default for IdentityOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct UserRecord {
    user_name: String,
    email: String,
    password_hash: String,
    access_failed_count: u32,
    lockout_end: Option<Instant>,
}

#[derive(Debug)]
struct SessionRecord {
    user: Ulid,
    expires_at: Instant,
}

#[derive(Debug)]
struct ResetRecord {
    token_hash: Vec<u8>,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct Store {
    users: HashMap<Ulid, UserRecord>,
    names: HashMap<String, Ulid>,
    sessions: HashMap<Vec<u8>, SessionRecord>,
    reset_tokens: HashMap<Ulid, ResetRecord>,
}

impl Store {
    fn session_user(&self, caller: &CallerContext, now: Instant) -> Option<Ulid> {
        let token = caller.session_token()?;
        let record = self.sessions.get(&hash_token(token.expose_secret()))?;
        if record.expires_at <= now || !self.users.contains_key(&record.user) {
            return None;
        }
        Some(record.user)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryIdentityProvider {
    options: IdentityOptions,
    store: RwLock<Store>,
}

impl InMemoryIdentityProvider {
    #[must_use]
    pub fn new(options: IdentityOptions) -> Self {
        Self {
            options,
            store: RwLock::new(Store::default()),
        }
    }

    /// Lock an account out for `duration`. Returns `false` for unknown users.
    ///
    /// # Errors
    /// Returns [`ProviderError::Expiry`] if `duration` overflows the clock.
    pub async fn lock_out(
        &self,
        user_name: &str,
        duration: Duration,
    ) -> Result<bool, ProviderError> {
        let lockout_end = expires_at(Instant::now(), duration, "lockout")?;
        let mut store = self.store.write().await;
        let Some(id) = store.names.get(&normalize_name(user_name)).copied() else {
            return Ok(false);
        };
        match store.users.get_mut(&id) {
            Some(record) => {
                record.lockout_end = Some(lockout_end);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Number of live sessions, mostly useful in tests.
    pub async fn session_count(&self) -> usize {
        let now = Instant::now();
        let store = self.store.read().await;
        store
            .sessions
            .values()
            .filter(|session| session.expires_at > now)
            .count()
    }

    /// Email recorded for a user.
    pub async fn email(&self, user: &UserHandle) -> Option<String> {
        let store = self.store.read().await;
        store.users.get(&user.id()).map(|record| record.email.clone())
    }

    fn issue_session(
        &self,
        store: &mut Store,
        user: Ulid,
        persistent: bool,
    ) -> Result<SessionTicket, ProviderError> {
        let now = Instant::now();
        let expires_at = expires_at(now, self.options.session_ttl, "session lifetime")?;
        store.sessions.retain(|_, session| session.expires_at > now);

        let token = generate_token()?;
        store
            .sessions
            .insert(hash_token(&token), SessionRecord { user, expires_at });
        Ok(SessionTicket {
            token: SecretString::from(token),
            persistent,
            max_age: self.options.session_ttl,
        })
    }
}

fn expires_at(now: Instant, ttl: Duration, what: &'static str) -> Result<Instant, ProviderError> {
    now.checked_add(ttl).ok_or(ProviderError::Expiry(what))
}

fn normalize_name(name: &str) -> String {
    name.trim().to_uppercase()
}

fn hash_password(password: &SecretString) -> Result<String, ProviderError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| ProviderError::Hashing(err.to_string()))
}

fn verify_password(stored: &str, password: &SecretString) -> bool {
    PasswordHash::new(stored).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.expose_secret().as_bytes(), &parsed)
            .is_ok()
    })
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn password_sign_in(
        &self,
        user_name: &str,
        password: &SecretString,
        remember_me: bool,
        lockout_on_failure: bool,
    ) -> Result<SignInOutcome, ProviderError> {
        let now = Instant::now();
        let mut store = self.store.write().await;
        let Some(id) = store.names.get(&normalize_name(user_name)).copied() else {
            return Ok(SignInOutcome::Failed(SignInFailure::UnknownUser));
        };
        let record = store
            .users
            .get_mut(&id)
            .ok_or_else(|| ProviderError::UnknownUser(id.to_string()))?;

        if record.lockout_end.is_some_and(|end| end > now) {
            return Ok(SignInOutcome::LockedOut);
        }

        if verify_password(&record.password_hash, password) {
            record.access_failed_count = 0;
            let ticket = self.issue_session(&mut store, id, remember_me)?;
            return Ok(SignInOutcome::Succeeded(ticket));
        }

        if lockout_on_failure {
            record.access_failed_count += 1;
            if record.access_failed_count >= self.options.max_failed_attempts {
                let lockout_end = expires_at(now, self.options.lockout_duration, "lockout")?;
                record.access_failed_count = 0;
                record.lockout_end = Some(lockout_end);
                debug!(user = %id, "Account locked after repeated failures");
                return Ok(SignInOutcome::LockedOut);
            }
        }

        Ok(SignInOutcome::Failed(SignInFailure::InvalidPassword))
    }

    async fn create_user(
        &self,
        user_name: &str,
        email: &str,
        password: &SecretString,
    ) -> Result<CreateUserResult, ProviderError> {
        let password_errors = self.options.password_errors(password.expose_secret());
        if !password_errors.is_empty() {
            return Ok(CreateUserResult {
                result: IdentityResult::failed(password_errors),
                user: None,
            });
        }

        let password_hash = hash_password(password)?;
        let normalized = normalize_name(user_name);

        let mut store = self.store.write().await;
        if store.names.contains_key(&normalized) {
            return Ok(CreateUserResult {
                result: IdentityResult::failed([format!(
                    "User name '{user_name}' is already taken."
                )]),
                user: None,
            });
        }

        let id = Ulid::new();
        store.names.insert(normalized, id);
        store.users.insert(
            id,
            UserRecord {
                user_name: user_name.to_string(),
                email: email.to_string(),
                password_hash,
                access_failed_count: 0,
                lockout_end: None,
            },
        );

        Ok(CreateUserResult {
            result: IdentityResult::success(),
            user: Some(UserHandle::new(id)),
        })
    }

    async fn sign_in(
        &self,
        user: &UserHandle,
        persistent: bool,
    ) -> Result<SessionTicket, ProviderError> {
        let mut store = self.store.write().await;
        if !store.users.contains_key(&user.id()) {
            return Err(ProviderError::UnknownUser(user.to_string()));
        }
        self.issue_session(&mut store, user.id(), persistent)
    }

    async fn sign_out(&self, caller: &CallerContext) -> Result<(), ProviderError> {
        if let Some(token) = caller.session_token() {
            let mut store = self.store.write().await;
            store.sessions.remove(&hash_token(token.expose_secret()));
        }
        Ok(())
    }

    async fn is_signed_in(&self, caller: &CallerContext) -> Result<bool, ProviderError> {
        let store = self.store.read().await;
        Ok(store.session_user(caller, Instant::now()).is_some())
    }

    async fn current_user(
        &self,
        caller: &CallerContext,
    ) -> Result<Option<UserHandle>, ProviderError> {
        let store = self.store.read().await;
        Ok(store
            .session_user(caller, Instant::now())
            .map(UserHandle::new))
    }

    async fn user_name(&self, user: &UserHandle) -> Result<String, ProviderError> {
        let store = self.store.read().await;
        store
            .users
            .get(&user.id())
            .map(|record| record.user_name.clone())
            .ok_or_else(|| ProviderError::UnknownUser(user.to_string()))
    }

    async fn find_user_by_name(&self, name: &str) -> Result<Option<UserHandle>, ProviderError> {
        let store = self.store.read().await;
        Ok(store
            .names
            .get(&normalize_name(name))
            .copied()
            .map(UserHandle::new))
    }

    async fn generate_password_reset_token(
        &self,
        user: &UserHandle,
    ) -> Result<ResetToken, ProviderError> {
        let expires_at = expires_at(
            Instant::now(),
            self.options.reset_token_ttl,
            "reset token lifetime",
        )?;
        let mut store = self.store.write().await;
        if !store.users.contains_key(&user.id()) {
            return Err(ProviderError::UnknownUser(user.to_string()));
        }
        let token = generate_token()?;
        store.reset_tokens.insert(
            user.id(),
            ResetRecord {
                token_hash: hash_token(&token),
                expires_at,
            },
        );
        Ok(ResetToken::new(SecretString::from(token)))
    }

    async fn reset_password(
        &self,
        user: &UserHandle,
        token: &ResetToken,
        new_password: &SecretString,
    ) -> Result<IdentityResult, ProviderError> {
        let now = Instant::now();
        {
            let store = self.store.read().await;
            if !store.users.contains_key(&user.id()) {
                return Err(ProviderError::UnknownUser(user.to_string()));
            }
            let token_hash = hash_token(token.secret().expose_secret());
            let valid = store
                .reset_tokens
                .get(&user.id())
                .is_some_and(|record| record.token_hash == token_hash && record.expires_at > now);
            if !valid {
                return Ok(IdentityResult::failed([INVALID_TOKEN]));
            }
        }

        let password_errors = self.options.password_errors(new_password.expose_secret());
        if !password_errors.is_empty() {
            return Ok(IdentityResult::failed(password_errors));
        }

        let password_hash = hash_password(new_password)?;

        let mut store = self.store.write().await;
        // Single use: the token must still be the one we checked.
        let token_hash = hash_token(token.secret().expose_secret());
        match store.reset_tokens.get(&user.id()) {
            Some(record) if record.token_hash == token_hash => {
                store.reset_tokens.remove(&user.id());
            }
            _ => return Ok(IdentityResult::failed([INVALID_TOKEN])),
        }
        let record = store
            .users
            .get_mut(&user.id())
            .ok_or_else(|| ProviderError::UnknownUser(user.to_string()))?;
        record.password_hash = password_hash;
        Ok(IdentityResult::success())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PASSWORD: &str = "P@ssw0rd!";

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    async fn provider_with_user(name: &str) -> (InMemoryIdentityProvider, UserHandle) {
        let provider = InMemoryIdentityProvider::new(IdentityOptions::new());
        let created = provider
            .create_user(name, name, &secret(PASSWORD))
            .await
            .unwrap();
        assert!(created.result.succeeded);
        (provider, created.user.unwrap())
    }

    fn caller(ticket: &SessionTicket) -> CallerContext {
        CallerContext::with_session_token(ticket.token.clone())
    }

    #[test]
    fn password_policy_reports_every_violation() {
        let errors = IdentityOptions::new().password_errors("abc");
        assert_eq!(
            errors,
            vec![
                "Passwords must be at least 6 characters.",
                "Passwords must have at least one non alphanumeric character.",
                "Passwords must have at least one digit ('0'-'9').",
                "Passwords must have at least one uppercase ('A'-'Z').",
            ]
        );
        assert!(IdentityOptions::new().password_errors(PASSWORD).is_empty());
    }

    #[tokio::test]
    async fn create_user_rejects_duplicate_names_case_insensitively() {
        let (provider, _) = provider_with_user("user@example.com").await;
        let duplicate = provider
            .create_user("USER@example.com", "USER@example.com", &secret(PASSWORD))
            .await
            .unwrap();
        assert!(!duplicate.result.succeeded);
        assert!(duplicate.user.is_none());
        assert_eq!(
            duplicate.result.errors,
            vec!["User name 'USER@example.com' is already taken."]
        );
    }

    #[tokio::test]
    async fn create_user_applies_password_policy() {
        let provider = InMemoryIdentityProvider::default();
        let created = provider
            .create_user("weak@example.com", "weak@example.com", &secret("password"))
            .await
            .unwrap();
        assert!(!created.result.succeeded);
        assert_eq!(created.result.errors.len(), 3);
        assert!(provider
            .find_user_by_name("weak@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn password_sign_in_opens_a_session() {
        let (provider, user) = provider_with_user("user@example.com").await;
        let outcome = provider
            .password_sign_in("user@example.com", &secret(PASSWORD), true, false)
            .await
            .unwrap();
        let SignInOutcome::Succeeded(ticket) = outcome else {
            panic!("expected success, got {outcome:?}");
        };
        assert!(ticket.persistent);
        let caller = caller(&ticket);
        assert!(provider.is_signed_in(&caller).await.unwrap());
        assert_eq!(provider.current_user(&caller).await.unwrap(), Some(user));
        assert_eq!(
            provider.email(&user).await.as_deref(),
            Some("user@example.com")
        );
    }

    #[tokio::test]
    async fn password_sign_in_reports_failures() {
        let (provider, _) = provider_with_user("user@example.com").await;
        let wrong = provider
            .password_sign_in("user@example.com", &secret("nope"), false, false)
            .await
            .unwrap();
        assert!(matches!(
            wrong,
            SignInOutcome::Failed(SignInFailure::InvalidPassword)
        ));
        let unknown = provider
            .password_sign_in("ghost@example.com", &secret(PASSWORD), false, false)
            .await
            .unwrap();
        assert!(matches!(
            unknown,
            SignInOutcome::Failed(SignInFailure::UnknownUser)
        ));
    }

    #[tokio::test]
    async fn failures_lock_out_only_when_requested() {
        let provider =
            InMemoryIdentityProvider::new(IdentityOptions::new().with_max_failed_attempts(2));
        provider
            .create_user("user@example.com", "user@example.com", &secret(PASSWORD))
            .await
            .unwrap();

        for _ in 0..5 {
            let outcome = provider
                .password_sign_in("user@example.com", &secret("nope"), false, false)
                .await
                .unwrap();
            assert!(matches!(outcome, SignInOutcome::Failed(_)));
        }

        let first = provider
            .password_sign_in("user@example.com", &secret("nope"), false, true)
            .await
            .unwrap();
        assert!(matches!(first, SignInOutcome::Failed(_)));
        let second = provider
            .password_sign_in("user@example.com", &secret("nope"), false, true)
            .await
            .unwrap();
        assert!(matches!(second, SignInOutcome::LockedOut));

        // Even the right password is refused while locked.
        let correct = provider
            .password_sign_in("user@example.com", &secret(PASSWORD), false, false)
            .await
            .unwrap();
        assert!(matches!(correct, SignInOutcome::LockedOut));
    }

    #[tokio::test]
    async fn lock_out_helper_blocks_sign_in() {
        let (provider, _) = provider_with_user("user@example.com").await;
        assert!(provider
            .lock_out("user@example.com", Duration::from_secs(60))
            .await
            .unwrap());
        assert!(!provider
            .lock_out("ghost@example.com", Duration::from_secs(60))
            .await
            .unwrap());
        let outcome = provider
            .password_sign_in("user@example.com", &secret(PASSWORD), false, false)
            .await
            .unwrap();
        assert!(matches!(outcome, SignInOutcome::LockedOut));
    }

    #[tokio::test]
    async fn sign_out_ends_the_session() {
        let (provider, user) = provider_with_user("user@example.com").await;
        let ticket = provider.sign_in(&user, false).await.unwrap();
        assert!(!ticket.persistent);
        let caller = caller(&ticket);
        assert_eq!(provider.session_count().await, 1);
        provider.sign_out(&caller).await.unwrap();
        assert!(!provider.is_signed_in(&caller).await.unwrap());
        assert_eq!(provider.session_count().await, 0);
    }

    #[tokio::test]
    async fn unknown_session_token_is_anonymous() {
        let (provider, _) = provider_with_user("user@example.com").await;
        let caller = CallerContext::with_session_token(secret("forged"));
        assert!(!provider.is_signed_in(&caller).await.unwrap());
        assert!(provider.current_user(&caller).await.unwrap().is_none());
        assert!(!provider
            .is_signed_in(&CallerContext::anonymous())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn reset_token_is_single_use() {
        let (provider, user) = provider_with_user("user@example.com").await;
        let token = provider.generate_password_reset_token(&user).await.unwrap();

        let first = provider
            .reset_password(&user, &token, &secret("N3w-Passw0rd"))
            .await
            .unwrap();
        assert!(first.succeeded);

        let replay = provider
            .reset_password(&user, &token, &secret("An0ther-Passw0rd"))
            .await
            .unwrap();
        assert_eq!(replay.errors, vec![INVALID_TOKEN]);

        let signed_in = provider
            .password_sign_in("user@example.com", &secret("N3w-Passw0rd"), false, false)
            .await
            .unwrap();
        assert!(matches!(signed_in, SignInOutcome::Succeeded(_)));
    }

    #[tokio::test]
    async fn reset_rejects_forged_token_and_weak_password() {
        let (provider, user) = provider_with_user("user@example.com").await;
        let forged = ResetToken::new(secret("forged"));
        let result = provider
            .reset_password(&user, &forged, &secret("N3w-Passw0rd"))
            .await
            .unwrap();
        assert_eq!(result.errors, vec![INVALID_TOKEN]);

        let token = provider.generate_password_reset_token(&user).await.unwrap();
        let weak = provider
            .reset_password(&user, &token, &secret("weakpassword"))
            .await
            .unwrap();
        assert!(!weak.succeeded);
        assert!(!weak.errors.is_empty());
    }

    #[tokio::test]
    async fn expired_reset_token_is_invalid() {
        let provider =
            InMemoryIdentityProvider::new(IdentityOptions::new().with_reset_token_ttl_seconds(0));
        let created = provider
            .create_user("user@example.com", "user@example.com", &secret(PASSWORD))
            .await
            .unwrap();
        let user = created.user.unwrap();
        let token = provider.generate_password_reset_token(&user).await.unwrap();
        let result = provider
            .reset_password(&user, &token, &secret("N3w-Passw0rd"))
            .await
            .unwrap();
        assert_eq!(result.errors, vec![INVALID_TOKEN]);
    }

    #[tokio::test]
    async fn user_name_keeps_casing() {
        let (provider, user) = provider_with_user("Admin@admin.com").await;
        assert_eq!(provider.user_name(&user).await.unwrap(), "Admin@admin.com");
        let found = provider.find_user_by_name("admin@ADMIN.com").await.unwrap();
        assert_eq!(found, Some(user));
        let stranger = UserHandle::new(Ulid::new());
        assert!(provider.user_name(&stranger).await.is_err());
    }

    #[tokio::test]
    async fn oversized_lifetimes_fail_instead_of_panicking() {
        let provider = InMemoryIdentityProvider::new(
            IdentityOptions::new()
                .with_session_ttl_seconds(u64::MAX)
                .with_reset_token_ttl_seconds(u64::MAX),
        );
        let created = provider
            .create_user("user@example.com", "user@example.com", &secret(PASSWORD))
            .await
            .unwrap();
        let user = created.user.unwrap();

        let signed_in = provider
            .password_sign_in("user@example.com", &secret(PASSWORD), false, false)
            .await;
        assert!(matches!(signed_in, Err(ProviderError::Expiry(_))));
        assert!(matches!(
            provider.sign_in(&user, true).await,
            Err(ProviderError::Expiry(_))
        ));
        assert!(matches!(
            provider.generate_password_reset_token(&user).await,
            Err(ProviderError::Expiry(_))
        ));
        assert!(matches!(
            provider.lock_out("user@example.com", Duration::MAX).await,
            Err(ProviderError::Expiry(_))
        ));
        assert_eq!(provider.session_count().await, 0);
    }

    #[tokio::test]
    async fn oversized_lockout_fails_on_the_locking_attempt() {
        let provider = InMemoryIdentityProvider::new(
            IdentityOptions::new()
                .with_max_failed_attempts(1)
                .with_lockout_seconds(u64::MAX),
        );
        provider
            .create_user("user@example.com", "user@example.com", &secret(PASSWORD))
            .await
            .unwrap();
        let outcome = provider
            .password_sign_in("user@example.com", &secret("nope"), false, true)
            .await;
        assert!(matches!(outcome, Err(ProviderError::Expiry(_))));
    }
}
