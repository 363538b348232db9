//! Account request workflow.
//!
//! Each operation takes the parsed request, calls the identity provider and
//! returns an [`Outcome`]: what to show next and which session change the HTTP
//! shell must apply. Provider failures are always recovered here; nothing
//! propagates to the caller as an error.

use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use super::{
    policy::PrivilegePolicy,
    provider::{IdentityProvider, ProviderError},
    redirect::{redirect_to_local, HOME},
    types::{
        CallerContext, CreateUserResult, Credentials, RegistrationRequest, ResetRequest,
        SessionTicket, SignInOutcome, UserHandle,
    },
    validation::FormErrors,
};

pub const LOGIN_PATH: &str = "/Account/Login";
pub const FORGOT_PASSWORD_PATH: &str = "/Account/ForgotPassword";
pub const RESET_PASSWORD_PATH: &str = "/Account/ResetPassword";
pub const RESET_PASSWORD_DONE_PATH: &str = "/Account/ResetPasswordDone";

pub const INVALID_LOGIN_ATTEMPT: &str = "Invalid login attempt.";
pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred. Please try again.";
pub const RESET_PASSWORD_DONE: &str = "Done";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Page {
    Login,
    Lockout,
    Register,
    ForgotPassword,
    ResetPassword,
}

/// A page to render plus the values and errors to redisplay. Passwords are
/// never carried back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct View {
    pub page: Page,
    pub email: Option<String>,
    pub remember_me: bool,
    pub return_url: Option<String>,
    pub errors: FormErrors,
}

impl View {
    #[must_use]
    pub fn new(page: Page) -> Self {
        Self {
            page,
            email: None,
            remember_me: false,
            return_url: None,
            errors: FormErrors::new(),
        }
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn with_remember_me(mut self, remember_me: bool) -> Self {
        self.remember_me = remember_me;
        self
    }

    #[must_use]
    pub fn with_return_url(mut self, return_url: Option<String>) -> Self {
        self.return_url = return_url;
        self
    }

    #[must_use]
    pub fn with_errors(mut self, errors: FormErrors) -> Self {
        self.errors = errors;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Navigation {
    View(View),
    Redirect(String),
    NotFound,
}

#[derive(Clone, Debug)]
pub enum SessionChange {
    Unchanged,
    Established(SessionTicket),
    Cleared,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    ValidationFailed,
    AuthenticationFailed,
    LockedOut,
    NotFound,
    ProviderOperationFailed,
}

#[derive(Clone, Debug)]
pub struct Outcome {
    pub navigation: Navigation,
    pub session: SessionChange,
    pub failure: Option<FailureKind>,
}

impl Outcome {
    fn view(view: View) -> Self {
        Self {
            navigation: Navigation::View(view),
            session: SessionChange::Unchanged,
            failure: None,
        }
    }

    fn redirect(location: impl Into<String>) -> Self {
        Self {
            navigation: Navigation::Redirect(location.into()),
            session: SessionChange::Unchanged,
            failure: None,
        }
    }

    fn not_found() -> Self {
        Self {
            navigation: Navigation::NotFound,
            session: SessionChange::Unchanged,
            failure: Some(FailureKind::NotFound),
        }
    }

    fn with_session(mut self, session: SessionChange) -> Self {
        self.session = session;
        self
    }

    fn failed(mut self, kind: FailureKind) -> Self {
        self.failure = Some(kind);
        self
    }

    #[must_use]
    pub fn location(&self) -> Option<&str> {
        match &self.navigation {
            Navigation::Redirect(location) => Some(location),
            _ => None,
        }
    }

    #[must_use]
    pub fn rendered(&self) -> Option<&View> {
        match &self.navigation {
            Navigation::View(view) => Some(view),
            _ => None,
        }
    }
}

/// Terminal states of the reset-password state machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResetTerminal {
    Forbidden,
    Redisplay {
        errors: FormErrors,
        target: Option<String>,
        failure: FailureKind,
    },
    RedirectForgot,
    Done,
}

enum ResetStep {
    AuthCheck,
    FormCheck,
    Lookup,
    Apply(UserHandle),
}

#[derive(Clone)]
pub struct AuthWorkflow {
    provider: Arc<dyn IdentityProvider>,
    policy: Arc<dyn PrivilegePolicy>,
}

impl AuthWorkflow {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>, policy: Arc<dyn PrivilegePolicy>) -> Self {
        Self { provider, policy }
    }

    #[must_use]
    pub fn login_form(&self, return_url: Option<String>) -> Outcome {
        Outcome::view(View::new(Page::Login).with_return_url(return_url))
    }

    #[instrument(skip_all, fields(email = %credentials.email))]
    pub async fn login(&self, credentials: Credentials, return_url: Option<String>) -> Outcome {
        let errors = credentials.validate();
        if !errors.is_valid() {
            return Outcome::view(login_view(&credentials, return_url).with_errors(errors))
                .failed(FailureKind::ValidationFailed);
        }

        // Failed attempts never count towards lockout in this flow.
        let result = self
            .provider
            .password_sign_in(
                credentials.email.trim(),
                &credentials.password,
                credentials.remember_me,
                false,
            )
            .await;

        match result {
            Ok(SignInOutcome::Succeeded(ticket)) => {
                info!(event_id = 1, "User logged in.");
                Outcome::redirect(redirect_to_local(return_url.as_deref()))
                    .with_session(SessionChange::Established(ticket))
            }
            Ok(SignInOutcome::LockedOut) => {
                warn!(event_id = 2, "User account locked out.");
                Outcome::view(View::new(Page::Lockout)).failed(FailureKind::LockedOut)
            }
            Ok(SignInOutcome::Failed(reason)) => {
                debug!(?reason, "Invalid login attempt");
                invalid_login(&credentials, return_url)
            }
            Err(err) => {
                error!("Password sign-in failed: {err}");
                invalid_login(&credentials, return_url)
            }
        }
    }

    #[must_use]
    pub fn register_form(&self, return_url: Option<String>) -> Outcome {
        Outcome::view(View::new(Page::Register).with_return_url(return_url))
    }

    #[instrument(skip_all, fields(email = %request.email))]
    pub async fn register(&self, request: RegistrationRequest, return_url: Option<String>) -> Outcome {
        let errors = request.validate();
        if !errors.is_valid() {
            return Outcome::view(register_view(&request, return_url).with_errors(errors))
                .failed(FailureKind::ValidationFailed);
        }

        let email = request.email.trim();
        let created = match self.provider.create_user(email, email, &request.password).await {
            Ok(created) => created,
            Err(err) => {
                error!("Failed to create user: {err}");
                return register_failed(&request, return_url, unexpected_error());
            }
        };

        let user = match created {
            CreateUserResult {
                result,
                user: Some(user),
            } if result.succeeded => user,
            CreateUserResult { result, .. } => {
                let mut errors = FormErrors::new();
                for message in result.errors {
                    errors.add_form_error(message);
                }
                if errors.is_valid() {
                    errors.add_form_error(UNEXPECTED_ERROR);
                }
                debug!("User creation rejected by the identity provider");
                return register_failed(&request, return_url, errors);
            }
        };

        match self.provider.sign_in(&user, false).await {
            Ok(ticket) => {
                info!(event_id = 3, user = %user, "User created a new account with password.");
                Outcome::redirect(redirect_to_local(return_url.as_deref()))
                    .with_session(SessionChange::Established(ticket))
            }
            Err(err) => {
                // The account exists; let the user sign in by hand.
                error!("Failed to sign in new user {user}: {err}");
                Outcome::redirect(LOGIN_PATH)
            }
        }
    }

    #[instrument(skip_all)]
    pub async fn log_off(&self, caller: &CallerContext) -> Outcome {
        if let Err(err) = self.provider.sign_out(caller).await {
            error!("Failed to sign out: {err}");
        }
        info!(event_id = 4, "User logged out.");
        Outcome::redirect(HOME).with_session(SessionChange::Cleared)
    }

    #[instrument(skip_all)]
    pub async fn forgot_password(&self, caller: &CallerContext) -> Outcome {
        match self.privileged_caller(caller).await {
            Ok(true) => Outcome::redirect(RESET_PASSWORD_PATH),
            Ok(false) => Outcome::view(View::new(Page::ForgotPassword)),
            Err(err) => {
                error!("Failed to resolve caller: {err}");
                Outcome::view(View::new(Page::ForgotPassword))
            }
        }
    }

    #[must_use]
    pub fn reset_password_form(&self) -> Outcome {
        Outcome::view(View::new(Page::ResetPassword))
    }

    #[instrument(skip_all, fields(target = %request.target_email))]
    pub async fn reset_password(&self, caller: &CallerContext, request: ResetRequest) -> Outcome {
        match self.run_reset(caller, &request).await {
            ResetTerminal::Forbidden => Outcome::not_found(),
            ResetTerminal::Redisplay {
                errors,
                target,
                failure,
            } => {
                let mut view = View::new(Page::ResetPassword).with_errors(errors);
                view.email = target;
                Outcome::view(view).failed(failure)
            }
            ResetTerminal::RedirectForgot => Outcome::redirect(FORGOT_PASSWORD_PATH),
            ResetTerminal::Done => Outcome::redirect(RESET_PASSWORD_DONE_PATH),
        }
    }

    #[must_use]
    pub fn reset_password_done(&self) -> &'static str {
        RESET_PASSWORD_DONE
    }

    /// Drive the reset state machine to a terminal state.
    ///
    /// `AuthCheck -> FormCheck -> Lookup -> Apply`; any step may stop early.
    pub async fn run_reset(&self, caller: &CallerContext, request: &ResetRequest) -> ResetTerminal {
        let mut step = ResetStep::AuthCheck;
        loop {
            step = match step {
                ResetStep::AuthCheck => match self.privileged_caller(caller).await {
                    Ok(true) => ResetStep::FormCheck,
                    Ok(false) => {
                        debug!("Password reset refused for non-privileged caller");
                        return ResetTerminal::Forbidden;
                    }
                    Err(err) => {
                        error!("Failed to resolve caller: {err}");
                        return ResetTerminal::Forbidden;
                    }
                },
                ResetStep::FormCheck => {
                    let errors = request.validate();
                    if !errors.is_valid() {
                        return ResetTerminal::Redisplay {
                            errors,
                            target: Some(request.target_email.clone()),
                            failure: FailureKind::ValidationFailed,
                        };
                    }
                    ResetStep::Lookup
                }
                ResetStep::Lookup => {
                    match self
                        .provider
                        .find_user_by_name(request.target_email.trim())
                        .await
                    {
                        Ok(Some(user)) => ResetStep::Apply(user),
                        // Same answer as the forgot-password flow: no hint that the user is missing.
                        Ok(None) => return ResetTerminal::RedirectForgot,
                        Err(err) => {
                            error!("Failed to look up reset target: {err}");
                            return ResetTerminal::Redisplay {
                                errors: unexpected_error(),
                                target: None,
                                failure: FailureKind::ProviderOperationFailed,
                            };
                        }
                    }
                }
                ResetStep::Apply(user) => return self.apply_reset(&user, request).await,
            };
        }
    }

    async fn apply_reset(&self, user: &UserHandle, request: &ResetRequest) -> ResetTerminal {
        let applied = async {
            let token = self.provider.generate_password_reset_token(user).await?;
            self.provider
                .reset_password(user, &token, &request.new_password)
                .await
        }
        .await;

        match applied {
            Ok(result) if result.succeeded => {
                info!(user = %user, "Password reset by administrator.");
                ResetTerminal::Done
            }
            Ok(result) => {
                let mut errors = FormErrors::new();
                for message in result.errors {
                    errors.add_form_error(message);
                }
                ResetTerminal::Redisplay {
                    errors,
                    target: None,
                    failure: FailureKind::ProviderOperationFailed,
                }
            }
            Err(err) => {
                error!("Failed to reset password for {user}: {err}");
                ResetTerminal::Redisplay {
                    errors: unexpected_error(),
                    target: None,
                    failure: FailureKind::ProviderOperationFailed,
                }
            }
        }
    }

    /// Whether the caller carries a live session. Provider errors count as "no".
    pub async fn is_signed_in(&self, caller: &CallerContext) -> bool {
        match self.provider.is_signed_in(caller).await {
            Ok(signed_in) => signed_in,
            Err(err) => {
                error!("Failed to check session: {err}");
                false
            }
        }
    }

    async fn privileged_caller(&self, caller: &CallerContext) -> Result<bool, ProviderError> {
        if !self.provider.is_signed_in(caller).await? {
            return Ok(false);
        }
        let Some(user) = self.provider.current_user(caller).await? else {
            return Ok(false);
        };
        let user_name = self.provider.user_name(&user).await?;
        Ok(self.policy.is_privileged(&user, &user_name))
    }
}

fn login_view(credentials: &Credentials, return_url: Option<String>) -> View {
    View::new(Page::Login)
        .with_email(credentials.email.clone())
        .with_remember_me(credentials.remember_me)
        .with_return_url(return_url)
}

fn invalid_login(credentials: &Credentials, return_url: Option<String>) -> Outcome {
    let mut errors = FormErrors::new();
    errors.add_form_error(INVALID_LOGIN_ATTEMPT);
    Outcome::view(login_view(credentials, return_url).with_errors(errors))
        .failed(FailureKind::AuthenticationFailed)
}

fn register_view(request: &RegistrationRequest, return_url: Option<String>) -> View {
    View::new(Page::Register)
        .with_email(request.email.clone())
        .with_return_url(return_url)
}

fn register_failed(
    request: &RegistrationRequest,
    return_url: Option<String>,
    errors: FormErrors,
) -> Outcome {
    Outcome::view(register_view(request, return_url).with_errors(errors))
        .failed(FailureKind::ProviderOperationFailed)
}

fn unexpected_error() -> FormErrors {
    let mut errors = FormErrors::new();
    errors.add_form_error(UNEXPECTED_ERROR);
    errors
}
