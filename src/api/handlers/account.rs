//! `/Account/*` handlers.
//!
//! Each handler parses the form, hands it to the workflow and turns the
//! resulting [`Outcome`] into a response: a rendered page, a `302 Found`
//! redirect or a `404`, plus a `Set-Cookie` when the session changed.

use axum::{
    extract::{Extension, Form, Query},
    http::{
        header::{CONTENT_TYPE, LOCATION, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{Html, IntoResponse, Response},
};
use secrecy::SecretString;
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

use super::session::{caller_context, clear_session_cookie, session_cookie};
use crate::account::{
    Credentials, Navigation, Outcome, RegistrationRequest, ResetRequest, SessionChange,
};
use crate::api::state::AccountState;

#[derive(Deserialize, Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReturnUrlQuery {
    /// Local url to continue to after signing in.
    #[serde(rename = "ReturnUrl")]
    pub return_url: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Checkbox value; any of `true`, `on` or `1` means checked.
    #[serde(default)]
    pub remember_me: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct RegisterForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

/// Administrator reset: `Email` names the account to reset.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct ResetPasswordForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

impl From<LoginForm> for Credentials {
    fn from(form: LoginForm) -> Self {
        let remember_me = matches!(
            form.remember_me.as_deref().map(str::to_ascii_lowercase).as_deref(),
            Some("true" | "on" | "1")
        );
        Self {
            email: form.email,
            password: SecretString::from(form.password),
            remember_me,
        }
    }
}

impl From<RegisterForm> for RegistrationRequest {
    fn from(form: RegisterForm) -> Self {
        Self {
            email: form.email,
            password: SecretString::from(form.password),
            confirm_password: SecretString::from(form.confirm_password),
        }
    }
}

impl From<ResetPasswordForm> for ResetRequest {
    fn from(form: ResetPasswordForm) -> Self {
        Self {
            target_email: form.email,
            new_password: SecretString::from(form.password),
            confirm_password: SecretString::from(form.confirm_password),
        }
    }
}

#[utoipa::path(
    get,
    path = "/Account/Login",
    responses((status = 200, description = "Login form", body = String, content_type = "text/html")),
    tag = "account"
)]
pub async fn login_form(
    Extension(state): Extension<Arc<AccountState>>,
    Query(query): Query<ReturnUrlQuery>,
) -> Response {
    respond(&state, state.workflow().login_form(query.return_url))
}

#[utoipa::path(
    post,
    path = "/Account/Login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Signed in, redirect to the return url"),
        (status = 200, description = "Form redisplayed with errors, or the lockout page", body = String, content_type = "text/html"),
        (status = 400, description = "Cross-site request")
    ),
    tag = "account"
)]
pub async fn login(
    Extension(state): Extension<Arc<AccountState>>,
    Query(query): Query<ReturnUrlQuery>,
    Form(form): Form<LoginForm>,
) -> Response {
    let outcome = state
        .workflow()
        .login(form.into(), query.return_url)
        .await;
    respond(&state, outcome)
}

#[utoipa::path(
    get,
    path = "/Account/Register",
    responses((status = 200, description = "Registration form", body = String, content_type = "text/html")),
    tag = "account"
)]
pub async fn register_form(
    Extension(state): Extension<Arc<AccountState>>,
    Query(query): Query<ReturnUrlQuery>,
) -> Response {
    respond(&state, state.workflow().register_form(query.return_url))
}

#[utoipa::path(
    post,
    path = "/Account/Register",
    request_body(content = RegisterForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Account created and signed in"),
        (status = 200, description = "Form redisplayed with errors", body = String, content_type = "text/html"),
        (status = 400, description = "Cross-site request")
    ),
    tag = "account"
)]
pub async fn register(
    Extension(state): Extension<Arc<AccountState>>,
    Query(query): Query<ReturnUrlQuery>,
    Form(form): Form<RegisterForm>,
) -> Response {
    let outcome = state
        .workflow()
        .register(form.into(), query.return_url)
        .await;
    respond(&state, outcome)
}

#[utoipa::path(
    post,
    path = "/Account/LogOff",
    responses(
        (status = 302, description = "Signed out, redirect home (or to login when anonymous)"),
        (status = 400, description = "Cross-site request")
    ),
    tag = "account"
)]
pub async fn log_off(Extension(state): Extension<Arc<AccountState>>, headers: HeaderMap) -> Response {
    let caller = caller_context(&headers);
    let outcome = state.workflow().log_off(&caller).await;
    respond(&state, outcome)
}

#[utoipa::path(
    get,
    path = "/Account/ForgotPassword",
    responses(
        (status = 200, description = "Forgot password page", body = String, content_type = "text/html"),
        (status = 302, description = "Administrator, redirect to the reset form")
    ),
    tag = "account"
)]
pub async fn forgot_password(
    Extension(state): Extension<Arc<AccountState>>,
    headers: HeaderMap,
) -> Response {
    let caller = caller_context(&headers);
    let outcome = state.workflow().forgot_password(&caller).await;
    respond(&state, outcome)
}

#[utoipa::path(
    get,
    path = "/Account/ResetPassword",
    responses(
        (status = 200, description = "Reset form", body = String, content_type = "text/html"),
        (status = 302, description = "Anonymous, redirect to login")
    ),
    tag = "account"
)]
pub async fn reset_password_form(Extension(state): Extension<Arc<AccountState>>) -> Response {
    respond(&state, state.workflow().reset_password_form())
}

#[utoipa::path(
    post,
    path = "/Account/ResetPassword",
    request_body(content = ResetPasswordForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Password reset, or unknown account"),
        (status = 200, description = "Form redisplayed with errors", body = String, content_type = "text/html"),
        (status = 404, description = "Caller may not reset passwords"),
        (status = 400, description = "Cross-site request")
    ),
    tag = "account"
)]
pub async fn reset_password(
    Extension(state): Extension<Arc<AccountState>>,
    headers: HeaderMap,
    Form(form): Form<ResetPasswordForm>,
) -> Response {
    let caller = caller_context(&headers);
    let outcome = state.workflow().reset_password(&caller, form.into()).await;
    respond(&state, outcome)
}

#[utoipa::path(
    get,
    path = "/Account/ResetPasswordDone",
    responses((status = 200, description = "Reset confirmation", body = String, content_type = "text/plain")),
    tag = "account"
)]
pub async fn reset_password_done(Extension(state): Extension<Arc<AccountState>>) -> Response {
    (
        [(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"))],
        state.workflow().reset_password_done(),
    )
        .into_response()
}

/// `302 Found` to `location`; unusable locations fall back to home.
pub(crate) fn redirect(location: &str) -> Response {
    let location = HeaderValue::from_str(location).unwrap_or_else(|err| {
        error!("Invalid redirect location: {err}");
        HeaderValue::from_static("/")
    });
    (StatusCode::FOUND, [(LOCATION, location)]).into_response()
}

fn respond(state: &AccountState, outcome: Outcome) -> Response {
    let mut response = match &outcome.navigation {
        Navigation::View(view) => match state.views().render(view) {
            Ok(html) => Html(html).into_response(),
            Err(err) => {
                error!("Failed to render {:?} view: {err}", view.page);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        },
        Navigation::Redirect(location) => redirect(location),
        Navigation::NotFound => StatusCode::NOT_FOUND.into_response(),
    };

    let cookie = match &outcome.session {
        SessionChange::Unchanged => None,
        SessionChange::Established(ticket) => Some(session_cookie(state.cookies(), ticket)),
        SessionChange::Cleared => Some(clear_session_cookie(state.cookies())),
    };
    match cookie {
        Some(Ok(cookie)) => {
            response.headers_mut().append(SET_COOKIE, cookie);
        }
        Some(Err(err)) => error!("Failed to build session cookie: {err}"),
        None => {}
    }

    response
}
