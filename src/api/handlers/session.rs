//! Session cookie plumbing between the workflow and the browser.

use axum::http::{
    header::{InvalidHeaderValue, AUTHORIZATION, COOKIE},
    HeaderMap, HeaderValue,
};
use secrecy::{ExposeSecret, SecretString};

use crate::account::{CallerContext, SessionTicket};
use crate::api::state::{CookieConfig, SESSION_COOKIE_NAME};

/// Build the `HttpOnly` session cookie for a new ticket.
///
/// Only persistent tickets get a `Max-Age`; the others live for the browser
/// session.
pub(crate) fn session_cookie(
    config: &CookieConfig,
    ticket: &SessionTicket,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={}; Path=/; HttpOnly; SameSite=Lax",
        ticket.token.expose_secret()
    );
    if ticket.persistent {
        cookie.push_str(&format!("; Max-Age={}", ticket.max_age.as_secs()));
    }
    if config.secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn clear_session_cookie(config: &CookieConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// What the caller presented: a bearer token wins over the cookie.
pub(crate) fn caller_context(headers: &HeaderMap) -> CallerContext {
    extract_session_token(headers).map_or_else(CallerContext::anonymous, |token| {
        CallerContext::with_session_token(SecretString::from(token))
    })
}

fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
                continue;
            };
            let val = val.trim();
            if key.trim() == SESSION_COOKIE_NAME && !val.is_empty() {
                return Some(val.to_string());
            }
        }
    }
    None
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
