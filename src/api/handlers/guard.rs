//! Request guards: same-origin `POST`s and signed-in routes.

use axum::{
    extract::{Extension, Request},
    http::{
        header::{HOST, ORIGIN},
        HeaderMap, Method, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::warn;
use url::Url;

use super::{account::redirect, session::caller_context};
use crate::account::workflow::LOGIN_PATH;
use crate::api::state::AccountState;

const SEC_FETCH_SITE: &str = "sec-fetch-site";

/// Reject cross-site form posts.
pub async fn same_origin(request: Request, next: Next) -> Response {
    if request.method() == Method::POST && !is_same_origin(request.headers()) {
        warn!(path = %request.uri().path(), "Rejected cross-site POST");
        return (StatusCode::BAD_REQUEST, "Cross-site request rejected").into_response();
    }
    next.run(request).await
}

/// Send anonymous callers to the login page, remembering where they were going.
pub async fn require_signed_in(
    Extension(state): Extension<Arc<AccountState>>,
    request: Request,
    next: Next,
) -> Response {
    let caller = caller_context(request.headers());
    if state.workflow().is_signed_in(&caller).await {
        return next.run(request).await;
    }
    let target = request
        .uri()
        .path_and_query()
        .map_or("/", |path_and_query| path_and_query.as_str());
    let encoded: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
    redirect(&format!("{LOGIN_PATH}?ReturnUrl={encoded}"))
}

fn is_same_origin(headers: &HeaderMap) -> bool {
    if let Some(site) = headers.get(SEC_FETCH_SITE) {
        if !matches!(site.to_str(), Ok("same-origin" | "none")) {
            return false;
        }
    }

    let Some(origin) = headers.get(ORIGIN) else {
        return true;
    };
    let Some(host) = headers.get(HOST).and_then(|host| host.to_str().ok()) else {
        return false;
    };
    let Some(origin) = origin.to_str().ok().and_then(|origin| Url::parse(origin).ok()) else {
        return false;
    };
    let origin_host = match (origin.host_str(), origin.port()) {
        (Some(name), Some(port)) => format!("{name}:{port}"),
        (Some(name), None) => name.to_string(),
        (None, _) => return false,
    };
    origin_host.eq_ignore_ascii_case(host)
}
