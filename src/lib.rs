//! # Gatehouse (account management)
//!
//! `gatehouse` serves the account pages of a web application: login,
//! registration, log-off and an administrator-driven password reset.
//!
//! ## Layout
//!
//! - [`account`] holds the request workflow ([`account::AuthWorkflow`]) and the
//!   [`account::IdentityProvider`] port it drives. The workflow never hashes
//!   passwords or stores sessions itself; it turns provider results into a
//!   navigation decision (render a view, redirect, or not found).
//! - [`api`] is the axum shell: routes under `/Account/*`, HTML views, the
//!   session cookie and a same-origin check for every `POST`.
//! - [`cli`] parses the command line, initializes tracing and starts the server.
//!
//! ## Enumeration Safety
//!
//! A failed login always reports `Invalid login attempt.` regardless of which
//! credential was wrong, and a password reset aimed at an unknown user
//! redirects exactly like the "forgot password" flow.
//!
//! ## Password Reset
//!
//! Resets are restricted to a single privileged account (`Admin@admin.com` by
//! default). Non-privileged callers get `404 Not Found` rather than
//! `403 Forbidden`.

pub mod account;
pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }
}
