//! Map parsed command-line arguments to an action.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{account, ARG_PORT};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let account_opts = account::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        privileged_account: account_opts.privileged_account,
        admin_password: account_opts.admin_password,
        session_ttl_seconds: account_opts.session_ttl_seconds,
        reset_token_ttl_seconds: account_opts.reset_token_ttl_seconds,
        max_failed_attempts: account_opts.max_failed_attempts,
        lockout_seconds: account_opts.lockout_seconds,
        cookie_secure: account_opts.cookie_secure,
    }))
}
