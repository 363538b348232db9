use clap::{Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;

use crate::account::DEFAULT_PRIVILEGED_ACCOUNT;

pub const ARG_PRIVILEGED_ACCOUNT: &str = "privileged-account";
pub const ARG_ADMIN_PASSWORD: &str = "admin-password";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_RESET_TOKEN_TTL_SECONDS: &str = "reset-token-ttl-seconds";
pub const ARG_MAX_FAILED_ATTEMPTS: &str = "max-failed-attempts";
pub const ARG_LOCKOUT_SECONDS: &str = "lockout-seconds";
pub const ARG_COOKIE_SECURE: &str = "cookie-secure";

/// Upper bound for every lifetime option: one year.
pub const MAX_LIFETIME_SECONDS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug)]
pub struct Options {
    pub privileged_account: String,
    pub admin_password: Option<SecretString>,
    pub session_ttl_seconds: u64,
    pub reset_token_ttl_seconds: u64,
    pub max_failed_attempts: u32,
    pub lockout_seconds: u64,
    pub cookie_secure: bool,
}

impl Options {
    /// Parse account arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the privileged account is empty.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let privileged_account = matches
            .get_one::<String>(ARG_PRIVILEGED_ACCOUNT)
            .cloned()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_PRIVILEGED_ACCOUNT}"))?;

        Ok(Self {
            privileged_account,
            admin_password: matches
                .get_one::<String>(ARG_ADMIN_PASSWORD)
                .filter(|v| !v.is_empty())
                .map(|v| SecretString::from(v.clone())),
            session_ttl_seconds: read(matches, ARG_SESSION_TTL_SECONDS)?,
            reset_token_ttl_seconds: read(matches, ARG_RESET_TOKEN_TTL_SECONDS)?,
            max_failed_attempts: read(matches, ARG_MAX_FAILED_ATTEMPTS)?,
            lockout_seconds: read(matches, ARG_LOCKOUT_SECONDS)?,
            cookie_secure: matches.get_flag(ARG_COOKIE_SECURE),
        })
    }
}

fn read<T: Clone + Send + Sync + 'static>(matches: &ArgMatches, id: &str) -> anyhow::Result<T> {
    matches
        .get_one::<T>(id)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PRIVILEGED_ACCOUNT)
                .long(ARG_PRIVILEGED_ACCOUNT)
                .help("User name allowed to reset other users' passwords")
                .env("GATEHOUSE_PRIVILEGED_ACCOUNT")
                .default_value(DEFAULT_PRIVILEGED_ACCOUNT),
        )
        .arg(
            Arg::new(ARG_ADMIN_PASSWORD)
                .long(ARG_ADMIN_PASSWORD)
                .help("Create the privileged account with this password at startup")
                .env("GATEHOUSE_ADMIN_PASSWORD")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session lifetime in seconds")
                .env("GATEHOUSE_SESSION_TTL_SECONDS")
                .default_value("1209600")
                .value_parser(clap::value_parser!(u64).range(1..=MAX_LIFETIME_SECONDS)),
        )
        .arg(
            Arg::new(ARG_RESET_TOKEN_TTL_SECONDS)
                .long(ARG_RESET_TOKEN_TTL_SECONDS)
                .help("Password reset token lifetime in seconds")
                .env("GATEHOUSE_RESET_TOKEN_TTL_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(u64).range(1..=MAX_LIFETIME_SECONDS)),
        )
        .arg(
            Arg::new(ARG_MAX_FAILED_ATTEMPTS)
                .long(ARG_MAX_FAILED_ATTEMPTS)
                .help("Failed attempts before an account is locked out")
                .env("GATEHOUSE_MAX_FAILED_ATTEMPTS")
                .default_value("5")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new(ARG_LOCKOUT_SECONDS)
                .long(ARG_LOCKOUT_SECONDS)
                .help("Lockout duration in seconds")
                .env("GATEHOUSE_LOCKOUT_SECONDS")
                .default_value("300")
                .value_parser(clap::value_parser!(u64).range(0..=MAX_LIFETIME_SECONDS)),
        )
        .arg(
            Arg::new(ARG_COOKIE_SECURE)
                .long(ARG_COOKIE_SECURE)
                .help("Mark the session cookie Secure (serve over HTTPS)")
                .env("GATEHOUSE_COOKIE_SECURE")
                .action(ArgAction::SetTrue),
        )
}
