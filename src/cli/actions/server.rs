use crate::{
    account::{
        AuthWorkflow, IdentityOptions, IdentityProvider, InMemoryIdentityProvider,
        NamedAccountPolicy,
    },
    api,
};
use anyhow::{anyhow, Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub privileged_account: String,
    pub admin_password: Option<SecretString>,
    pub session_ttl_seconds: u64,
    pub reset_token_ttl_seconds: u64,
    pub max_failed_attempts: u32,
    pub lockout_seconds: u64,
    pub cookie_secure: bool,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the privileged account cannot be seeded or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let state = state(&args).await?;
    api::new(args.port, state).await
}

/// Wire the identity provider, workflow and views together.
async fn state(args: &Args) -> Result<Arc<api::AccountState>> {
    let options = IdentityOptions::new()
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_reset_token_ttl_seconds(args.reset_token_ttl_seconds)
        .with_max_failed_attempts(args.max_failed_attempts)
        .with_lockout_seconds(args.lockout_seconds);
    debug!("Identity options: {:?}", options);

    let provider = Arc::new(InMemoryIdentityProvider::new(options));

    if let Some(password) = &args.admin_password {
        seed_privileged_account(provider.as_ref(), &args.privileged_account, password).await?;
    }

    let workflow = AuthWorkflow::new(
        provider,
        Arc::new(NamedAccountPolicy::new(args.privileged_account.clone())),
    );
    let views = api::Views::new().context("Failed to load page templates")?;
    let cookies = api::CookieConfig::new().with_secure(args.cookie_secure);

    Ok(Arc::new(api::AccountState::new(workflow, views, cookies)))
}

async fn seed_privileged_account(
    provider: &dyn IdentityProvider,
    account: &str,
    password: &SecretString,
) -> Result<()> {
    if provider
        .find_user_by_name(account)
        .await
        .context("Failed to look up the privileged account")?
        .is_some()
    {
        return Ok(());
    }

    let created = provider
        .create_user(account, account, password)
        .await
        .context("Failed to create the privileged account")?;
    if !created.result.succeeded {
        return Err(anyhow!(
            "Failed to create the privileged account {account}: {}",
            created.result.errors.join(" ")
        ));
    }

    info!("Created privileged account {account}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{CallerContext, Credentials, SessionChange};

    fn args(admin_password: Option<&str>) -> Args {
        Args {
            port: 0,
            privileged_account: "ops@example.com".to_string(),
            admin_password: admin_password.map(|p| SecretString::from(p.to_string())),
            session_ttl_seconds: 60,
            reset_token_ttl_seconds: 60,
            max_failed_attempts: 5,
            lockout_seconds: 60,
            cookie_secure: true,
        }
    }

    #[tokio::test]
    async fn seeded_account_can_reset_passwords() {
        let state = state(&args(Some("S3cret!pw"))).await;
        assert!(state.is_ok());
        let Ok(state) = state else { return };
        assert!(state.cookies().secure());

        let outcome = state
            .workflow()
            .login(
                Credentials {
                    email: "ops@example.com".to_string(),
                    password: SecretString::from("S3cret!pw".to_string()),
                    remember_me: false,
                },
                None,
            )
            .await;
        let SessionChange::Established(ticket) = outcome.session else {
            panic!("seeded account should sign in");
        };
        let caller = CallerContext::with_session_token(ticket.token);
        let outcome = state.workflow().forgot_password(&caller).await;
        assert_eq!(outcome.location(), Some("/Account/ResetPassword"));
    }

    #[tokio::test]
    async fn weak_admin_password_fails_startup() {
        let result = state(&args(Some("weak"))).await;
        let message = result.err().map(|err| err.to_string());
        assert!(message.is_some_and(|m| m.contains("Passwords must be at least 6 characters.")));
    }

    #[tokio::test]
    async fn oversized_session_ttl_fails_login_without_panicking() {
        let mut args = args(Some("S3cret!pw"));
        args.session_ttl_seconds = u64::MAX;
        let Ok(state) = state(&args).await else {
            panic!("seeding does not open a session");
        };

        let outcome = state
            .workflow()
            .login(
                Credentials {
                    email: "ops@example.com".to_string(),
                    password: SecretString::from("S3cret!pw".to_string()),
                    remember_me: true,
                },
                None,
            )
            .await;
        assert!(matches!(outcome.session, SessionChange::Unchanged));
        assert_eq!(outcome.location(), None);
    }

    #[tokio::test]
    async fn seeding_is_skipped_for_existing_account() {
        let provider = InMemoryIdentityProvider::default();
        let password = SecretString::from("S3cret!pw".to_string());
        assert!(
            seed_privileged_account(&provider, "ops@example.com", &password)
                .await
                .is_ok()
        );
        assert!(
            seed_privileged_account(&provider, "ops@example.com", &password)
                .await
                .is_ok()
        );
    }
}
