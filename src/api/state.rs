//! Shared HTTP state: the workflow, compiled views and cookie settings.

use crate::account::AuthWorkflow;

use super::views::Views;

pub const SESSION_COOKIE_NAME: &str = "gatehouse_session";

#[derive(Clone, Debug, Default)]
pub struct CookieConfig {
    secure: bool,
}

impl CookieConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark cookies `Secure` (only when served over HTTPS).
    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn secure(&self) -> bool {
        self.secure
    }
}

pub struct AccountState {
    workflow: AuthWorkflow,
    views: Views,
    cookies: CookieConfig,
}

impl AccountState {
    #[must_use]
    pub fn new(workflow: AuthWorkflow, views: Views, cookies: CookieConfig) -> Self {
        Self {
            workflow,
            views,
            cookies,
        }
    }

    #[must_use]
    pub fn workflow(&self) -> &AuthWorkflow {
        &self.workflow
    }

    #[must_use]
    pub fn views(&self) -> &Views {
        &self.views
    }

    #[must_use]
    pub fn cookies(&self) -> &CookieConfig {
        &self.cookies
    }
}
