//! Who may use the administrative password reset.

use super::types::UserHandle;

pub const DEFAULT_PRIVILEGED_ACCOUNT: &str = "Admin@admin.com";

pub trait PrivilegePolicy: Send + Sync {
    fn is_privileged(&self, user: &UserHandle, user_name: &str) -> bool;
}

/// Grants privilege to exactly one account, matched by user name (ordinal).
#[derive(Clone, Debug)]
pub struct NamedAccountPolicy {
    account: String,
}

impl NamedAccountPolicy {
    #[must_use]
    pub fn new(account: String) -> Self {
        Self { account }
    }

    #[must_use]
    pub fn account(&self) -> &str {
        &self.account
    }
}

impl Default for NamedAccountPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_PRIVILEGED_ACCOUNT.to_string())
    }
}

impl PrivilegePolicy for NamedAccountPolicy {
    fn is_privileged(&self, _user: &UserHandle, user_name: &str) -> bool {
        user_name == self.account
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    #[test]
    fn default_policy_matches_admin_only() {
        let policy = NamedAccountPolicy::default();
        let user = UserHandle::new(Ulid::new());
        assert!(policy.is_privileged(&user, "Admin@admin.com"));
        assert!(!policy.is_privileged(&user, "user@example.com"));
    }

    #[test]
    fn comparison_is_case_sensitive() {
        let policy = NamedAccountPolicy::default();
        let user = UserHandle::new(Ulid::new());
        assert!(!policy.is_privileged(&user, "admin@admin.com"));
    }

    #[test]
    fn configured_account_replaces_default() {
        let policy = NamedAccountPolicy::new("ops@example.com".to_string());
        let user = UserHandle::new(Ulid::new());
        assert_eq!(policy.account(), "ops@example.com");
        assert!(policy.is_privileged(&user, "ops@example.com"));
        assert!(!policy.is_privileged(&user, DEFAULT_PRIVILEGED_ACCOUNT));
    }
}
