//! Account workflow and the identity provider port it drives.
//!
//! The workflow decides navigation only. Passwords, lockout counters, reset
//! tokens and sessions belong to the [`IdentityProvider`]; the bundled
//! [`InMemoryIdentityProvider`] is a development implementation.
//!
//! ## Reset Password
//!
//! `AuthCheck -> FormCheck -> Lookup -> Apply`, ending in one of
//! `Forbidden` (404), `Redisplay`, `RedirectForgot` or `Done`. An unknown
//! target redirects to the forgot-password page, like any anonymous visitor.

pub mod memory;
pub mod policy;
pub mod provider;
pub mod redirect;
mod tokens;
pub mod types;
pub mod validation;
pub mod workflow;

pub use memory::{IdentityOptions, InMemoryIdentityProvider};
pub use policy::{NamedAccountPolicy, PrivilegePolicy, DEFAULT_PRIVILEGED_ACCOUNT};
pub use provider::{IdentityProvider, ProviderError};
pub use types::{
    CallerContext, CreateUserResult, Credentials, IdentityResult, RegistrationRequest,
    ResetRequest, ResetToken, SessionTicket, SignInFailure, SignInOutcome, UserHandle,
};
pub use validation::{Field, FormError, FormErrors};
pub use workflow::{
    AuthWorkflow, FailureKind, Navigation, Outcome, Page, ResetTerminal, SessionChange, View,
};
