//! Route handlers, the session cookie helpers and request guards.

pub mod account;
pub mod guard;
pub mod health;
pub mod root;
pub(crate) mod session;
