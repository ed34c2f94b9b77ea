//! Staff accounts, roles and the login audit record.
//!
//! The account entity carries its own lockout state machine; the
//! [`AccountService`] covers the registration and role-change use cases.

pub mod account;
pub mod attempt;
pub mod role;
pub mod service;
pub mod validation;

pub use account::{Account, FailedLogin, LockoutPolicy};
pub use attempt::LoginAttempt;
pub use role::{Permission, Role, RoleName};
pub use service::AccountService;
pub use validation::{PasswordError, PasswordPolicy, RegistrationInput};
