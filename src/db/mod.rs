//! Persistence for accounts, roles, permissions and the login audit trail.
//!
//! - [`traits`]: the collaborator interfaces the login core depends on
//!   ([`AccountStore`], [`RoleStore`], [`AttemptLedger`]), plus provider
//!   selection and the store-call timeout helper.
//! - [`turso`]: the libSQL implementation (in-memory, local file, or remote
//!   Turso behind the `turso` feature).

pub mod traits;
pub mod turso;

pub use traits::{with_timeout, AccountStore, AttemptLedger, DatabaseProvider, RoleStore};
pub use turso::TursoClient;
