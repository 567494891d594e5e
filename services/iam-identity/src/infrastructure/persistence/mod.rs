//! 持久化实现

pub mod in_memory_credential_store;
pub mod postgres_credential_store;
pub mod schema;
pub mod timed_credential_store;

pub use in_memory_credential_store::*;
pub use schema::{migrations, run_migrations};
pub use postgres_credential_store::*;
pub use timed_credential_store::*;
