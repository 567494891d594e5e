//! 仓储接口

pub mod credential_store;
pub mod email_checker;

pub use credential_store::*;
pub use email_checker::*;
