//! 用户领域实体

pub mod membership;
pub mod role;
pub mod user;

pub use membership::*;
pub use role::*;
pub use user::*;
