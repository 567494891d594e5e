//! 值对象

pub mod display_name;
pub mod email;
pub mod password;

pub use display_name::*;
pub use email::*;
pub use password::*;
