//! 领域服务

pub mod password_service;

pub use password_service::*;
