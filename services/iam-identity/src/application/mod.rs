//! 应用层
//!
//! 认证、租户解析、访问控制与请求管线

pub mod access_guard;
pub mod auth_service;
pub mod dto;
pub mod request_context;
pub mod tenant_resolver;

pub use access_guard::*;
pub use auth_service::*;
pub use dto::*;
pub use request_context::*;
pub use tenant_resolver::*;
