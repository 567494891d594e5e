//! 领域层
//!
//! 实体、值对象、仓储接口与领域服务

pub mod permission;
pub mod refresh_token;
pub mod repositories;
pub mod services;
pub mod tenant_context;
pub mod user;
pub mod value_objects;
