//! 基础设施层
//!
//! 持久化、外部服务、可观测性与后台任务

pub mod cleanup;
pub mod external;
pub mod observability;
pub mod persistence;
