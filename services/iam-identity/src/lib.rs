//! IAM Identity Service Library
//!
//! 多租户认证核心：
//! - `domain`: 用户、成员关系、权限、刷新令牌记录与存储端口
//! - `application`: 认证服务、租户解析、访问控制、请求管线
//! - `infrastructure`: Postgres / 内存存储、邮箱检查客户端、指标与后台清理
//! - `state`: 启动时的组件装配

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod state;

pub use state::AppState;
