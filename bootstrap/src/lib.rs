//! tessera-bootstrap - 统一服务启动骨架
//!
//! 所有服务复用的启动逻辑

mod interceptor;
mod runtime;

pub use interceptor::*;
pub use runtime::*;
