//! 外部服务客户端

pub mod http_email_checker;

pub use http_email_checker::*;
