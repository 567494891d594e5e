//! 外部邮箱有效性检查

use async_trait::async_trait;
use tessera_errors::AppResult;

use crate::domain::value_objects::Email;

/// 外部邮箱检查服务（拒绝一次性邮箱、无效地址等）
///
/// 返回 `Ok(false)` 表示地址被拒绝；`Err` 表示服务不可用。
#[async_trait]
pub trait EmailChecker: Send + Sync {
    async fn is_deliverable(&self, email: &Email) -> AppResult<bool>;
}
