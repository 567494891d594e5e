//! 凭证存储 trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tessera_common::{TenantId, UserId};
use tessera_errors::AppResult;

use crate::domain::refresh_token::RefreshTokenRecord;
use crate::domain::user::User;
use crate::domain::value_objects::Email;

/// 用户记录与刷新令牌摘要的持久化接口
///
/// 实现方负责把底层错误包装为 `AppError::Storage`，调用方永远看不到驱动错误。
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// 根据邮箱查找用户（含角色与成员关系）
    async fn find_user_by_email(&self, email: &Email) -> AppResult<Option<User>>;

    /// 根据 ID 查找用户（含角色与成员关系）
    async fn find_user_by_id(&self, id: &UserId) -> AppResult<Option<User>>;

    /// 创建用户，邮箱重复时返回 `EmailAlreadyExists`
    async fn create_user(&self, user: &User) -> AppResult<()>;

    /// 更新用户自身字段（密码、验证状态、名称）
    ///
    /// 角色与成员关系由其它模块维护，这里不改写。
    /// 当前租户指针只经由 [`CredentialStore::set_current_tenant`] 写入。
    async fn update_user(&self, user: &User) -> AppResult<()>;

    /// 更新当前租户指针
    async fn set_current_tenant(&self, user_id: &UserId, tenant_id: &TenantId) -> AppResult<()>;

    async fn save_refresh_token(&self, record: &RefreshTokenRecord) -> AppResult<()>;

    async fn find_refresh_token(&self, token_hash: &str) -> AppResult<Option<RefreshTokenRecord>>;

    /// 原子地读取并删除；并发调用中至多一个拿到记录
    async fn take_refresh_token(&self, token_hash: &str) -> AppResult<Option<RefreshTokenRecord>>;

    /// 返回是否确实删除了记录
    async fn delete_refresh_token(&self, token_hash: &str) -> AppResult<bool>;

    async fn delete_refresh_tokens_for_user(&self, user_id: &UserId) -> AppResult<u64>;

    async fn delete_expired_refresh_tokens(&self, now: DateTime<Utc>) -> AppResult<u64>;
}
