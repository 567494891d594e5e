//! 带超时的凭证存储装饰器

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tessera_common::{TenantId, UserId};
use tessera_errors::{AppError, AppResult};
use tracing::warn;

use crate::domain::refresh_token::RefreshTokenRecord;
use crate::domain::repositories::CredentialStore;
use crate::domain::user::User;
use crate::domain::value_objects::Email;

/// 为每次存储调用加上超时，超时表现为 `AppError::Storage`
pub struct TimedCredentialStore {
    inner: Arc<dyn CredentialStore>,
    timeout: Duration,
}

impl TimedCredentialStore {
    pub fn new(inner: Arc<dyn CredentialStore>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = AppResult<T>> + Send,
    ) -> AppResult<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, timeout_ms = self.timeout.as_millis() as u64, "Store call timed out");
                Err(AppError::storage(format!(
                    "{} timed out after {:?}",
                    operation, self.timeout
                )))
            }
        }
    }
}

#[async_trait]
impl CredentialStore for TimedCredentialStore {
    async fn find_user_by_email(&self, email: &Email) -> AppResult<Option<User>> {
        self.bounded("find_user_by_email", self.inner.find_user_by_email(email))
            .await
    }

    async fn find_user_by_id(&self, id: &UserId) -> AppResult<Option<User>> {
        self.bounded("find_user_by_id", self.inner.find_user_by_id(id))
            .await
    }

    async fn create_user(&self, user: &User) -> AppResult<()> {
        self.bounded("create_user", self.inner.create_user(user)).await
    }

    async fn update_user(&self, user: &User) -> AppResult<()> {
        self.bounded("update_user", self.inner.update_user(user)).await
    }

    async fn set_current_tenant(&self, user_id: &UserId, tenant_id: &TenantId) -> AppResult<()> {
        self.bounded(
            "set_current_tenant",
            self.inner.set_current_tenant(user_id, tenant_id),
        )
        .await
    }

    async fn save_refresh_token(&self, record: &RefreshTokenRecord) -> AppResult<()> {
        self.bounded("save_refresh_token", self.inner.save_refresh_token(record))
            .await
    }

    async fn find_refresh_token(&self, token_hash: &str) -> AppResult<Option<RefreshTokenRecord>> {
        self.bounded("find_refresh_token", self.inner.find_refresh_token(token_hash))
            .await
    }

    async fn take_refresh_token(&self, token_hash: &str) -> AppResult<Option<RefreshTokenRecord>> {
        self.bounded("take_refresh_token", self.inner.take_refresh_token(token_hash))
            .await
    }

    async fn delete_refresh_token(&self, token_hash: &str) -> AppResult<bool> {
        self.bounded(
            "delete_refresh_token",
            self.inner.delete_refresh_token(token_hash),
        )
        .await
    }

    async fn delete_refresh_tokens_for_user(&self, user_id: &UserId) -> AppResult<u64> {
        self.bounded(
            "delete_refresh_tokens_for_user",
            self.inner.delete_refresh_tokens_for_user(user_id),
        )
        .await
    }

    async fn delete_expired_refresh_tokens(&self, now: DateTime<Utc>) -> AppResult<u64> {
        self.bounded(
            "delete_expired_refresh_tokens",
            self.inner.delete_expired_refresh_tokens(now),
        )
        .await
    }
}
