//! 内存凭证存储（测试 / 本地开发）

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tessera_common::{TenantId, UserId};
use tessera_errors::{AppError, AppResult};
use tokio::sync::RwLock;

use crate::domain::refresh_token::RefreshTokenRecord;
use crate::domain::repositories::CredentialStore;
use crate::domain::user::User;
use crate::domain::value_objects::Email;

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    /// 小写邮箱 -> 用户 ID
    emails: HashMap<String, UserId>,
    /// token_hash -> 记录
    refresh_tokens: HashMap<String, RefreshTokenRecord>,
}

/// 所有表共用一把锁，create_user 的唯一性检查与写入因此是原子的
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    tables: RwLock<Tables>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前保存的刷新令牌数量
    pub async fn refresh_token_count(&self) -> usize {
        self.tables.read().await.refresh_tokens.len()
    }

    /// 直接替换完整用户（包括成员关系与角色），用于测试准备数据
    pub async fn put_user(&self, user: User) {
        let mut tables = self.tables.write().await;
        tables
            .emails
            .insert(user.email.as_str().to_string(), user.id);
        tables.users.insert(user.id, user);
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_user_by_email(&self, email: &Email) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .emails
            .get(email.as_str())
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn find_user_by_id(&self, id: &UserId) -> AppResult<Option<User>> {
        Ok(self.tables.read().await.users.get(id).cloned())
    }

    async fn create_user(&self, user: &User) -> AppResult<()> {
        let mut tables = self.tables.write().await;

        if tables.emails.contains_key(user.email.as_str()) {
            return Err(AppError::EmailAlreadyExists);
        }
        if tables.users.contains_key(&user.id) {
            return Err(AppError::storage(format!("Duplicate user id {}", user.id)));
        }

        tables
            .emails
            .insert(user.email.as_str().to_string(), user.id);
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &User) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .users
            .get_mut(&user.id)
            .ok_or(AppError::UserNotFound)?;

        stored.password_hash = user.password_hash.clone();
        stored.display_name = user.display_name.clone();
        stored.email_verified = user.email_verified;
        stored.email_verified_at = user.email_verified_at;
        stored.audit_info.updated_at = user.audit_info.updated_at;
        Ok(())
    }

    async fn set_current_tenant(&self, user_id: &UserId, tenant_id: &TenantId) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .users
            .get_mut(user_id)
            .ok_or(AppError::UserNotFound)?;

        stored.current_tenant_id = Some(*tenant_id);
        stored.audit_info.touch();
        Ok(())
    }

    async fn save_refresh_token(&self, record: &RefreshTokenRecord) -> AppResult<()> {
        self.tables
            .write()
            .await
            .refresh_tokens
            .insert(record.token_hash.clone(), record.clone());
        Ok(())
    }

    async fn find_refresh_token(&self, token_hash: &str) -> AppResult<Option<RefreshTokenRecord>> {
        Ok(self
            .tables
            .read()
            .await
            .refresh_tokens
            .get(token_hash)
            .cloned())
    }

    async fn take_refresh_token(&self, token_hash: &str) -> AppResult<Option<RefreshTokenRecord>> {
        Ok(self.tables.write().await.refresh_tokens.remove(token_hash))
    }

    async fn delete_refresh_token(&self, token_hash: &str) -> AppResult<bool> {
        Ok(self
            .tables
            .write()
            .await
            .refresh_tokens
            .remove(token_hash)
            .is_some())
    }

    async fn delete_refresh_tokens_for_user(&self, user_id: &UserId) -> AppResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.refresh_tokens.len();
        tables
            .refresh_tokens
            .retain(|_, record| &record.user_id != user_id);
        Ok((before - tables.refresh_tokens.len()) as u64)
    }

    async fn delete_expired_refresh_tokens(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.refresh_tokens.len();
        tables
            .refresh_tokens
            .retain(|_, record| !record.is_expired(now));
        Ok((before - tables.refresh_tokens.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{DisplayName, HashedPassword};
    use chrono::Duration;
    use std::sync::Arc;

    fn user(email: &str) -> User {
        User::new(
            Email::new(email).unwrap(),
            HashedPassword::from_hash("$argon2id$stub"),
            DisplayName::new("Test User").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = InMemoryCredentialStore::new();
        store.create_user(&user("a@example.com")).await.unwrap();

        let err = store.create_user(&user("A@Example.com")).await.unwrap_err();
        assert_eq!(err, AppError::EmailAlreadyExists);
    }

    #[tokio::test]
    async fn test_update_missing_user() {
        let store = InMemoryCredentialStore::new();
        let err = store.update_user(&user("a@example.com")).await.unwrap_err();
        assert_eq!(err, AppError::UserNotFound);
    }

    #[tokio::test]
    async fn test_update_user_leaves_current_tenant_alone() {
        let store = InMemoryCredentialStore::new();
        let stale = user("a@example.com");
        store.create_user(&stale).await.unwrap();

        let tenant = TenantId::new();
        store.set_current_tenant(&stale.id, &tenant).await.unwrap();

        let mut forged = stale.clone();
        forged.current_tenant_id = Some(TenantId::new());
        store.update_user(&stale).await.unwrap();
        store.update_user(&forged).await.unwrap();

        let stored = store.find_user_by_id(&stale.id).await.unwrap().unwrap();
        assert_eq!(stored.current_tenant_id, Some(tenant));
    }

    #[tokio::test]
    async fn test_take_is_single_use_under_concurrency() {
        let store = Arc::new(InMemoryCredentialStore::new());
        let record = RefreshTokenRecord::new(UserId::new(), "h".into(), Utc::now() + Duration::days(1));
        store.save_refresh_token(&record).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.take_refresh_token("h").await.unwrap() })
            })
            .collect();

        let mut taken = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                taken += 1;
            }
        }
        assert_eq!(taken, 1);
    }

    #[tokio::test]
    async fn test_delete_expired_and_per_user() {
        let store = InMemoryCredentialStore::new();
        let now = Utc::now();
        let alice = UserId::new();
        let bob = UserId::new();

        for (hash, owner, expires_at) in [
            ("a1", alice, now + Duration::days(1)),
            ("a2", alice, now - Duration::days(1)),
            ("b1", bob, now + Duration::days(1)),
        ] {
            store
                .save_refresh_token(&RefreshTokenRecord::new(owner, hash.into(), expires_at))
                .await
                .unwrap();
        }

        assert_eq!(store.delete_expired_refresh_tokens(now).await.unwrap(), 1);
        assert_eq!(store.delete_refresh_tokens_for_user(&alice).await.unwrap(), 1);
        assert_eq!(store.refresh_token_count().await, 1);
        assert!(store.find_refresh_token("b1").await.unwrap().is_some());
    }
}
