//! 认证服务
//!
//! 登录、注册、刷新令牌与用户资料。服务本身无可变状态，所有持久化经由
//! [`CredentialStore`]。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tessera_auth_core::{TokenCodec, TokenKind, hash_refresh_token};
use tessera_common::{TenantId, UserId};
use tessera_config::RefreshPolicy;
use tessera_errors::{AppError, AppResult};
use tracing::{debug, error, info, instrument, warn};

use crate::application::dto::{RegisterRequest, TokenPair};
use crate::domain::refresh_token::RefreshTokenRecord;
use crate::domain::repositories::{CredentialStore, EmailChecker};
use crate::domain::services::PasswordService;
use crate::domain::tenant_context::{TenantContext, TenantSource};
use crate::domain::user::{User, UserProfile};
use crate::domain::value_objects::{DisplayName, Email, PasswordPolicy};
use crate::infrastructure::observability::metrics;

pub struct AuthenticationService {
    store: Arc<dyn CredentialStore>,
    codec: TokenCodec,
    passwords: PasswordService,
    email_checker: Option<Arc<dyn EmailChecker>>,
    refresh_policy: RefreshPolicy,
}

impl AuthenticationService {
    pub fn new(store: Arc<dyn CredentialStore>, codec: TokenCodec) -> Self {
        Self {
            store,
            codec,
            passwords: PasswordService::default(),
            email_checker: None,
            refresh_policy: RefreshPolicy::default(),
        }
    }

    pub fn with_email_checker(mut self, checker: Arc<dyn EmailChecker>) -> Self {
        self.email_checker = Some(checker);
        self
    }

    pub fn with_refresh_policy(mut self, policy: RefreshPolicy) -> Self {
        self.refresh_policy = policy;
        self
    }

    pub fn with_password_policy(mut self, policy: PasswordPolicy) -> Self {
        self.passwords = PasswordService::new(policy);
        self
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn refresh_policy(&self) -> RefreshPolicy {
        self.refresh_policy
    }

    /// 邮箱 + 密码登录
    ///
    /// 邮箱不存在与密码错误返回同一个错误；未验证邮箱只在凭证正确后才会暴露。
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> AppResult<TokenPair> {
        let result = self.login_inner(email, password).await;
        metrics::record_login(&result);
        result
    }

    async fn login_inner(&self, email: &str, password: &str) -> AppResult<TokenPair> {
        let user = match Email::new(email) {
            Ok(email) => self.store.find_user_by_email(&email).await?,
            Err(_) => None,
        };

        let Some(user) = user else {
            self.passwords.verify_dummy(password).await;
            debug!("Login rejected: unknown email");
            return Err(AppError::InvalidCredentials);
        };

        match self
            .passwords
            .verify_password(password, &user.password_hash)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                debug!(user_id = %user.id, "Login rejected: wrong password");
                return Err(AppError::InvalidCredentials);
            }
            // 响应码不能暴露账号存在
            Err(e) => {
                error!(user_id = %user.id, error = %e, "Stored password hash unusable");
                return Err(AppError::InvalidCredentials);
            }
        }

        if !user.email_verified {
            info!(user_id = %user.id, "Login blocked: email not verified");
            return Err(AppError::EmailUnverified);
        }

        let pair = self.issue_pair(&user.id, Utc::now()).await?;
        info!(user_id = %user.id, "User logged in");
        Ok(pair)
    }

    /// 注册新用户，邮箱初始为未验证
    #[instrument(skip_all)]
    pub async fn register(&self, request: RegisterRequest) -> AppResult<UserProfile> {
        let name = DisplayName::new(&request.name)?;
        let email = Email::new(&request.email)?;
        self.passwords.policy().validate(&request.password)?;

        if let Some(checker) = &self.email_checker {
            match checker.is_deliverable(&email).await {
                Ok(true) => {}
                Ok(false) => return Err(AppError::validation("invalid email address")),
                Err(e) => {
                    warn!(error = %e, "Email checker failed");
                    return Err(AppError::validation("email validation service unavailable"));
                }
            }
        }

        let hash = self.passwords.hash_password(&request.password).await?;
        let user = User::new(email, hash, name);
        self.store.create_user(&user).await?;

        metrics::record_user_registered();
        info!(user_id = %user.id, "User registered");
        Ok(user.to_profile())
    }

    /// 用刷新令牌换取新的访问令牌
    #[instrument(skip_all)]
    pub async fn refresh_token(&self, refresh_token: &str) -> AppResult<TokenPair> {
        let rotate = self.refresh_policy == RefreshPolicy::Rotate;
        let result = if rotate {
            self.refresh_rotating(refresh_token).await
        } else {
            self.refresh_reusing(refresh_token).await
        };
        metrics::record_refresh(&result, rotate);
        result
    }

    async fn refresh_reusing(&self, refresh_token: &str) -> AppResult<TokenPair> {
        let now = Utc::now();
        let user_id = self
            .codec
            .validate_at(refresh_token, TokenKind::Refresh, now)?;

        let record = self
            .store
            .find_refresh_token(&hash_refresh_token(refresh_token))
            .await?;
        Self::check_record(record.as_ref(), &user_id, now)?;

        let access_token = self.codec.issue_at(&user_id, TokenKind::Access, now)?;
        debug!(user_id = %user_id, "Access token refreshed");
        Ok(TokenPair::new(
            access_token,
            refresh_token.to_string(),
            self.codec.access_ttl().num_seconds(),
        ))
    }

    async fn refresh_rotating(&self, refresh_token: &str) -> AppResult<TokenPair> {
        let now = Utc::now();
        let user_id = self
            .codec
            .validate_at(refresh_token, TokenKind::Refresh, now)?;

        // 原子取出，并发的同一令牌只有一个请求能成功
        let record = self
            .store
            .take_refresh_token(&hash_refresh_token(refresh_token))
            .await?;
        Self::check_record(record.as_ref(), &user_id, now)?;

        let pair = self.issue_pair(&user_id, now).await?;
        debug!(user_id = %user_id, "Refresh token rotated");
        Ok(pair)
    }

    fn check_record(
        record: Option<&RefreshTokenRecord>,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        match record {
            Some(record) if record.is_valid_for(user_id, now) => Ok(()),
            Some(_) => {
                warn!(user_id = %user_id, "Stored refresh token expired or owned by another user");
                Err(AppError::TokenInvalid)
            }
            None => {
                debug!(user_id = %user_id, "Refresh token not found in store");
                Err(AppError::TokenInvalid)
            }
        }
    }

    async fn issue_pair(&self, user_id: &UserId, now: DateTime<Utc>) -> AppResult<TokenPair> {
        let access_token = self.codec.issue_at(user_id, TokenKind::Access, now)?;
        let refresh_token = self.codec.issue_at(user_id, TokenKind::Refresh, now)?;

        let record = RefreshTokenRecord::new(
            *user_id,
            hash_refresh_token(&refresh_token),
            now + self.codec.refresh_ttl(),
        );
        self.store.save_refresh_token(&record).await?;

        Ok(TokenPair::new(
            access_token,
            refresh_token,
            self.codec.access_ttl().num_seconds(),
        ))
    }

    /// 读取用户资料
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn get_user_profile(&self, user_id: &UserId) -> AppResult<UserProfile> {
        Ok(self.load_user(user_id).await?.to_profile())
    }

    /// 吊销单个刷新令牌，重复调用无副作用
    #[instrument(skip_all)]
    pub async fn logout(&self, refresh_token: &str) -> AppResult<()> {
        let removed = self
            .store
            .delete_refresh_token(&hash_refresh_token(refresh_token))
            .await?;
        debug!(removed, "Logout");
        Ok(())
    }

    /// 吊销用户的全部刷新令牌
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn logout_all(&self, user_id: &UserId) -> AppResult<u64> {
        let revoked = self.store.delete_refresh_tokens_for_user(user_id).await?;
        info!(revoked, "All sessions revoked");
        Ok(revoked)
    }

    /// 标记邮箱已验证
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn verify_email(&self, user_id: &UserId) -> AppResult<UserProfile> {
        let mut user = self.load_user(user_id).await?;
        if user.verify_email() {
            self.store.update_user(&user).await?;
            info!("Email verified");
        }
        Ok(user.to_profile())
    }

    /// 修改密码，成功后吊销该用户所有刷新令牌
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn change_password(
        &self,
        user_id: &UserId,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        let mut user = self.load_user(user_id).await?;

        if !self
            .passwords
            .verify_password(current_password, &user.password_hash)
            .await?
        {
            return Err(AppError::InvalidCredentials);
        }

        let hash = self.passwords.hash_password(new_password).await?;
        user.update_password(hash);
        self.store.update_user(&user).await?;

        let revoked = self.store.delete_refresh_tokens_for_user(user_id).await?;
        info!(revoked, "Password changed");
        Ok(())
    }

    /// 切换当前租户
    #[instrument(skip_all, fields(user_id = %user_id, tenant_id = %tenant_id))]
    pub async fn switch_tenant(
        &self,
        user_id: &UserId,
        tenant_id: &TenantId,
    ) -> AppResult<TenantContext> {
        let mut user = self.load_user(user_id).await?;
        user.switch_tenant(*tenant_id)?;
        self.store.set_current_tenant(user_id, tenant_id).await?;

        let membership = user
            .active_membership(tenant_id)
            .ok_or(AppError::TenantAccessDenied)?;
        info!("Current tenant switched");
        Ok(TenantContext::from_membership(
            membership,
            TenantSource::UserDefault,
        ))
    }

    /// 清理过期刷新令牌
    #[instrument(skip_all)]
    pub async fn purge_expired_refresh_tokens(&self) -> AppResult<u64> {
        let purged = self
            .store
            .delete_expired_refresh_tokens(Utc::now())
            .await?;
        metrics::record_refresh_tokens_purged(purged);
        if purged > 0 {
            info!(purged, "Expired refresh tokens purged");
        }
        Ok(purged)
    }

    async fn load_user(&self, user_id: &UserId) -> AppResult<User> {
        self.store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AppError::UserNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::InMemoryCredentialStore;
    use chrono::Duration;

    fn service() -> (Arc<InMemoryCredentialStore>, AuthenticationService) {
        let store = Arc::new(InMemoryCredentialStore::new());
        let codec = TokenCodec::new(
            "access-secret-at-least-32-chars-long",
            "refresh-secret-at-least-32-chars-long",
            Duration::minutes(15),
            Duration::days(14),
        );
        (store.clone(), AuthenticationService::new(store, codec))
    }

    #[tokio::test]
    async fn test_register_validates_name_before_email() {
        let (_, auth) = service();
        let err = auth
            .register(RegisterRequest {
                email: "not-an-email".into(),
                password: "weak".into(),
                name: "A".into(),
            })
            .await
            .unwrap_err();

        assert_eq!(
            err,
            AppError::validation("name must be between 2 and 100 characters")
        );
    }

    #[tokio::test]
    async fn test_issued_pair_persists_hash_only() {
        let (store, auth) = service();
        let user_id = UserId::new();
        let pair = auth.issue_pair(&user_id, Utc::now()).await.unwrap();

        assert!(store.find_refresh_token(&pair.refresh_token).await.unwrap().is_none());
        let record = store
            .find_refresh_token(&hash_refresh_token(&pair.refresh_token))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.user_id, user_id);
        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.expires_in, 15 * 60);
    }
}
