//! 请求认证管线
//!
//! Bearer 提取 → 访问令牌校验 → 单次加载用户 → 解析租户上下文。
//! 之后的授权检查都基于返回的 [`RequestContext`]，不再访问存储。

use std::sync::Arc;

use http::HeaderMap;
use tessera_auth_core::{TokenCodec, TokenKind};
use tessera_errors::{AppError, AppResult};
use tracing::{debug, instrument};

use crate::application::tenant_resolver::TenantContextResolver;
use crate::domain::repositories::CredentialStore;
use crate::domain::tenant_context::TenantContext;
use crate::domain::user::User;

/// 已认证的请求上下文
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user: User,
    pub tenant: TenantContext,
}

pub struct RequestAuthenticator {
    store: Arc<dyn CredentialStore>,
    codec: TokenCodec,
    resolver: TenantContextResolver,
}

impl RequestAuthenticator {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        codec: TokenCodec,
        resolver: TenantContextResolver,
    ) -> Self {
        Self {
            store,
            codec,
            resolver,
        }
    }

    /// 只认证用户，不解析租户（例如个人资料接口）
    #[instrument(skip_all)]
    pub async fn authenticate_user(&self, headers: &HeaderMap) -> AppResult<User> {
        let token = tessera_bootstrap::bearer_token(headers)?;
        let user_id = self.codec.validate(token, TokenKind::Access)?;

        // 令牌有效但用户已被删除
        let user = self
            .store
            .find_user_by_id(&user_id)
            .await?
            .ok_or(AppError::TokenInvalid)?;
        debug!(user_id = %user.id, "Request authenticated");
        Ok(user)
    }

    /// 认证用户并解析租户上下文
    #[instrument(skip_all)]
    pub async fn authenticate(
        &self,
        headers: &HeaderMap,
        path_tenant: Option<&str>,
    ) -> AppResult<RequestContext> {
        let user = self.authenticate_user(headers).await?;
        let hints = self.resolver.hints_from_headers(headers, path_tenant);
        let tenant = self.resolver.resolve(&user, &hints)?;
        Ok(RequestContext { user, tenant })
    }
}
