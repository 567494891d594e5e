//! 服务装配
//!
//! 存储句柄只在启动时创建一次，之后通过 `Arc` 共享给各组件。

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as TokenTtl;
use secrecy::ExposeSecret;
use tessera_adapter_postgres::{PostgresConfig, check_connection, create_pool};
use tessera_auth_core::TokenCodec;
use tessera_config::AppConfig;
use tessera_errors::{AppError, AppResult};
use tracing::{info, warn};

use crate::application::{
    AccessControlGuard, AuthenticationService, RequestAuthenticator, TenantContextResolver,
};
use crate::domain::repositories::CredentialStore;
use crate::infrastructure::external::HttpEmailChecker;
use crate::infrastructure::persistence::{
    InMemoryCredentialStore, PostgresCredentialStore, TimedCredentialStore, run_migrations,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn CredentialStore>,
    pub auth: Arc<AuthenticationService>,
    pub resolver: Arc<TenantContextResolver>,
    pub guard: Arc<AccessControlGuard>,
    pub authenticator: Arc<RequestAuthenticator>,
}

impl AppState {
    /// 根据配置创建存储并装配全部组件
    pub async fn build(config: &AppConfig) -> AppResult<Self> {
        let store: Arc<dyn CredentialStore> = match &config.database {
            Some(db) => {
                let pool = create_pool(
                    &PostgresConfig::new(db.url.expose_secret().as_str())
                        .with_max_connections(db.max_connections),
                )
                .await?;
                check_connection(&pool).await?;

                let applied = run_migrations(&pool).await?;
                if !applied.is_empty() {
                    info!(versions = ?applied, "Schema migrations applied");
                }

                Arc::new(TimedCredentialStore::new(
                    Arc::new(PostgresCredentialStore::new(pool)),
                    Duration::from_millis(db.store_timeout_ms),
                ))
            }
            None if config.is_production() => {
                return Err(AppError::internal(
                    "database configuration is required in production",
                ));
            }
            None => {
                warn!("No database configured, using in-memory credential store");
                Arc::new(InMemoryCredentialStore::new())
            }
        };

        let mut state = Self::build_with_store(config, store)?;

        if let Some(checker_config) = &config.email_checker {
            let checker = Arc::new(HttpEmailChecker::new(checker_config)?);
            let auth = Self::auth_service(config, state.store.clone())?.with_email_checker(checker);
            state.auth = Arc::new(auth);
            info!(base_url = %checker_config.base_url, "Email checker enabled");
        }

        Ok(state)
    }

    /// 使用给定存储装配组件（不启用邮箱检查）
    pub fn build_with_store(config: &AppConfig, store: Arc<dyn CredentialStore>) -> AppResult<Self> {
        let resolver = TenantContextResolver::from_config(&config.tenancy);
        let authenticator = RequestAuthenticator::new(
            store.clone(),
            Self::token_codec(config)?,
            resolver.clone(),
        );

        Ok(Self {
            config: Arc::new(config.clone()),
            auth: Arc::new(Self::auth_service(config, store.clone())?),
            resolver: Arc::new(resolver),
            guard: Arc::new(AccessControlGuard::from_config(&config.tenancy)),
            authenticator: Arc::new(authenticator),
            store,
        })
    }

    fn auth_service(
        config: &AppConfig,
        store: Arc<dyn CredentialStore>,
    ) -> AppResult<AuthenticationService> {
        Ok(AuthenticationService::new(store, Self::token_codec(config)?)
            .with_refresh_policy(config.jwt.refresh_policy))
    }

    /// 有效期超出时间类型范围时返回错误而不是 panic
    fn token_codec(config: &AppConfig) -> AppResult<TokenCodec> {
        let access_ttl = TokenTtl::try_minutes(config.jwt.access_ttl_minutes).ok_or_else(|| {
            AppError::internal(format!(
                "access token ttl out of range: {} minutes",
                config.jwt.access_ttl_minutes
            ))
        })?;
        let refresh_ttl = TokenTtl::try_days(config.jwt.refresh_ttl_days).ok_or_else(|| {
            AppError::internal(format!(
                "refresh token ttl out of range: {} days",
                config.jwt.refresh_ttl_days
            ))
        })?;

        Ok(TokenCodec::new(
            config.jwt.access_secret.expose_secret(),
            config.jwt.refresh_secret.expose_secret(),
            access_ttl,
            refresh_ttl,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Figment;
    use figment::providers::{Format, Toml};

    fn config() -> AppConfig {
        AppConfig::from_figment(Figment::from(Toml::string(
            r#"
            app_name = "iam-identity"

            [jwt]
            access_secret = "access-secret-at-least-32-chars-long"
            refresh_secret = "refresh-secret-at-least-32-chars-long"
            "#,
        )))
        .unwrap()
    }

    #[test]
    fn test_out_of_range_ttl_is_an_error() {
        let mut config = config();
        config.jwt.refresh_ttl_days = i64::MAX;

        let result = AppState::build_with_store(&config, Arc::new(InMemoryCredentialStore::new()));
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[test]
    fn test_valid_config_builds() {
        let state =
            AppState::build_with_store(&config(), Arc::new(InMemoryCredentialStore::new())).unwrap();
        assert_eq!(state.auth.codec().access_ttl(), TokenTtl::minutes(15));
        assert_eq!(state.resolver.tenant_header(), "X-Tenant-ID");
    }
}
