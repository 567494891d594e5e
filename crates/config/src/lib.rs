//! tessera-config - 配置加载库

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// 单次存储调用的超时（毫秒）
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
}

fn default_max_connections() -> u32 {
    // 开发环境: 10, 生产环境: 50
    match std::env::var("APP_ENV").as_deref() {
        Ok("production") => 50,
        _ => 10,
    }
}

fn default_store_timeout_ms() -> u64 {
    5000
}

/// 刷新令牌策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshPolicy {
    /// 刷新时原样返回同一个 refresh token
    #[default]
    Reuse,
    /// 刷新时作废旧 token 并签发新 token
    Rotate,
}

/// 访问令牌有效期上限（1 天）
pub const MAX_ACCESS_TTL_MINUTES: i64 = 24 * 60;
/// 刷新令牌有效期上限（1 年）
pub const MAX_REFRESH_TTL_DAYS: i64 = 365;

/// JWT 配置
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub access_secret: Secret<String>,
    pub refresh_secret: Secret<String>,
    #[serde(default = "default_access_ttl_minutes")]
    pub access_ttl_minutes: i64,
    #[serde(default = "default_refresh_ttl_days")]
    pub refresh_ttl_days: i64,
    #[serde(default)]
    pub refresh_policy: RefreshPolicy,
}

fn default_access_ttl_minutes() -> i64 {
    15
}

fn default_refresh_ttl_days() -> i64 {
    14
}

/// 多租户配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TenancyConfig {
    /// 显式指定租户的请求头
    pub tenant_header: String,
    /// 平台管理员角色名
    pub platform_admin_role: String,
    /// 平台管理员是否自动满足任意租户的管理员检查
    pub platform_admin_bypasses_tenant_admin_check: bool,
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            tenant_header: "X-Tenant-ID".to_string(),
            platform_admin_role: "platform_admin".to_string(),
            platform_admin_bypasses_tenant_admin_check: true,
        }
    }
}

/// 遥测配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}

/// 外部邮箱校验服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct EmailCheckerConfig {
    pub base_url: String,
    pub api_key: Secret<String>,
    #[serde(default = "default_checker_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_checker_retries")]
    pub retries: u32,
}

fn default_checker_timeout_ms() -> u64 {
    3000
}

fn default_checker_retries() -> u32 {
    2
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_name: String,
    #[serde(default = "default_app_env")]
    pub app_env: String,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub tenancy: TenancyConfig,
    /// 未配置时使用内存存储（仅限开发 / 测试）
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    pub email_checker: Option<EmailCheckerConfig>,
}

fn default_app_env() -> String {
    "development".to_string()
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 优先级：`TESSERA_*` 环境变量 > `{env}.toml` > `default.toml`
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let figment = Figment::new()
            .merge(Toml::file(format!("{}/default.toml", config_dir)))
            .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
            .merge(Env::prefixed("TESSERA_").split("__"));

        Self::from_figment(figment)
    }

    /// 从任意 Figment 提取并校验配置
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        let access = self.jwt.access_secret.expose_secret();
        let refresh = self.jwt.refresh_secret.expose_secret();

        if access.is_empty() || refresh.is_empty() {
            return Err(ConfigError::Invalid("jwt secrets must not be empty".into()));
        }
        if access == refresh {
            return Err(ConfigError::Invalid(
                "jwt access and refresh secrets must differ".into(),
            ));
        }
        if self.jwt.access_ttl_minutes <= 0 || self.jwt.refresh_ttl_days <= 0 {
            return Err(ConfigError::Invalid("jwt ttl must be positive".into()));
        }
        if self.jwt.access_ttl_minutes > MAX_ACCESS_TTL_MINUTES {
            return Err(ConfigError::Invalid(format!(
                "access token ttl must not exceed {} minutes",
                MAX_ACCESS_TTL_MINUTES
            )));
        }
        if self.jwt.refresh_ttl_days > MAX_REFRESH_TTL_DAYS {
            return Err(ConfigError::Invalid(format!(
                "refresh token ttl must not exceed {} days",
                MAX_REFRESH_TTL_DAYS
            )));
        }
        if self.jwt.access_ttl_minutes >= self.jwt.refresh_ttl_days * 24 * 60 {
            return Err(ConfigError::Invalid(
                "access token ttl must be shorter than refresh token ttl".into(),
            ));
        }
        if self.tenancy.tenant_header.trim().is_empty() {
            return Err(ConfigError::Invalid("tenant header must not be empty".into()));
        }

        Ok(())
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }

    /// 是否为开发环境
    pub fn is_development(&self) -> bool {
        self.app_env == "development"
    }
}
