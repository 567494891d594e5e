//! tessera-errors - 统一错误处理
//!
//! 错误分类与对外稳定错误码，基于 RFC 7807 Problem Details 规范

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 应用错误类型
///
/// 对外只暴露 [`AppError::code`] 给出的稳定错误码，消息文本可以随时调整。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    /// 邮箱不存在与密码错误合并为同一个结果
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token")]
    TokenInvalid,

    #[error("Email not verified")]
    EmailUnverified,

    #[error("Email already exists")]
    EmailAlreadyExists,

    #[error("User not found")]
    UserNotFound,

    #[error("Access denied - user does not have access to this tenant")]
    TenantAccessDenied,

    #[error("No valid tenant context available")]
    NoTenantContext,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn access_denied(msg: impl Into<String>) -> Self {
        Self::AccessDenied(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// 对外稳定错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "AUTH_INVALID_CREDENTIALS",
            Self::TokenExpired => "AUTH_TOKEN_EXPIRED",
            Self::TokenInvalid => "AUTH_TOKEN_INVALID",
            Self::EmailUnverified => "AUTH_EMAIL_UNVERIFIED",
            Self::EmailAlreadyExists => "EMAIL_ALREADY_EXISTS",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::TenantAccessDenied => "TENANT_ACCESS_DENIED",
            Self::NoTenantContext => "NO_TENANT_CONTEXT",
            Self::AccessDenied(_) => "ACCESS_DENIED",
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::Storage(_) | Self::Internal(_) => "SERVER_ERROR",
        }
    }

    /// 错误所属分类
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidCredentials => ErrorKind::Credential,
            Self::TokenExpired | Self::TokenInvalid => ErrorKind::Token,
            Self::EmailUnverified
            | Self::TenantAccessDenied
            | Self::NoTenantContext
            | Self::AccessDenied(_) => ErrorKind::Authorization,
            Self::EmailAlreadyExists | Self::UserNotFound => ErrorKind::State,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Storage(_) | Self::Internal(_) => ErrorKind::Server,
        }
    }

    /// 转换为 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidCredentials | Self::TokenExpired | Self::TokenInvalid => 401,
            Self::EmailUnverified
            | Self::TenantAccessDenied
            | Self::NoTenantContext
            | Self::AccessDenied(_) => 403,
            Self::UserNotFound => 404,
            Self::EmailAlreadyExists => 409,
            Self::Validation(_) => 400,
            Self::Storage(_) | Self::Internal(_) => 500,
        }
    }

    /// 转换为 gRPC 状态码
    pub fn grpc_code(&self) -> tonic::Code {
        match self {
            Self::InvalidCredentials | Self::TokenExpired | Self::TokenInvalid => {
                tonic::Code::Unauthenticated
            }
            Self::EmailUnverified => tonic::Code::FailedPrecondition,
            Self::TenantAccessDenied | Self::NoTenantContext | Self::AccessDenied(_) => {
                tonic::Code::PermissionDenied
            }
            Self::UserNotFound => tonic::Code::NotFound,
            Self::EmailAlreadyExists => tonic::Code::AlreadyExists,
            Self::Validation(_) => tonic::Code::InvalidArgument,
            Self::Storage(_) | Self::Internal(_) => tonic::Code::Internal,
        }
    }

    /// 转换为 Problem Details
    ///
    /// 服务端错误不回显内部细节。
    pub fn to_problem_details(&self) -> ProblemDetails {
        let detail = match self.kind() {
            ErrorKind::Server => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        ProblemDetails {
            r#type: format!(
                "https://api.tessera.dev/problems/{}",
                self.code().to_lowercase().replace('_', "-")
            ),
            title: self.problem_title().to_string(),
            status: self.status_code(),
            code: self.code().to_string(),
            detail,
            instance: None,
        }
    }

    fn problem_title(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Credential => "Invalid Credentials",
            ErrorKind::Token => "Unauthorized",
            ErrorKind::Authorization => "Forbidden",
            ErrorKind::State => match self {
                Self::UserNotFound => "Resource Not Found",
                _ => "Conflict",
            },
            ErrorKind::Validation => "Validation Error",
            ErrorKind::Server => "Internal Server Error",
        }
    }
}

impl From<AppError> for tonic::Status {
    fn from(err: AppError) -> Self {
        let message = match err.kind() {
            ErrorKind::Server => "Internal server error".to_string(),
            _ => err.to_string(),
        };
        let mut status = tonic::Status::new(err.grpc_code(), message);
        status.metadata_mut().insert(
            "x-error-code",
            tonic::metadata::MetadataValue::from_static(err.code()),
        );
        status
    }
}

/// 错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 凭证错误
    Credential,
    /// 令牌错误（过期 / 无效）
    Token,
    /// 授权错误
    Authorization,
    /// 状态错误（重复邮箱、用户不存在）
    State,
    /// 输入校验错误（包括外部邮箱校验服务的失败）
    Validation,
    /// 存储层 / 内部错误
    Server,
}

/// RFC 7807 Problem Details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemDetails {
    pub r#type: String,
    pub title: String,
    pub status: u16,
    pub code: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

/// Result 类型别名
pub type AppResult<T> = Result<T, AppError>;
