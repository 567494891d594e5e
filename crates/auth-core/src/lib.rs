//! tessera-auth-core - 认证核心库
//!
//! 访问令牌 / 刷新令牌的签发与校验。纯计算，无 I/O，无共享可变状态。

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tessera_common::UserId;
use tessera_errors::{AppError, AppResult};
use thiserror::Error;
use uuid::Uuid;

/// 令牌类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

/// JWT Claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Issued at
    pub iat: i64,
    /// Not before
    pub nbf: i64,
    /// Expiration time
    pub exp: i64,
    /// JWT ID，保证同一秒内签发的令牌也互不相同
    pub jti: String,
    /// Token type (access or refresh)
    pub token_type: TokenKind,
}

impl Claims {
    pub fn new(user_id: &UserId, kind: TokenKind, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::now_v7().to_string(),
            token_type: kind,
        }
    }

    pub fn user_id(&self) -> Result<UserId, TokenError> {
        UserId::from_string(&self.sub).map_err(|_| TokenError::Malformed)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    pub fn not_before(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.nbf, 0)
    }
}

/// 令牌校验错误
///
/// 调用方按结构分支：`Expired` 意味着静默刷新，其余意味着重新登录。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    /// 签名错误、密钥不匹配、类型不匹配或尚未生效
    #[error("token is invalid")]
    Invalid,

    /// 结构损坏（分段、base64、JSON、subject 格式）
    #[error("token is malformed")]
    Malformed,
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AppError::TokenExpired,
            TokenError::Invalid | TokenError::Malformed => AppError::TokenInvalid,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            JwtErrorKind::ExpiredSignature => TokenError::Expired,
            JwtErrorKind::InvalidToken
            | JwtErrorKind::Base64(_)
            | JwtErrorKind::Json(_)
            | JwtErrorKind::Utf8(_)
            | JwtErrorKind::MissingRequiredClaim(_) => TokenError::Malformed,
            _ => TokenError::Invalid,
        }
    }
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SigningKeys {
    fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }
}

impl Clone for SigningKeys {
    fn clone(&self) -> Self {
        Self {
            encoding: self.encoding.clone(),
            decoding: self.decoding.clone(),
            ttl: self.ttl,
        }
    }
}

/// Token 编解码器
///
/// 访问令牌与刷新令牌使用不同的 HMAC 密钥，彼此无法通过对方的校验。
/// 时间校验不允许任何偏差：`now > exp` 即过期，`nbf == iat`。
#[derive(Clone)]
pub struct TokenCodec {
    access: SigningKeys,
    refresh: SigningKeys,
    validation: Validation,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("access_ttl", &self.access.ttl)
            .field("refresh_ttl", &self.refresh.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(
        access_secret: &str,
        refresh_secret: &str,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        // 时间窗口由 verify_at 按调用方时钟自行检查
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.required_spec_claims.clear();

        Self {
            access: SigningKeys::new(access_secret, access_ttl),
            refresh: SigningKeys::new(refresh_secret, refresh_ttl),
            validation,
        }
    }

    fn keys(&self, kind: TokenKind) -> &SigningKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// 生成访问令牌
    pub fn issue_access_token(&self, user_id: &UserId) -> AppResult<String> {
        self.issue_at(user_id, TokenKind::Access, Utc::now())
    }

    /// 生成刷新令牌
    pub fn issue_refresh_token(&self, user_id: &UserId) -> AppResult<String> {
        self.issue_at(user_id, TokenKind::Refresh, Utc::now())
    }

    /// 以指定时刻为 `iat` 签发令牌
    pub fn issue_at(
        &self,
        user_id: &UserId,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> AppResult<String> {
        let keys = self.keys(kind);
        let claims = Claims::new(user_id, kind, now, keys.ttl);

        encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(|e| AppError::internal(format!("Failed to generate {} token: {}", kind, e)))
    }

    /// 校验令牌并返回用户 ID
    pub fn validate(&self, token: &str, kind: TokenKind) -> Result<UserId, TokenError> {
        self.validate_at(token, kind, Utc::now())
    }

    /// 以指定时刻校验令牌并返回用户 ID
    pub fn validate_at(
        &self,
        token: &str,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<UserId, TokenError> {
        self.verify_at(token, kind, now)?.user_id()
    }

    /// 校验签名、类型与时间窗口，返回完整 claims
    pub fn verify_at(
        &self,
        token: &str,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.keys(kind).decoding, &self.validation)?.claims;

        if claims.token_type != kind {
            return Err(TokenError::Invalid);
        }

        // 按完整精度比较，过期时刻之后的任何时刻都视为过期
        let not_before = claims.not_before().ok_or(TokenError::Malformed)?;
        let expires_at = claims.expires_at().ok_or(TokenError::Malformed)?;
        if now < not_before {
            return Err(TokenError::Invalid);
        }
        if now > expires_at {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    pub fn access_ttl(&self) -> Duration {
        self.access.ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh.ttl
    }
}

/// 刷新令牌的存储形式：SHA-256 十六进制摘要，原始令牌从不落库
pub fn hash_refresh_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
