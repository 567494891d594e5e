//! 刷新令牌记录

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tessera_common::UserId;
use uuid::Uuid;

/// 刷新令牌记录，只保存令牌的 SHA-256 摘要
///
/// 生命周期：登录时创建，刷新时读取（轮换策略下被消费），登出时删除，或自然过期。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub user_id: UserId,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    pub fn new(user_id: UserId, token_hash: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            token_hash,
            expires_at,
            created_at: Utc::now(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// 记录未过期且属于该用户
    pub fn is_valid_for(&self, user_id: &UserId, now: DateTime<Utc>) -> bool {
        &self.user_id == user_id && !self.is_expired(now)
    }
}
