//! 密码服务
//!
//! Argon2 计算放到阻塞线程池执行，避免占用异步工作线程。

use std::sync::OnceLock;

use tessera_errors::{AppError, AppResult};

use crate::domain::value_objects::{HashedPassword, PasswordPolicy};

/// 邮箱不存在时用于等时校验的哈希
static DUMMY_HASH: OnceLock<Option<HashedPassword>> = OnceLock::new();

/// 密码服务
#[derive(Debug, Clone, Default)]
pub struct PasswordService {
    policy: PasswordPolicy,
}

impl PasswordService {
    pub fn new(policy: PasswordPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PasswordPolicy {
        &self.policy
    }

    /// 校验策略后哈希密码
    pub async fn hash_password(&self, password: &str) -> AppResult<HashedPassword> {
        self.policy.validate(password)?;

        let password = password.to_string();
        tokio::task::spawn_blocking(move || HashedPassword::hash_unchecked(&password))
            .await
            .map_err(|e| AppError::internal(format!("Password hashing task failed: {}", e)))?
            .map_err(Into::into)
    }

    /// 验证密码
    pub async fn verify_password(&self, password: &str, hash: &HashedPassword) -> AppResult<bool> {
        let password = password.to_string();
        let hash = hash.clone();
        tokio::task::spawn_blocking(move || hash.verify(&password))
            .await
            .map_err(|e| AppError::internal(format!("Password verification task failed: {}", e)))?
            .map_err(Into::into)
    }

    /// 对固定哈希做一次验证并丢弃结果，使未知邮箱与错误密码耗时一致
    pub async fn verify_dummy(&self, password: &str) {
        let password = password.to_string();
        let _ = tokio::task::spawn_blocking(move || {
            let dummy = DUMMY_HASH
                .get_or_init(|| HashedPassword::hash_unchecked("tessera-dummy-password").ok());
            if let Some(hash) = dummy {
                let _ = hash.verify(&password);
            }
        })
        .await;
    }
}
