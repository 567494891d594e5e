//! 集成测试公共夹具

#![allow(dead_code)]

use std::sync::Arc;

use chrono::Duration;
use iam_identity::application::AuthenticationService;
use iam_identity::domain::services::PasswordService;
use iam_identity::domain::user::User;
use iam_identity::domain::value_objects::{DisplayName, Email};
use iam_identity::infrastructure::persistence::InMemoryCredentialStore;
use tessera_auth_core::TokenCodec;

pub const ACCESS_SECRET: &str = "access-secret-at-least-32-chars-long";
pub const REFRESH_SECRET: &str = "refresh-secret-at-least-32-chars-long";
pub const PASSWORD: &str = "Password123!";

pub fn codec() -> TokenCodec {
    TokenCodec::new(
        ACCESS_SECRET,
        REFRESH_SECRET,
        Duration::minutes(15),
        Duration::days(14),
    )
}

pub fn setup() -> (Arc<InMemoryCredentialStore>, AuthenticationService) {
    let store = Arc::new(InMemoryCredentialStore::new());
    let auth = AuthenticationService::new(store.clone(), codec());
    (store, auth)
}

/// 带真实 argon2 哈希的用户
pub async fn user_with_password(email: &str, password: &str, verified: bool) -> User {
    let hash = PasswordService::default()
        .hash_password(password)
        .await
        .unwrap();
    let mut user = User::new(
        Email::new(email).unwrap(),
        hash,
        DisplayName::new("Test User").unwrap(),
    );
    if verified {
        user.verify_email();
    }
    user
}

/// 哈希不可用的用户，只用于不涉及密码的场景
pub fn plain_user(email: &str) -> User {
    User::new(
        Email::new(email).unwrap(),
        iam_identity::domain::value_objects::HashedPassword::from_hash("$argon2id$unused"),
        DisplayName::new("Test User").unwrap(),
    )
}
