//! PostgreSQL 凭证存储实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tessera_common::{AuditInfo, TenantId, UserId};
use tessera_errors::{AppError, AppResult};
use tracing::debug;
use uuid::Uuid;

use crate::domain::permission::PermissionSet;
use crate::domain::refresh_token::RefreshTokenRecord;
use crate::domain::repositories::CredentialStore;
use crate::domain::user::{Role, TenantMembership, User};
use crate::domain::value_objects::{DisplayName, Email, HashedPassword};

const USER_COLUMNS: &str = "id, email, password_hash, display_name, email_verified, \
     email_verified_at, current_tenant_id, created_at, updated_at";

pub struct PostgresCredentialStore {
    pool: PgPool,
}

impl PostgresCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_user(&self, row: Option<UserRow>) -> AppResult<Option<User>> {
        let Some(row) = row else {
            return Ok(None);
        };

        let memberships = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT tenant_id, tenant_name, role, joined_at, is_active
            FROM tenant_memberships
            WHERE user_id = $1
            ORDER BY joined_at ASC, tenant_id ASC
            "#,
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::storage(format!("Failed to load memberships: {}", e)))?;

        let roles = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT name, permissions, assigned_at, expires_at, is_active
            FROM user_roles
            WHERE user_id = $1
            ORDER BY assigned_at ASC
            "#,
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::storage(format!("Failed to load roles: {}", e)))?;

        row.into_user(memberships, roles)
            .map(Some)
            .map_err(AppError::storage)
    }

    async fn insert_memberships(
        tx: &mut Transaction<'_, Postgres>,
        user: &User,
    ) -> AppResult<()> {
        for membership in &user.memberships {
            sqlx::query(
                r#"
                INSERT INTO tenant_memberships (user_id, tenant_id, tenant_name, role, joined_at, is_active)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(user.id.0)
            .bind(membership.tenant_id.0)
            .bind(&membership.tenant_name)
            .bind(&membership.role)
            .bind(membership.joined_at)
            .bind(membership.is_active)
            .execute(&mut **tx)
            .await
            .map_err(|e| AppError::storage(format!("Failed to save membership: {}", e)))?;
        }

        for role in &user.roles {
            sqlx::query(
                r#"
                INSERT INTO user_roles (user_id, name, permissions, assigned_at, expires_at, is_active)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(user.id.0)
            .bind(&role.name)
            .bind(role.permissions.bits() as i32)
            .bind(role.assigned_at)
            .bind(role.expires_at)
            .bind(role.is_active)
            .execute(&mut **tx)
            .await
            .map_err(|e| AppError::storage(format!("Failed to save role: {}", e)))?;
        }

        Ok(())
    }
}

#[async_trait]
impl CredentialStore for PostgresCredentialStore {
    async fn find_user_by_email(&self, email: &Email) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::storage(format!("Failed to find user: {}", e)))?;

        self.load_user(row).await
    }

    async fn find_user_by_id(&self, id: &UserId) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::storage(format!("Failed to find user: {}", e)))?;

        self.load_user(row).await
    }

    async fn create_user(&self, user: &User) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::storage(format!("Failed to begin transaction: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, display_name, email_verified,
                               email_verified_at, current_tenant_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.id.0)
        .bind(user.email.as_str())
        .bind(user.password_hash.as_str())
        .bind(user.display_name.as_str())
        .bind(user.email_verified)
        .bind(user.email_verified_at)
        .bind(user.current_tenant_id.map(|t| t.0))
        .bind(user.audit_info.created_at)
        .bind(user.audit_info.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_unique_violation() => AppError::EmailAlreadyExists,
            _ => AppError::storage(format!("Failed to save user: {}", e)),
        })?;

        Self::insert_memberships(&mut tx, user).await?;

        tx.commit()
            .await
            .map_err(|e| AppError::storage(format!("Failed to commit user: {}", e)))?;

        Ok(())
    }

    async fn update_user(&self, user: &User) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                password_hash = $2, display_name = $3, email_verified = $4,
                email_verified_at = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(user.id.0)
        .bind(user.password_hash.as_str())
        .bind(user.display_name.as_str())
        .bind(user.email_verified)
        .bind(user.email_verified_at)
        .bind(user.audit_info.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::storage(format!("Failed to update user: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::UserNotFound);
        }
        Ok(())
    }

    async fn set_current_tenant(&self, user_id: &UserId, tenant_id: &TenantId) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE users SET current_tenant_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(user_id.0)
        .bind(tenant_id.0)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::storage(format!("Failed to set current tenant: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::UserNotFound);
        }
        Ok(())
    }

    async fn save_refresh_token(&self, record: &RefreshTokenRecord) -> AppResult<()> {
        debug!(user_id = %record.user_id, "Saving refresh token");

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token_hash, id, user_id, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&record.token_hash)
        .bind(record.id)
        .bind(record.user_id.0)
        .bind(record.expires_at)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::storage(format!("Failed to save refresh token: {}", e)))?;

        Ok(())
    }

    async fn find_refresh_token(&self, token_hash: &str) -> AppResult<Option<RefreshTokenRecord>> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            r#"
            SELECT token_hash, id, user_id, expires_at, created_at
            FROM refresh_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::storage(format!("Failed to find refresh token: {}", e)))?;

        Ok(row.map(Into::into))
    }

    async fn take_refresh_token(&self, token_hash: &str) -> AppResult<Option<RefreshTokenRecord>> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            r#"
            DELETE FROM refresh_tokens
            WHERE token_hash = $1
            RETURNING token_hash, id, user_id, expires_at, created_at
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::storage(format!("Failed to consume refresh token: {}", e)))?;

        Ok(row.map(Into::into))
    }

    async fn delete_refresh_token(&self, token_hash: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::storage(format!("Failed to delete refresh token: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_refresh_tokens_for_user(&self, user_id: &UserId) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::storage(format!("Failed to delete refresh tokens for user: {}", e))
            })?;

        Ok(result.rows_affected())
    }

    async fn delete_expired_refresh_tokens(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::storage(format!("Failed to delete expired tokens: {}", e)))?;

        Ok(result.rows_affected())
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    display_name: String,
    email_verified: bool,
    email_verified_at: Option<DateTime<Utc>>,
    current_tenant_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(
        self,
        memberships: Vec<MembershipRow>,
        roles: Vec<RoleRow>,
    ) -> Result<User, String> {
        let email = Email::new(&self.email)
            .map_err(|e| format!("Invalid email in database for user {}: {}", self.id, e))?;

        let display_name = DisplayName::new(&self.display_name)
            .map_err(|e| format!("Invalid name in database for user {}: {}", self.id, e))?;

        Ok(User {
            id: UserId::from_uuid(self.id),
            email,
            password_hash: HashedPassword::from_hash(self.password_hash),
            display_name,
            email_verified: self.email_verified,
            email_verified_at: self.email_verified_at,
            roles: roles.into_iter().map(Into::into).collect(),
            memberships: memberships.into_iter().map(Into::into).collect(),
            current_tenant_id: self.current_tenant_id.map(TenantId::from_uuid),
            audit_info: AuditInfo {
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
        })
    }
}

#[derive(sqlx::FromRow)]
struct MembershipRow {
    tenant_id: Uuid,
    tenant_name: String,
    role: String,
    joined_at: DateTime<Utc>,
    is_active: bool,
}

impl From<MembershipRow> for TenantMembership {
    fn from(row: MembershipRow) -> Self {
        Self {
            tenant_id: TenantId::from_uuid(row.tenant_id),
            tenant_name: row.tenant_name,
            role: row.role,
            joined_at: row.joined_at,
            is_active: row.is_active,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RoleRow {
    name: String,
    permissions: i32,
    assigned_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    is_active: bool,
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Self {
            name: row.name,
            permissions: PermissionSet::from_bits(row.permissions as u32),
            assigned_at: row.assigned_at,
            expires_at: row.expires_at,
            is_active: row.is_active,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RefreshTokenRow {
    token_hash: String,
    id: Uuid,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<RefreshTokenRow> for RefreshTokenRecord {
    fn from(row: RefreshTokenRow) -> Self {
        Self {
            id: row.id,
            user_id: UserId::from_uuid(row.user_id),
            token_hash: row.token_hash.trim_end().to_string(),
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}
