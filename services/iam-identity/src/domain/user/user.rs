//! 用户实体

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tessera_common::{AuditInfo, TenantId, UserId};
use tessera_errors::{AppError, AppResult};

use super::{Role, TenantMembership};
use crate::domain::value_objects::{DisplayName, Email, HashedPassword};

/// 用户实体
///
/// 不变式：`current_tenant_id` 若存在，必须指向一条激活的成员关系。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    #[serde(skip_serializing)]
    pub password_hash: HashedPassword,
    pub display_name: DisplayName,
    pub email_verified: bool,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub roles: Vec<Role>,
    pub memberships: Vec<TenantMembership>,
    pub current_tenant_id: Option<TenantId>,
    pub audit_info: AuditInfo,
}

impl User {
    pub fn new(email: Email, password_hash: HashedPassword, display_name: DisplayName) -> Self {
        Self {
            id: UserId::new(),
            email,
            password_hash,
            display_name,
            email_verified: false,
            email_verified_at: None,
            roles: Vec::new(),
            memberships: Vec::new(),
            current_tenant_id: None,
            audit_info: AuditInfo::default(),
        }
    }

    /// 标记邮箱已验证，返回是否发生了变化
    pub fn verify_email(&mut self) -> bool {
        if self.email_verified {
            return false;
        }
        self.email_verified = true;
        self.email_verified_at = Some(Utc::now());
        self.audit_info.touch();
        true
    }

    pub fn update_password(&mut self, password_hash: HashedPassword) {
        self.password_hash = password_hash;
        self.audit_info.touch();
    }

    /// 新增或替换同一租户的成员关系
    pub fn add_membership(&mut self, membership: TenantMembership) {
        self.memberships
            .retain(|m| m.tenant_id != membership.tenant_id);
        self.memberships.push(membership);
    }

    pub fn with_membership(mut self, membership: TenantMembership) -> Self {
        self.add_membership(membership);
        self
    }

    /// 停用成员关系；若它是当前租户则清空当前租户
    pub fn deactivate_membership(&mut self, tenant_id: &TenantId) {
        for membership in self
            .memberships
            .iter_mut()
            .filter(|m| &m.tenant_id == tenant_id)
        {
            membership.is_active = false;
        }
        if self.current_tenant_id.as_ref() == Some(tenant_id) {
            self.current_tenant_id = None;
        }
        self.audit_info.touch();
    }

    pub fn assign_role(&mut self, role: Role) {
        self.roles.retain(|r| r.name != role.name);
        self.roles.push(role);
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.assign_role(role);
        self
    }

    /// 激活状态的成员关系
    pub fn active_membership(&self, tenant_id: &TenantId) -> Option<&TenantMembership> {
        self.memberships
            .iter()
            .find(|m| &m.tenant_id == tenant_id && m.is_active)
    }

    /// 按枚举顺序的第一条激活成员关系
    pub fn first_active_membership(&self) -> Option<&TenantMembership> {
        self.memberships.iter().find(|m| m.is_active)
    }

    /// 是否持有生效中的平台角色
    pub fn has_role(&self, name: &str, now: DateTime<Utc>) -> bool {
        self.roles
            .iter()
            .any(|r| r.name == name && r.is_effective(now))
    }

    /// 切换当前租户，要求存在激活的成员关系
    pub fn switch_tenant(&mut self, tenant_id: TenantId) -> AppResult<()> {
        if self.active_membership(&tenant_id).is_none() {
            return Err(AppError::TenantAccessDenied);
        }
        self.current_tenant_id = Some(tenant_id);
        self.audit_info.touch();
        Ok(())
    }

    pub fn to_profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.as_str().to_string(),
            name: self.display_name.as_str().to_string(),
            email_verified: self.email_verified,
            created_at: self.audit_info.created_at,
            updated_at: self.audit_info.updated_at,
        }
    }
}

/// 对外的用户资料
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::permission::PermissionSet;
    use chrono::Duration;

    fn user() -> User {
        User::new(
            Email::new("ada@example.com").unwrap(),
            HashedPassword::from_hash("$argon2id$stub"),
            DisplayName::new("Ada").unwrap(),
        )
    }

    #[test]
    fn test_new_user_is_unverified() {
        let user = user();
        assert!(!user.email_verified);
        assert!(user.current_tenant_id.is_none());
    }

    #[test]
    fn test_verify_email_is_idempotent() {
        let mut user = user();
        assert!(user.verify_email());
        let verified_at = user.email_verified_at;
        assert!(!user.verify_email());
        assert_eq!(user.email_verified_at, verified_at);
    }

    #[test]
    fn test_switch_tenant_requires_active_membership() {
        let a = TenantId::new();
        let b = TenantId::new();
        let mut user = user()
            .with_membership(TenantMembership::new(a, "A", "user").inactive())
            .with_membership(TenantMembership::new(b, "B", "admin"));

        assert_eq!(user.switch_tenant(a), Err(AppError::TenantAccessDenied));
        assert_eq!(user.switch_tenant(TenantId::new()), Err(AppError::TenantAccessDenied));
        assert!(user.switch_tenant(b).is_ok());
        assert_eq!(user.current_tenant_id, Some(b));
    }

    #[test]
    fn test_deactivating_current_membership_clears_pointer() {
        let a = TenantId::new();
        let mut user = user().with_membership(TenantMembership::new(a, "A", "user"));
        user.switch_tenant(a).unwrap();

        user.deactivate_membership(&a);
        assert!(user.current_tenant_id.is_none());
        assert!(user.active_membership(&a).is_none());
    }

    #[test]
    fn test_membership_per_tenant_is_unique() {
        let a = TenantId::new();
        let user = user()
            .with_membership(TenantMembership::new(a, "A", "user"))
            .with_membership(TenantMembership::new(a, "A", "owner"));

        assert_eq!(user.memberships.len(), 1);
        assert_eq!(user.memberships[0].role, "owner");
    }

    #[test]
    fn test_first_active_membership_in_order() {
        let a = TenantId::new();
        let b = TenantId::new();
        let c = TenantId::new();
        let user = user()
            .with_membership(TenantMembership::new(a, "A", "user").inactive())
            .with_membership(TenantMembership::new(b, "B", "user"))
            .with_membership(TenantMembership::new(c, "C", "user"));

        assert_eq!(user.first_active_membership().map(|m| m.tenant_id), Some(b));
    }

    #[test]
    fn test_has_role_ignores_expired_roles() {
        let now = Utc::now();
        let user = user().with_role(
            Role::new("platform_admin", PermissionSet::all()).with_expiry(now - Duration::minutes(1)),
        );
        assert!(!user.has_role("platform_admin", now));
    }

    #[test]
    fn test_profile_does_not_expose_hash() {
        let json = serde_json::to_string(&user().to_profile()).unwrap();
        assert!(!json.contains("argon2"));

        let json = serde_json::to_string(&user()).unwrap();
        assert!(!json.contains("argon2"));
    }
}
