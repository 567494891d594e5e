//! 租户上下文值对象

use serde::{Deserialize, Serialize};
use std::fmt;
use tessera_common::TenantId;

use crate::domain::permission::{Permission, PermissionSet};
use crate::domain::user::TenantMembership;

/// 租户来源，仅用于审计与日志，不参与授权判断
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TenantSource {
    Header,
    Path,
    UserDefault,
    FirstActive,
}

impl TenantSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantSource::Header => "header",
            TenantSource::Path => "path",
            TenantSource::UserDefault => "user-default",
            TenantSource::FirstActive => "first-active",
        }
    }
}

impl fmt::Display for TenantSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 租户上下文，按请求计算，从不持久化
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    /// 租户 ID
    pub tenant_id: TenantId,
    /// 租户名称
    pub tenant_name: String,
    /// 调用者在该租户内的角色
    pub role: String,
    pub permissions: PermissionSet,
    pub source: TenantSource,
}

impl TenantContext {
    pub fn from_membership(membership: &TenantMembership, source: TenantSource) -> Self {
        Self {
            tenant_id: membership.tenant_id,
            tenant_name: membership.tenant_name.clone(),
            role: membership.role.clone(),
            permissions: membership.permissions(),
            source,
        }
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(permission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_wire_names() {
        assert_eq!(serde_json::to_value(TenantSource::Header).unwrap(), "header");
        assert_eq!(serde_json::to_value(TenantSource::Path).unwrap(), "path");
        assert_eq!(
            serde_json::to_value(TenantSource::UserDefault).unwrap(),
            "user-default"
        );
        assert_eq!(
            serde_json::to_value(TenantSource::FirstActive).unwrap(),
            "first-active"
        );
        assert_eq!(TenantSource::UserDefault.to_string(), "user-default");
    }

    #[test]
    fn test_context_carries_role_permissions() {
        let membership = TenantMembership::new(TenantId::new(), "Acme", "moderator");
        let context = TenantContext::from_membership(&membership, TenantSource::Path);

        assert_eq!(context.tenant_name, "Acme");
        assert!(context.has_permission(Permission::ModerateFeedback));
        assert!(!context.has_permission(Permission::ManageMembers));
    }
}
