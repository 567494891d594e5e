//! 租户成员关系

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tessera_common::TenantId;

use crate::domain::permission::PermissionSet;

/// 成员关系，每个 (user, tenant) 至多一条
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantMembership {
    pub tenant_id: TenantId,
    pub tenant_name: String,
    /// 租户内角色
    pub role: String,
    pub joined_at: DateTime<Utc>,
    pub is_active: bool,
}

impl TenantMembership {
    pub fn new(tenant_id: TenantId, tenant_name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            tenant_id,
            tenant_name: tenant_name.into(),
            role: role.into(),
            joined_at: Utc::now(),
            is_active: true,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn permissions(&self) -> PermissionSet {
        PermissionSet::for_tenant_role(&self.role)
    }

    /// admin 或 owner
    pub fn is_admin_role(&self) -> bool {
        let role = self.role.trim();
        role.eq_ignore_ascii_case("admin") || role.eq_ignore_ascii_case("owner")
    }
}
