//! 访问控制
//!
//! 只基于已加载的用户与租户上下文做判断，不访问存储。

use chrono::Utc;
use tessera_common::TenantId;
use tessera_config::TenancyConfig;
use tessera_errors::{AppError, AppResult};
use tracing::{debug, info};

use crate::domain::permission::Permission;
use crate::domain::tenant_context::TenantContext;
use crate::domain::user::User;

pub const DEFAULT_PLATFORM_ADMIN_ROLE: &str = "platform_admin";

/// 守卫策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardPolicy {
    /// 平台管理员是否视为任意租户的管理员
    pub platform_admin_bypasses_tenant_admin_check: bool,
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self {
            platform_admin_bypasses_tenant_admin_check: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AccessControlGuard {
    policy: GuardPolicy,
    platform_admin_role: String,
}

impl Default for AccessControlGuard {
    fn default() -> Self {
        Self::new(GuardPolicy::default(), DEFAULT_PLATFORM_ADMIN_ROLE)
    }
}

impl AccessControlGuard {
    pub fn new(policy: GuardPolicy, platform_admin_role: impl Into<String>) -> Self {
        Self {
            policy,
            platform_admin_role: platform_admin_role.into(),
        }
    }

    pub fn from_config(config: &TenancyConfig) -> Self {
        Self::new(
            GuardPolicy {
                platform_admin_bypasses_tenant_admin_check: config
                    .platform_admin_bypasses_tenant_admin_check,
            },
            config.platform_admin_role.clone(),
        )
    }

    pub fn policy(&self) -> GuardPolicy {
        self.policy
    }

    /// 是否为该租户的激活成员
    pub fn is_member(&self, user: &User, tenant_id: &TenantId) -> bool {
        user.active_membership(tenant_id).is_some()
    }

    /// 用户在该租户内的角色
    pub fn role_of<'a>(&self, user: &'a User, tenant_id: &TenantId) -> Option<&'a str> {
        user.active_membership(tenant_id).map(|m| m.role.as_str())
    }

    pub fn is_platform_admin(&self, user: &User) -> bool {
        user.has_role(&self.platform_admin_role, Utc::now())
    }

    /// 租户管理员：admin / owner，或策略允许时的平台管理员
    pub fn is_tenant_admin(&self, user: &User, ctx: &TenantContext) -> bool {
        let tenant_admin = user
            .active_membership(&ctx.tenant_id)
            .is_some_and(|m| m.is_admin_role());
        if tenant_admin {
            return true;
        }

        if self.policy.platform_admin_bypasses_tenant_admin_check && self.is_platform_admin(user) {
            info!(
                user_id = %user.id,
                tenant_id = %ctx.tenant_id,
                "Platform admin granted tenant admin access"
            );
            return true;
        }

        false
    }

    pub fn require_member(&self, user: &User, tenant_id: &TenantId) -> AppResult<()> {
        if self.is_member(user, tenant_id) {
            return Ok(());
        }
        debug!(user_id = %user.id, tenant_id = %tenant_id, "Membership required");
        Err(AppError::access_denied("not a member of this organization"))
    }

    pub fn require_tenant_admin(&self, user: &User, ctx: &TenantContext) -> AppResult<()> {
        if self.is_tenant_admin(user, ctx) {
            return Ok(());
        }
        debug!(user_id = %user.id, tenant_id = %ctx.tenant_id, "Tenant admin required");
        Err(AppError::access_denied("organization admin role required"))
    }

    pub fn require_permission(&self, ctx: &TenantContext, permission: Permission) -> AppResult<()> {
        if ctx.has_permission(permission) {
            return Ok(());
        }
        debug!(
            tenant_id = %ctx.tenant_id,
            permission = permission.as_str(),
            "Permission required"
        );
        Err(AppError::access_denied(format!(
            "missing permission {}",
            permission.as_str()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_allows_bypass() {
        let guard = AccessControlGuard::default();
        assert!(guard.policy().platform_admin_bypasses_tenant_admin_check);
    }

    #[test]
    fn test_from_config_reads_role_name() {
        let config = TenancyConfig {
            tenant_header: "X-Tenant-ID".into(),
            platform_admin_role: "root".into(),
            platform_admin_bypasses_tenant_admin_check: false,
        };
        let guard = AccessControlGuard::from_config(&config);

        assert_eq!(guard.platform_admin_role, "root");
        assert!(!guard.policy().platform_admin_bypasses_tenant_admin_check);
    }
}
