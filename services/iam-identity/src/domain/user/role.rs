//! 平台级角色

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::permission::PermissionSet;

/// 平台级角色分配，与租户内角色无关
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub permissions: PermissionSet,
    pub assigned_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl Role {
    pub fn new(name: impl Into<String>, permissions: PermissionSet) -> Self {
        Self {
            name: name.into(),
            permissions,
            assigned_at: Utc::now(),
            expires_at: None,
            is_active: true,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    /// 仅在激活且未过期时生效
    pub fn is_effective(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.is_none_or(|expires_at| now < expires_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_role_effectiveness() {
        let now = Utc::now();
        let role = Role::new("platform_admin", PermissionSet::all());
        assert!(role.is_effective(now));

        let expired = role.clone().with_expiry(now - Duration::seconds(1));
        assert!(!expired.is_effective(now));

        let expiring = role.clone().with_expiry(now + Duration::hours(1));
        assert!(expiring.is_effective(now));

        let mut inactive = role;
        inactive.deactivate();
        assert!(!inactive.is_effective(now));
    }
}
