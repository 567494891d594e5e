//! 权限模型
//!
//! 权限是封闭集合，`PermissionSet` 以位图保存，可静态检查。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 能力
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ViewDashboard,
    SubmitFeedback,
    ModerateFeedback,
    ViewPeople,
    ManageMembers,
    ManageSettings,
}

impl Permission {
    pub const ALL: [Permission; 6] = [
        Permission::ViewDashboard,
        Permission::SubmitFeedback,
        Permission::ModerateFeedback,
        Permission::ViewPeople,
        Permission::ManageMembers,
        Permission::ManageSettings,
    ];

    fn bit(self) -> u32 {
        1 << (self as u32)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ViewDashboard => "view_dashboard",
            Permission::SubmitFeedback => "submit_feedback",
            Permission::ModerateFeedback => "moderate_feedback",
            Permission::ViewPeople => "view_people",
            Permission::ManageMembers => "manage_members",
            Permission::ManageSettings => "manage_settings",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == name)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 权限集合
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Permission>", into = "Vec<Permission>")]
pub struct PermissionSet(u32);

impl PermissionSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        Permission::ALL.into_iter().collect()
    }

    pub fn with(mut self, permission: Permission) -> Self {
        self.insert(permission);
        self
    }

    pub fn insert(&mut self, permission: Permission) {
        self.0 |= permission.bit();
    }

    pub fn contains(&self, permission: Permission) -> bool {
        self.0 & permission.bit() != 0
    }

    pub fn union(self, other: PermissionSet) -> Self {
        Self(self.0 | other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    /// 未知位被丢弃
    pub fn from_bits(bits: u32) -> Self {
        Self(bits & Self::all().0)
    }

    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        Permission::ALL.into_iter().filter(|p| self.contains(*p))
    }

    /// 租户内角色对应的权限集合，未知角色为空集
    pub fn for_tenant_role(role: &str) -> Self {
        let member = Self::empty()
            .with(Permission::ViewDashboard)
            .with(Permission::SubmitFeedback);
        let moderator = member
            .with(Permission::ModerateFeedback)
            .with(Permission::ViewPeople);
        let admin = moderator.with(Permission::ManageMembers);

        match role.trim().to_ascii_lowercase().as_str() {
            "user" | "member" => member,
            "moderator" => moderator,
            "admin" => admin,
            "owner" => Self::all(),
            _ => Self::empty(),
        }
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), PermissionSet::with)
    }
}

impl From<Vec<Permission>> for PermissionSet {
    fn from(permissions: Vec<Permission>) -> Self {
        permissions.into_iter().collect()
    }
}

impl From<PermissionSet> for Vec<Permission> {
    fn from(set: PermissionSet) -> Self {
        set.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_permission_hierarchy() {
        let user = PermissionSet::for_tenant_role("user");
        let moderator = PermissionSet::for_tenant_role("moderator");
        let admin = PermissionSet::for_tenant_role("admin");
        let owner = PermissionSet::for_tenant_role("owner");

        assert!(user.contains(Permission::SubmitFeedback));
        assert!(!user.contains(Permission::ModerateFeedback));
        assert!(moderator.contains(Permission::ModerateFeedback));
        assert!(!moderator.contains(Permission::ManageMembers));
        assert!(admin.contains(Permission::ManageMembers));
        assert!(!admin.contains(Permission::ManageSettings));
        assert_eq!(owner, PermissionSet::all());
    }

    #[test]
    fn test_unknown_role_has_no_permissions() {
        assert!(PermissionSet::for_tenant_role("superuser").is_empty());
        assert!(PermissionSet::for_tenant_role("").is_empty());
    }

    #[test]
    fn test_role_names_are_case_insensitive() {
        assert_eq!(
            PermissionSet::for_tenant_role(" Admin "),
            PermissionSet::for_tenant_role("admin")
        );
    }

    #[test]
    fn test_serializes_as_names() {
        let set = PermissionSet::empty()
            .with(Permission::ViewPeople)
            .with(Permission::ViewDashboard);

        let json = serde_json::to_value(set).unwrap();
        assert_eq!(json, serde_json::json!(["view_dashboard", "view_people"]));

        let back: PermissionSet = serde_json::from_value(json).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn test_from_bits_drops_unknown_bits() {
        let set = PermissionSet::from_bits(u32::MAX);
        assert_eq!(set, PermissionSet::all());
    }

    #[test]
    fn test_from_name() {
        assert_eq!(
            Permission::from_name("manage_settings"),
            Some(Permission::ManageSettings)
        );
        assert_eq!(Permission::from_name("delete_everything"), None);
    }
}
