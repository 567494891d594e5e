//! 访问控制集成测试

mod common;

use common::plain_user;
use iam_identity::application::{AccessControlGuard, GuardPolicy};
use iam_identity::domain::permission::{Permission, PermissionSet};
use iam_identity::domain::tenant_context::{TenantContext, TenantSource};
use iam_identity::domain::user::{Role, TenantMembership, User};
use tessera_common::TenantId;

fn member(role: &str) -> (User, TenantContext) {
    let tenant = TenantId::new();
    let membership = TenantMembership::new(tenant, "Acme", role);
    let ctx = TenantContext::from_membership(&membership, TenantSource::Header);
    (plain_user("member@example.com").with_membership(membership), ctx)
}

fn platform_admin() -> User {
    plain_user("root@example.com").with_role(Role::new("platform_admin", PermissionSet::all()))
}

fn foreign_context() -> TenantContext {
    TenantContext::from_membership(
        &TenantMembership::new(TenantId::new(), "Other", "user"),
        TenantSource::Path,
    )
}

#[test]
fn test_admin_and_owner_are_tenant_admins() {
    let guard = AccessControlGuard::default();
    for role in ["admin", "owner", "Admin"] {
        let (user, ctx) = member(role);
        assert!(guard.is_tenant_admin(&user, &ctx), "role {role}");
        assert!(guard.require_tenant_admin(&user, &ctx).is_ok());
    }
}

#[test]
fn test_plain_member_is_not_admin() {
    let guard = AccessControlGuard::default();
    let (user, ctx) = member("user");

    assert!(guard.is_member(&user, &ctx.tenant_id));
    assert_eq!(guard.role_of(&user, &ctx.tenant_id), Some("user"));
    assert!(!guard.is_tenant_admin(&user, &ctx));

    let err = guard.require_tenant_admin(&user, &ctx).unwrap_err();
    assert_eq!(err.code(), "ACCESS_DENIED");
}

#[test]
fn test_inactive_membership_is_not_membership() {
    let guard = AccessControlGuard::default();
    let tenant = TenantId::new();
    let user = plain_user("former@example.com")
        .with_membership(TenantMembership::new(tenant, "Acme", "owner").inactive());

    assert!(!guard.is_member(&user, &tenant));
    assert_eq!(guard.role_of(&user, &tenant), None);
    assert!(guard.require_member(&user, &tenant).is_err());
}

#[test]
fn test_platform_admin_bypass_enabled() {
    let guard = AccessControlGuard::default();
    let user = platform_admin();
    let ctx = foreign_context();

    assert!(guard.is_platform_admin(&user));
    assert!(!guard.is_member(&user, &ctx.tenant_id));
    assert!(guard.is_tenant_admin(&user, &ctx));
}

#[test]
fn test_platform_admin_bypass_disabled() {
    let guard = AccessControlGuard::new(
        GuardPolicy {
            platform_admin_bypasses_tenant_admin_check: false,
        },
        "platform_admin",
    );
    let user = platform_admin();
    let ctx = foreign_context();

    assert!(guard.is_platform_admin(&user));
    assert!(!guard.is_tenant_admin(&user, &ctx));
    assert!(guard.require_tenant_admin(&user, &ctx).is_err());
}

#[test]
fn test_expired_platform_role_grants_nothing() {
    let guard = AccessControlGuard::default();
    let user = plain_user("ex-root@example.com").with_role(
        Role::new("platform_admin", PermissionSet::all())
            .with_expiry(chrono::Utc::now() - chrono::Duration::days(1)),
    );

    assert!(!guard.is_platform_admin(&user));
    assert!(!guard.is_tenant_admin(&user, &foreign_context()));
}

#[test]
fn test_require_permission_follows_tenant_role() {
    let guard = AccessControlGuard::default();
    let (_, user_ctx) = member("user");
    let (_, moderator_ctx) = member("moderator");

    assert!(guard.require_permission(&user_ctx, Permission::SubmitFeedback).is_ok());
    assert!(guard.require_permission(&user_ctx, Permission::ModerateFeedback).is_err());
    assert!(
        guard
            .require_permission(&moderator_ctx, Permission::ModerateFeedback)
            .is_ok()
    );
    assert!(
        guard
            .require_permission(&moderator_ctx, Permission::ManageSettings)
            .is_err()
    );
}
