//! 租户上下文解析集成测试

mod common;

use common::plain_user;
use http::{HeaderMap, HeaderValue};
use iam_identity::application::{RequestHints, TenantContextResolver};
use iam_identity::domain::permission::Permission;
use iam_identity::domain::tenant_context::TenantSource;
use iam_identity::domain::user::{TenantMembership, User};
use tessera_common::TenantId;
use tessera_errors::AppError;

struct Tenants {
    a: TenantId,
    b: TenantId,
    c: TenantId,
}

/// A 已停用，B 为当前租户，C 为普通激活成员
fn member_of_three() -> (User, Tenants) {
    let tenants = Tenants {
        a: TenantId::new(),
        b: TenantId::new(),
        c: TenantId::new(),
    };
    let mut user = plain_user("multi@example.com")
        .with_membership(TenantMembership::new(tenants.a, "Alpha", "owner").inactive())
        .with_membership(TenantMembership::new(tenants.b, "Beta", "user"))
        .with_membership(TenantMembership::new(tenants.c, "Gamma", "admin"));
    user.switch_tenant(tenants.b).unwrap();
    (user, tenants)
}

#[test]
fn test_header_wins_over_path_and_current() {
    let (user, t) = member_of_three();
    let hints = RequestHints::new()
        .with_header(t.c.to_string())
        .with_path(t.b.to_string());

    let ctx = TenantContextResolver::default().resolve(&user, &hints).unwrap();
    assert_eq!(ctx.tenant_id, t.c);
    assert_eq!(ctx.tenant_name, "Gamma");
    assert_eq!(ctx.role, "admin");
    assert_eq!(ctx.source, TenantSource::Header);
    assert!(ctx.has_permission(Permission::ManageMembers));
}

#[test]
fn test_path_wins_over_current() {
    let (user, t) = member_of_three();
    let ctx = TenantContextResolver::default()
        .resolve(&user, &RequestHints::new().with_path(t.c.to_string()))
        .unwrap();

    assert_eq!(ctx.tenant_id, t.c);
    assert_eq!(ctx.source, TenantSource::Path);
}

#[test]
fn test_current_tenant_used_without_hints() {
    let (user, t) = member_of_three();
    let ctx = TenantContextResolver::default()
        .resolve(&user, &RequestHints::new())
        .unwrap();

    assert_eq!(ctx.tenant_id, t.b);
    assert_eq!(ctx.source, TenantSource::UserDefault);
    assert!(!ctx.has_permission(Permission::ManageMembers));
}

#[test]
fn test_first_active_membership_as_last_resort() {
    let a = TenantId::new();
    let b = TenantId::new();
    let user = plain_user("first@example.com")
        .with_membership(TenantMembership::new(a, "Alpha", "owner").inactive())
        .with_membership(TenantMembership::new(b, "Beta", "moderator"));

    let ctx = TenantContextResolver::default()
        .resolve(&user, &RequestHints::new())
        .unwrap();
    assert_eq!(ctx.tenant_id, b);
    assert_eq!(ctx.source, TenantSource::FirstActive);
}

#[test]
fn test_inactive_header_tenant_denied_without_fallback() {
    let (user, t) = member_of_three();
    let hints = RequestHints::new().with_header(t.a.to_string());

    let err = TenantContextResolver::default().resolve(&user, &hints).unwrap_err();
    assert_eq!(err, AppError::TenantAccessDenied);
    assert_eq!(err.code(), "TENANT_ACCESS_DENIED");
}

#[test]
fn test_unknown_path_tenant_denied_without_fallback() {
    let (user, _) = member_of_three();
    let hints = RequestHints::new().with_path(TenantId::new().to_string());

    assert_eq!(
        TenantContextResolver::default().resolve(&user, &hints).unwrap_err(),
        AppError::TenantAccessDenied
    );
}

#[test]
fn test_malformed_header_tenant_denied() {
    let (user, _) = member_of_three();
    let hints = RequestHints::new().with_header("not-a-uuid");

    assert_eq!(
        TenantContextResolver::default().resolve(&user, &hints).unwrap_err(),
        AppError::TenantAccessDenied
    );
}

#[test]
fn test_no_candidate_yields_no_tenant_context() {
    let user = plain_user("lonely@example.com")
        .with_membership(TenantMembership::new(TenantId::new(), "Gone", "user").inactive());

    let err = TenantContextResolver::default()
        .resolve(&user, &RequestHints::new())
        .unwrap_err();
    assert_eq!(err, AppError::NoTenantContext);
    assert_eq!(err.code(), "NO_TENANT_CONTEXT");
}

#[test]
fn test_blank_header_is_ignored() {
    let (user, t) = member_of_three();
    let mut headers = HeaderMap::new();
    headers.insert("x-tenant-id", HeaderValue::from_static("   "));

    let resolver = TenantContextResolver::default();
    let hints = resolver.hints_from_headers(&headers, None);
    assert_eq!(hints.header_tenant, None);

    let ctx = resolver.resolve(&user, &hints).unwrap();
    assert_eq!(ctx.tenant_id, t.b);
    assert_eq!(ctx.source, TenantSource::UserDefault);
}

#[test]
fn test_header_read_from_request_headers() {
    let (user, t) = member_of_three();
    let mut headers = HeaderMap::new();
    headers.insert(
        "x-tenant-id",
        HeaderValue::from_str(&t.c.to_string()).unwrap(),
    );

    let resolver = TenantContextResolver::default();
    let ctx = resolver
        .resolve(&user, &resolver.hints_from_headers(&headers, None))
        .unwrap();
    assert_eq!(ctx.tenant_id, t.c);
    assert_eq!(ctx.source, TenantSource::Header);
}
