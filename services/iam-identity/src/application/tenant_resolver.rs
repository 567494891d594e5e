//! 租户上下文解析
//!
//! 候选优先级：请求头 > 路径 > 用户当前租户 > 首个激活成员关系。
//! 选中的候选若没有激活的成员关系则直接拒绝，不会退回到低优先级候选。

use http::HeaderMap;
use tessera_common::TenantId;
use tessera_config::TenancyConfig;
use tessera_errors::{AppError, AppResult};
use tracing::{debug, warn};

use crate::domain::tenant_context::{TenantContext, TenantSource};
use crate::domain::user::User;
use crate::infrastructure::observability::metrics;

pub const DEFAULT_TENANT_HEADER: &str = "X-Tenant-ID";

/// 请求中携带的租户提示
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHints {
    pub header_tenant: Option<String>,
    pub path_tenant: Option<String>,
}

impl RequestHints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, tenant: impl Into<String>) -> Self {
        self.header_tenant = Some(tenant.into());
        self
    }

    pub fn with_path(mut self, tenant: impl Into<String>) -> Self {
        self.path_tenant = Some(tenant.into());
        self
    }

    pub fn from_headers(headers: &HeaderMap, header_name: &str, path_tenant: Option<&str>) -> Self {
        Self {
            header_tenant: tessera_bootstrap::header_value(headers, header_name).map(str::to_string),
            path_tenant: path_tenant.map(str::to_string),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

enum Candidate<'a> {
    Raw(&'a str, TenantSource),
    Id(TenantId, TenantSource),
}

#[derive(Debug, Clone)]
pub struct TenantContextResolver {
    tenant_header: String,
}

impl Default for TenantContextResolver {
    fn default() -> Self {
        Self::new(DEFAULT_TENANT_HEADER)
    }
}

impl TenantContextResolver {
    pub fn new(tenant_header: impl Into<String>) -> Self {
        Self {
            tenant_header: tenant_header.into(),
        }
    }

    pub fn from_config(config: &TenancyConfig) -> Self {
        Self::new(config.tenant_header.clone())
    }

    pub fn tenant_header(&self) -> &str {
        &self.tenant_header
    }

    pub fn hints_from_headers(&self, headers: &HeaderMap, path_tenant: Option<&str>) -> RequestHints {
        RequestHints::from_headers(headers, &self.tenant_header, path_tenant)
    }

    /// 解析本次请求的租户上下文
    pub fn resolve(&self, user: &User, hints: &RequestHints) -> AppResult<TenantContext> {
        let candidate = Self::select(user, hints);
        let source = candidate.as_ref().map(|c| match c {
            Candidate::Raw(_, source) | Candidate::Id(_, source) => *source,
        });

        let result = match candidate {
            None => {
                debug!(user_id = %user.id, "No tenant candidate available");
                Err(AppError::NoTenantContext)
            }
            Some(Candidate::Raw(raw, source)) => match TenantId::from_string(raw) {
                Ok(tenant_id) => Self::validate(user, tenant_id, source),
                Err(_) => {
                    warn!(user_id = %user.id, source = %source, "Malformed tenant id");
                    Err(AppError::TenantAccessDenied)
                }
            },
            Some(Candidate::Id(tenant_id, source)) => Self::validate(user, tenant_id, source),
        };

        metrics::record_tenant_resolution(source, &result);
        result
    }

    fn select<'a>(user: &User, hints: &'a RequestHints) -> Option<Candidate<'a>> {
        if let Some(raw) = non_blank(&hints.header_tenant) {
            return Some(Candidate::Raw(raw, TenantSource::Header));
        }
        if let Some(raw) = non_blank(&hints.path_tenant) {
            return Some(Candidate::Raw(raw, TenantSource::Path));
        }
        if let Some(current) = user.current_tenant_id {
            return Some(Candidate::Id(current, TenantSource::UserDefault));
        }
        user.first_active_membership()
            .map(|m| Candidate::Id(m.tenant_id, TenantSource::FirstActive))
    }

    fn validate(user: &User, tenant_id: TenantId, source: TenantSource) -> AppResult<TenantContext> {
        match user.active_membership(&tenant_id) {
            Some(membership) => {
                debug!(
                    user_id = %user.id,
                    tenant_id = %tenant_id,
                    source = %source,
                    "Tenant context resolved"
                );
                Ok(TenantContext::from_membership(membership, source))
            }
            None => {
                warn!(
                    user_id = %user.id,
                    tenant_id = %tenant_id,
                    source = %source,
                    "Tenant access denied"
                );
                Err(AppError::TenantAccessDenied)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::TenantMembership;
    use crate::domain::value_objects::{DisplayName, Email, HashedPassword};
    use http::HeaderValue;

    fn user() -> User {
        User::new(
            Email::new("member@example.com").unwrap(),
            HashedPassword::from_hash("$argon2id$stub"),
            DisplayName::new("Member").unwrap(),
        )
    }

    #[test]
    fn test_hints_use_configured_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-org", HeaderValue::from_static("  abc  "));

        let hints = TenantContextResolver::new("X-Org").hints_from_headers(&headers, Some("p"));
        assert_eq!(hints, RequestHints::new().with_header("abc").with_path("p"));
    }

    #[test]
    fn test_blank_path_falls_through_to_first_active() {
        let tenant = TenantId::new();
        let user = user().with_membership(TenantMembership::new(tenant, "Acme", "user"));

        let ctx = TenantContextResolver::default()
            .resolve(&user, &RequestHints::new().with_path("   "))
            .unwrap();
        assert_eq!(ctx.tenant_id, tenant);
        assert_eq!(ctx.source, TenantSource::FirstActive);
    }
}
