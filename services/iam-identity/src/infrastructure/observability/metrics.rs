//! IAM Identity Metrics
//!
//! 业务指标记录。标签只使用稳定错误码，不携带用户输入。

use metrics::counter;
use tessera_errors::AppResult;

use crate::domain::tenant_context::TenantSource;

fn outcome<T>(result: &AppResult<T>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(e) => e.code(),
    }
}

// ============================================================================
// 认证 Metrics
// ============================================================================

/// 记录登录结果
pub fn record_login<T>(result: &AppResult<T>) {
    counter!("auth_login_total", "outcome" => outcome(result)).increment(1);
}

/// 记录刷新结果
pub fn record_refresh<T>(result: &AppResult<T>, rotated: bool) {
    counter!(
        "auth_refresh_total",
        "outcome" => outcome(result),
        "rotated" => if rotated { "true" } else { "false" }
    )
    .increment(1);
}

/// 记录用户注册
pub fn record_user_registered() {
    counter!("auth_users_registered_total").increment(1);
}

/// 记录过期刷新令牌清理
pub fn record_refresh_tokens_purged(count: u64) {
    counter!("auth_refresh_tokens_purged_total").increment(count);
}

// ============================================================================
// 租户 Metrics
// ============================================================================

/// 记录租户解析结果；未选出候选时 source 为 "none"
pub fn record_tenant_resolution<T>(source: Option<TenantSource>, result: &AppResult<T>) {
    counter!(
        "tenant_resolution_total",
        "source" => source.map(|s| s.as_str()).unwrap_or("none"),
        "outcome" => outcome(result)
    )
    .increment(1);
}
