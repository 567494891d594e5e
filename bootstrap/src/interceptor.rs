//! 请求头中的访问令牌提取

use http::HeaderMap;
use http::header::AUTHORIZATION;
use tessera_errors::{AppError, AppResult};

const BEARER_PREFIX: &str = "Bearer ";

/// 从 `Authorization: Bearer <token>` 中取出令牌
///
/// 缺失、非 ASCII、非 Bearer 方案或空令牌都视为无效令牌。
pub fn bearer_token(headers: &HeaderMap) -> AppResult<&str> {
    let auth_header = headers.get(AUTHORIZATION).ok_or(AppError::TokenInvalid)?;

    let auth_str = auth_header.to_str().map_err(|_| AppError::TokenInvalid)?;

    let token = auth_str
        .strip_prefix(BEARER_PREFIX)
        .ok_or(AppError::TokenInvalid)?
        .trim();

    if token.is_empty() {
        return Err(AppError::TokenInvalid);
    }

    Ok(token)
}

/// 读取单个头部的非空文本值
pub fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers_with_auth(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_extracts_bearer_token() {
        let headers = headers_with_auth("Bearer abc.def.ghi");
        assert_eq!(bearer_token(&headers), Ok("abc.def.ghi"));
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(bearer_token(&HeaderMap::new()), Err(AppError::TokenInvalid));
    }

    #[test]
    fn test_wrong_scheme() {
        let headers = headers_with_auth("Basic dXNlcjpwYXNz");
        assert_eq!(bearer_token(&headers), Err(AppError::TokenInvalid));
    }

    #[test]
    fn test_empty_token() {
        let headers = headers_with_auth("Bearer   ");
        assert_eq!(bearer_token(&headers), Err(AppError::TokenInvalid));
    }

    #[test]
    fn test_header_value_ignores_blank() {
        let mut headers = HeaderMap::new();
        headers.insert("x-tenant-id", HeaderValue::from_static("  "));
        assert_eq!(header_value(&headers, "X-Tenant-ID"), None);

        headers.insert("x-tenant-id", HeaderValue::from_static(" t-1 "));
        assert_eq!(header_value(&headers, "X-Tenant-ID"), Some("t-1"));
    }
}
