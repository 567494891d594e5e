//! HTTP 邮箱检查客户端

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use tessera_config::EmailCheckerConfig;
use tessera_errors::{AppError, AppResult};
use tracing::{debug, warn};

use crate::domain::repositories::EmailChecker;
use crate::domain::value_objects::Email;

/// 检查服务响应
#[derive(Debug, Deserialize)]
struct CheckResponse {
    valid: bool,
    #[serde(default)]
    disposable: bool,
    #[serde(default)]
    error: Option<String>,
}

/// 调用 `GET {base_url}/validate?email=...` 的邮箱检查客户端
///
/// 网络错误、非 2xx 与响应解析失败会按退避重试；地址被判无效或为一次性邮箱时直接返回 `false`。
pub struct HttpEmailChecker {
    client: reqwest::Client,
    base_url: String,
    api_key: Secret<String>,
    retries: u32,
}

impl HttpEmailChecker {
    pub fn new(config: &EmailCheckerConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            retries: config.retries,
        })
    }

    async fn check_once(&self, email: &Email) -> Result<bool, String> {
        let response = self
            .client
            .get(format!("{}/validate", self.base_url))
            .query(&[("email", email.as_str())])
            .header("X-API-Key", self.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("checker returned status {}", status.as_u16()));
        }

        let body: CheckResponse = response
            .json()
            .await
            .map_err(|e| format!("failed to parse response: {}", e))?;

        if let Some(error) = body.error.filter(|e| !e.is_empty()) {
            return Err(format!("checker error: {}", error));
        }

        Ok(body.valid && !body.disposable)
    }
}

#[async_trait]
impl EmailChecker for HttpEmailChecker {
    async fn is_deliverable(&self, email: &Email) -> AppResult<bool> {
        let mut last_error = String::new();

        for attempt in 0..=self.retries {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(100 * u64::from(attempt))).await;
            }

            match self.check_once(email).await {
                Ok(deliverable) => {
                    debug!(attempt = attempt + 1, deliverable, "Email check completed");
                    return Ok(deliverable);
                }
                Err(e) => {
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = self.retries + 1,
                        error = %e,
                        "Email check failed"
                    );
                    last_error = e;
                }
            }
        }

        Err(AppError::internal(format!(
            "email check failed after {} attempts: {}",
            self.retries + 1,
            last_error
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_defaults() {
        let body: CheckResponse = serde_json::from_str(r#"{"valid": true}"#).unwrap();
        assert!(body.valid);
        assert!(!body.disposable);
        assert!(body.error.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_service_is_an_error() {
        let checker = HttpEmailChecker::new(&EmailCheckerConfig {
            base_url: "http://127.0.0.1:9/".to_string(),
            api_key: Secret::new("key".to_string()),
            timeout_ms: 200,
            retries: 0,
        })
        .unwrap();

        let email = Email::new("user@example.com").unwrap();
        assert!(checker.is_deliverable(&email).await.is_err());
    }
}
