//! 周期清理任务
//!
//! 定期删除已过期的刷新令牌记录。

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::application::AuthenticationService;

pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

pub struct RefreshTokenCleanupTask {
    auth: Arc<AuthenticationService>,
    interval: Duration,
}

impl RefreshTokenCleanupTask {
    pub fn new(auth: Arc<AuthenticationService>, interval: Duration) -> Self {
        Self { auth, interval }
    }

    pub fn start(self: Arc<Self>, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_secs = self.interval.as_secs(), "Cleanup task started");
            let mut ticker = interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.auth.purge_expired_refresh_tokens().await {
                            error!(error = %e, "Failed to purge expired refresh tokens");
                        }
                    }
                    _ = shutdown.cancelled() => {
                        info!("Cleanup task received shutdown signal");
                        break;
                    }
                }
            }
            info!("Cleanup task stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::refresh_token::RefreshTokenRecord;
    use crate::domain::repositories::CredentialStore;
    use crate::infrastructure::persistence::InMemoryCredentialStore;
    use chrono::Utc;
    use tessera_auth_core::TokenCodec;
    use tessera_common::UserId;

    #[tokio::test]
    async fn test_first_tick_purges_then_stops_on_cancel() {
        let store = Arc::new(InMemoryCredentialStore::new());
        store
            .save_refresh_token(&RefreshTokenRecord::new(
                UserId::new(),
                "stale".into(),
                Utc::now() - chrono::Duration::hours(1),
            ))
            .await
            .unwrap();

        let codec = TokenCodec::new(
            "access-secret-at-least-32-chars-long",
            "refresh-secret-at-least-32-chars-long",
            chrono::Duration::minutes(15),
            chrono::Duration::days(14),
        );
        let auth = Arc::new(AuthenticationService::new(store.clone(), codec));
        let task = Arc::new(RefreshTokenCleanupTask::new(auth, Duration::from_secs(3600)));

        let shutdown = CancellationToken::new();
        let handle = task.start(shutdown.clone());

        for _ in 0..50 {
            if store.refresh_token_count().await == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(store.refresh_token_count().await, 0);

        shutdown.cancel();
        handle.await.unwrap();
    }
}
