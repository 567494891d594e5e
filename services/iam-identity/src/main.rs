//! IAM Identity Service - 身份服务入口

use std::sync::Arc;

use iam_identity::AppState;
use iam_identity::infrastructure::cleanup::{DEFAULT_CLEANUP_INTERVAL, RefreshTokenCleanupTask};
use tessera_bootstrap::{RuntimeConfig, init_runtime, shutdown_signal};
use tessera_config::AppConfig;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let runtime = RuntimeConfig::default();
    let config = AppConfig::load(&runtime.config_dir)?;
    init_runtime(&config);

    if let Err(e) = tessera_telemetry::init_metrics() {
        warn!(error = %e, "Failed to install metrics recorder");
    }

    let state = AppState::build(&config).await?;
    info!(
        refresh_policy = ?state.auth.refresh_policy(),
        tenant_header = state.resolver.tenant_header(),
        "IAM identity core ready"
    );

    let shutdown = CancellationToken::new();
    let cleanup = Arc::new(RefreshTokenCleanupTask::new(
        state.auth.clone(),
        DEFAULT_CLEANUP_INTERVAL,
    ))
    .start(shutdown.clone());

    shutdown_signal().await;

    shutdown.cancel();
    if let Err(e) = cleanup.await {
        warn!(error = %e, "Cleanup task ended abnormally");
    }

    info!("IAM identity service stopped");
    Ok(())
}
