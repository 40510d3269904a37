use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use tokio::signal;
use tracing::{error, info, warn};

use shulepay_backend::api::{self, AppState};
use shulepay_backend::config::AppConfig;
use shulepay_backend::ledger::LedgerStore;
use shulepay_backend::logging::init_tracing;
use shulepay_backend::provider::http::ProviderHttpClient;
use shulepay_backend::provider::{DarajaClient, DarajaConfig, TokenManager};
use shulepay_backend::services::{PaymentRecorder, PushPaymentService, PushRegistry};

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    config.validate()?;
    init_tracing(&config.logging);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting fee engine service"
    );

    let timeout = Duration::from_secs(config.provider.request_timeout_secs);
    let http = ProviderHttpClient::new(timeout)
        .map_err(|e| anyhow::anyhow!("failed to build provider HTTP client: {}", e))?;
    let tokens = Arc::new(TokenManager::new(
        http.clone(),
        &config.provider.base_url,
        config.provider.consumer_key.clone(),
        config.provider.consumer_secret.clone(),
        Duration::from_secs(config.provider.token_safety_margin_secs),
    ));
    let daraja = Arc::new(DarajaClient::new(
        http,
        tokens,
        DarajaConfig {
            base_url: config.provider.base_url.clone(),
            shortcode: config.provider.shortcode.clone(),
            passkey: config.provider.passkey.clone(),
            callback_url: config.provider.callback_url.clone(),
        },
    ));

    let ledger = Arc::new(LedgerStore::new());
    let pushes = Arc::new(PushRegistry::new());
    let recorder = Arc::new(PaymentRecorder::new(ledger.clone(), pushes.clone()));
    let push_service = Arc::new(PushPaymentService::new(daraja, pushes.clone()));

    // Sweep pending pushes whose callback never arrived, then evict
    // resolved entries once their late-callback window has passed.
    let push_expiry = ChronoDuration::seconds(config.provider.push_expiry_secs as i64);
    let push_retention = ChronoDuration::seconds(config.provider.push_retention_secs as i64);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            for push in pushes.expire_pending(push_expiry) {
                warn!(
                    checkout_id = %push.checkout_id,
                    student_ref = %push.student_ref,
                    "push payment timed out waiting for callback"
                );
            }
            let evicted = pushes.evict_resolved(push_retention);
            if evicted > 0 {
                info!(count = evicted, "evicted resolved push requests");
            }
        }
    });

    let app = api::router(AppState {
        ledger,
        recorder,
        push_service,
    });

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid server address: {}", e))?;
    info!(%addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!(%addr, error = %e, "failed to bind server address");
        anyhow::anyhow!(e)
    })?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
