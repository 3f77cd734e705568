//! Wallet Monitor - transaction alerts for watched addresses
//!
//! This is the main entry point for the monitoring service.
//! It wires the provider, notifier and monitoring core, starts the polling
//! task and serves the HTTP API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use wallet_monitor::{
    app_router, AppConfig, AppState, MetricsState, MonitorSettings, MonitoringService,
    NoditClient, NotificationSink, Notifier, SystemClock, TelegramSink,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    tracing::info!("Starting Wallet Monitor v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = load_config()?;
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        provider = %config.provider.base_url,
        poll_interval_secs = config.monitoring.poll_interval_secs,
        "Configuration loaded"
    );

    let metrics = Arc::new(MetricsState::new());

    let provider = NoditClient::new(&config.provider)?;
    if !provider.has_api_key() {
        tracing::warn!("No Nodit API key configured, provider calls will likely be rejected");
    }

    let sink: Option<Arc<dyn NotificationSink>> =
        match TelegramSink::from_config(&config.notifications.telegram)? {
            Some(sink) => {
                tracing::info!("Telegram notifications enabled");
                Some(Arc::new(sink))
            }
            None => {
                tracing::warn!("Telegram not configured, alerts will be logged only");
                None
            }
        };

    let notifier = Notifier::new(
        sink,
        config.notifications.explorer_base_url.clone(),
        Duration::from_secs(config.notifications.telegram.timeout_secs),
        metrics.clone(),
    );

    let monitoring = Arc::new(MonitoringService::new(
        MonitorSettings::from_config(&config),
        Arc::new(provider),
        notifier,
        Arc::new(SystemClock),
        metrics.clone(),
    ));

    // Start polling task
    let cancel_token = CancellationToken::new();
    let polling_handle = monitoring.spawn_scheduler(cancel_token.clone());

    let app = app_router(Arc::new(AppState::new(monitoring)), metrics);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid server address: {}", e))?;

    tracing::info!(%addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token.clone()))
        .await?;

    cancel_token.cancel();
    if let Err(e) = polling_handle.await {
        tracing::warn!(error = %e, "Polling task ended abnormally");
    }

    tracing::info!("Wallet Monitor stopped");
    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM and cancel background work
async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received");
    cancel_token.cancel();
}

/// Initialize tracing/logging
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wallet_monitor=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

/// Load and validate configuration
fn load_config() -> anyhow::Result<AppConfig> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Configuration validation failed: {}", e))?;

    Ok(config)
}
