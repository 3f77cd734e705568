//! HTTP handlers for the wallet monitor

mod health;
mod monitoring;
mod ws;

pub use health::*;
pub use monitoring::*;
pub use ws::*;

use axum::{
    routing::{delete, get, post},
    Router,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::metrics::{metrics_router, MetricsState};
use crate::monitoring::MonitoringService;

/// Shared state for HTTP handlers
pub struct AppState {
    pub monitoring: Arc<MonitoringService>,
    /// Application start time
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(monitoring: Arc<MonitoringService>) -> Self {
        Self {
            monitoring,
            started_at: Utc::now(),
        }
    }
}

/// Routes under /api/v1/monitoring
pub fn monitoring_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/start/:address", post(start_monitoring))
        .route("/stop/:address", post(stop_monitoring))
        .route("/status/:address", get(wallet_status))
        .route("/alerts/:address", post(add_alert).get(list_alerts))
        .route("/alerts/:address/:alert_id", delete(remove_alert))
        .route("/all", get(list_wallets))
        .route("/service-status", get(service_status))
        .route("/trigger-check/:address", post(trigger_check))
        .route("/test-notification", post(test_notification))
        .route("/events", get(events_ws))
}

/// Build the full application router
pub fn app_router(state: Arc<AppState>, metrics: Arc<MetricsState>) -> Router {
    let api_routes = Router::new()
        .nest("/monitoring", monitoring_routes())
        .with_state(state.clone());

    let root_routes = Router::new()
        .route("/health", get(health_check))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .merge(root_routes)
        .merge(metrics_router().with_state(metrics))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
