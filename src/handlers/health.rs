//! Health check endpoint

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use super::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall system status
    pub status: HealthStatus,
    /// Uptime in seconds
    pub uptime_seconds: i64,
    /// Wallets currently monitored
    pub monitored_wallets: usize,
    /// Whether the polling task is alive
    pub polling: bool,
    /// Whether a notification sink is configured
    pub notifications: bool,
}

/// Health status enum
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// All systems operational
    Healthy,
    /// Polling stopped or notifications unavailable
    Degraded,
}

/// Health check handler
///
/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let uptime = (Utc::now() - state.started_at).num_seconds();
    let service = state.monitoring.service_status();

    let status = if service.is_running && service.notifications_available {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded
    };

    // Degraded still answers 200 so load balancers keep routing
    (
        StatusCode::OK,
        Json(HealthResponse {
            status,
            uptime_seconds: uptime,
            monitored_wallets: service.total_monitored_wallets,
            polling: service.is_running,
            notifications: service.notifications_available,
        }),
    )
}
