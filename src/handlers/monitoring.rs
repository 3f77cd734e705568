//! Wallet monitoring handlers
//!
//! JSON endpoints for starting/stopping monitoring, managing alert rules,
//! status queries, manual checks and test notifications.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;

use super::AppState;
use crate::error::AppError;
use crate::models::{AlertRule, AlertRuleInput, WalletStatus};
use crate::monitoring::{CheckOutcome, ServiceStatus};

/// Telegram chat ids arrive as JSON numbers or strings
fn subscriber_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ChatId {
        Text(String),
        Number(i64),
    }

    Ok(match ChatId::deserialize(deserializer)? {
        ChatId::Text(id) => id,
        ChatId::Number(id) => id.to_string(),
    })
}

/// Request body for starting monitoring
#[derive(Debug, Deserialize)]
pub struct StartMonitoringRequest {
    /// Where notifications go (Telegram chat id)
    #[serde(alias = "chatId", deserialize_with = "subscriber_id")]
    pub subscriber_id: String,
    #[serde(default)]
    pub alerts: Vec<AlertRuleInput>,
}

#[derive(Debug, Serialize)]
pub struct StartMonitoringResponse {
    pub success: bool,
    pub message: String,
    pub status: WalletStatus,
}

#[derive(Debug, Serialize)]
pub struct StopMonitoringResponse {
    pub success: bool,
    pub address: String,
    pub was_monitored: bool,
}

#[derive(Debug, Serialize)]
pub struct AlertResponse {
    pub success: bool,
    pub address: String,
    pub alert: AlertRule,
}

#[derive(Debug, Serialize)]
pub struct AlertsResponse {
    pub address: String,
    pub alerts: Vec<AlertRule>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct WalletsResponse {
    pub wallets: Vec<WalletStatus>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct TriggerCheckResponse {
    pub success: bool,
    pub address: String,
    pub outcome: CheckOutcome,
}

/// Request body for a test notification
#[derive(Debug, Deserialize)]
pub struct TestNotificationRequest {
    #[serde(alias = "chatId", deserialize_with = "subscriber_id")]
    pub subscriber_id: String,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TestNotificationResponse {
    pub success: bool,
    pub message: String,
}

/// Start monitoring a wallet
///
/// POST /api/v1/monitoring/start/:address
pub async fn start_monitoring(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Json(request): Json<StartMonitoringRequest>,
) -> Result<(StatusCode, Json<StartMonitoringResponse>), AppError> {
    let status =
        state
            .monitoring
            .start_monitoring(&address, &request.subscriber_id, request.alerts)?;

    Ok((
        StatusCode::CREATED,
        Json(StartMonitoringResponse {
            success: true,
            message: format!("Started monitoring {}", status.address),
            status,
        }),
    ))
}

/// Stop monitoring a wallet
///
/// POST /api/v1/monitoring/stop/:address
pub async fn stop_monitoring(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Json<StopMonitoringResponse>, AppError> {
    let was_monitored = state.monitoring.stop_monitoring(&address)?;
    Ok(Json(StopMonitoringResponse {
        success: true,
        address: address.trim().to_ascii_lowercase(),
        was_monitored,
    }))
}

/// Monitoring status for one wallet
///
/// GET /api/v1/monitoring/status/:address
pub async fn wallet_status(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Json<WalletStatus>, AppError> {
    Ok(Json(state.monitoring.status(&address)?))
}

/// Add an alert rule
///
/// POST /api/v1/monitoring/alerts/:address
pub async fn add_alert(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Json(input): Json<AlertRuleInput>,
) -> Result<(StatusCode, Json<AlertResponse>), AppError> {
    let alert = state.monitoring.add_alert(&address, input)?;
    Ok((
        StatusCode::CREATED,
        Json(AlertResponse {
            success: true,
            address: address.trim().to_ascii_lowercase(),
            alert,
        }),
    ))
}

/// Remove an alert rule
///
/// DELETE /api/v1/monitoring/alerts/:address/:alert_id
pub async fn remove_alert(
    State(state): State<Arc<AppState>>,
    Path((address, alert_id)): Path<(String, String)>,
) -> Result<Json<AlertResponse>, AppError> {
    let alert = state.monitoring.remove_alert(&address, &alert_id)?;
    Ok(Json(AlertResponse {
        success: true,
        address: address.trim().to_ascii_lowercase(),
        alert,
    }))
}

/// List alert rules for a wallet
///
/// GET /api/v1/monitoring/alerts/:address
pub async fn list_alerts(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Json<AlertsResponse>, AppError> {
    let alerts = state.monitoring.alerts(&address)?;
    let total = alerts.len();
    Ok(Json(AlertsResponse {
        address: address.trim().to_ascii_lowercase(),
        alerts,
        total,
    }))
}

/// List every monitored wallet
///
/// GET /api/v1/monitoring/all
pub async fn list_wallets(State(state): State<Arc<AppState>>) -> Json<WalletsResponse> {
    let wallets = state.monitoring.list_all();
    let total = wallets.len();
    Json(WalletsResponse { wallets, total })
}

/// Service status
///
/// GET /api/v1/monitoring/service-status
pub async fn service_status(State(state): State<Arc<AppState>>) -> Json<ServiceStatus> {
    Json(state.monitoring.service_status())
}

/// Run a forced check for one wallet
///
/// POST /api/v1/monitoring/trigger-check/:address
pub async fn trigger_check(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Json<TriggerCheckResponse>, AppError> {
    let outcome = state.monitoring.trigger_check(&address).await?;
    Ok(Json(TriggerCheckResponse {
        success: true,
        address: address.trim().to_ascii_lowercase(),
        outcome,
    }))
}

/// Send a test notification
///
/// POST /api/v1/monitoring/test-notification
pub async fn test_notification(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TestNotificationRequest>,
) -> Result<Json<TestNotificationResponse>, AppError> {
    state
        .monitoring
        .send_test_notification(&request.subscriber_id, request.message.as_deref())
        .await?;
    Ok(Json(TestNotificationResponse {
        success: true,
        message: "Test notification sent".to_string(),
    }))
}
