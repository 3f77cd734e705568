//! Error types for the wallet monitor

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation on an address that is not being monitored
    #[error("Wallet is not being monitored: {0}")]
    NotMonitored(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// No notification sink configured
    #[error("Notifications are not configured")]
    NotificationsDisabled,

    /// Notification delivery error
    #[error("Notification error: {0}")]
    Notification(String),
}

/// Error response structure for API
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    fn status_and_reason(&self) -> (StatusCode, &'static str, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "rejected", "validation_failed"),
            AppError::NotMonitored(_) => (StatusCode::CONFLICT, "rejected", "not_monitored"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "rejected", "not_found"),
            AppError::NotificationsDisabled => {
                (StatusCode::SERVICE_UNAVAILABLE, "error", "notifications_disabled")
            }
            AppError::Notification(_) => (StatusCode::BAD_GATEWAY, "error", "notification_failed"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status_code, status, reason) = self.status_and_reason();
        let error_response = ErrorResponse {
            status,
            reason: reason.to_string(),
            details: Some(self.to_string()),
        };

        if status_code.is_server_error() {
            tracing::error!(error_type = %self, status_code = %status_code, "Request error");
        } else {
            tracing::debug!(error_type = %self, status_code = %status_code, "Request rejected");
        }

        (status_code, Json(json!(error_response))).into_response()
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
