//! WebSocket stream of monitoring progress events
//!
//! Each connected client receives every [`MonitorEvent`] as a JSON text frame.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use super::AppState;
use crate::monitoring::MonitorEvent;

/// WebSocket upgrade handler
///
/// GET /api/v1/monitoring/events
pub async fn events_ws(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

fn encode_event(event: &MonitorEvent) -> Option<Message> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Message::Text(json)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize monitor event");
            None
        }
    }
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let mut rx = state.monitoring.subscribe();

    // Task to send events to client
    let send_task = tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "WebSocket client lagging, events dropped");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            let Some(msg) = encode_event(&event) else {
                continue;
            };

            if sender.send(msg).await.is_err() {
                // Client disconnected
                break;
            }
        }
    });

    // Task to receive messages from client (close frames)
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                tracing::debug!("Client requested close");
                break;
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = send_task => {
            tracing::debug!("Send task finished");
        }
        _ = recv_task => {
            tracing::debug!("Receive task finished");
        }
    }

    tracing::debug!("WebSocket connection closed");
}
