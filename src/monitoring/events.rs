//! Progress event stream
//!
//! Every registry change and every stage of a wallet check is published on a
//! broadcast channel. Subscribers (the WebSocket handler, tests, a chat front
//! end) observe progress without the core holding any caller callback.

use serde::Serialize;
use tokio::sync::broadcast;

use super::detector::CheckOutcome;
use crate::models::AlertType;
use crate::provider::FeedCategory;

/// Events emitted by the monitoring core
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    WalletRegistered {
        address: String,
        subscriber_id: String,
        alerts: usize,
        /// True when an existing registration was replaced (re-baseline)
        reregistered: bool,
    },
    WalletDeregistered {
        address: String,
    },
    AlertAdded {
        address: String,
        rule_id: String,
        alert_type: AlertType,
    },
    AlertRemoved {
        address: String,
        rule_id: String,
    },
    CheckStarted {
        address: String,
        forced: bool,
    },
    /// Scheduled check skipped by the recheck spacing guard
    CheckSkipped {
        address: String,
    },
    /// One feed failed; the check continues with the other
    ProviderDegraded {
        address: String,
        category: FeedCategory,
        error: String,
    },
    TransactionsDetected {
        address: String,
        count: usize,
    },
    AlertFired {
        address: String,
        rule_id: String,
        hash: String,
    },
    CheckCompleted {
        address: String,
        outcome: CheckOutcome,
    },
    /// The wallet was deregistered or re-registered while the check ran
    CheckDiscarded {
        address: String,
    },
}

impl MonitorEvent {
    pub fn address(&self) -> &str {
        match self {
            MonitorEvent::WalletRegistered { address, .. }
            | MonitorEvent::WalletDeregistered { address }
            | MonitorEvent::AlertAdded { address, .. }
            | MonitorEvent::AlertRemoved { address, .. }
            | MonitorEvent::CheckStarted { address, .. }
            | MonitorEvent::CheckSkipped { address }
            | MonitorEvent::ProviderDegraded { address, .. }
            | MonitorEvent::TransactionsDetected { address, .. }
            | MonitorEvent::AlertFired { address, .. }
            | MonitorEvent::CheckCompleted { address, .. }
            | MonitorEvent::CheckDiscarded { address } => address,
        }
    }
}

/// Broadcast fan-out for [`MonitorEvent`]s
pub struct EventBus {
    tx: broadcast::Sender<MonitorEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event to all current subscribers
    pub fn publish(&self, event: MonitorEvent) {
        // No receivers is fine
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
