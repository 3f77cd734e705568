//! Wallet monitoring core
//!
//! Registry, change detector, alert matcher, poll scheduler and progress
//! events, wired together behind [`MonitoringService`].

pub mod clock;
pub mod detector;
pub mod events;
pub mod matcher;
pub mod registry;
pub mod scheduler;

pub use clock::{Clock, SystemClock};
pub use detector::{select_candidates, ChangeDetector, CheckMode, CheckOutcome};
pub use events::{EventBus, MonitorEvent};
pub use matcher::{matching_rules, rule_fires};
pub use registry::{WalletEntry, WalletHandle, WalletRegistry};
pub use scheduler::{run_pass, start_polling_task, PollingConfig};

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::metrics::MetricsState;
use crate::models::{AlertRule, AlertRuleInput, WalletStatus};
use crate::notifications::Notifier;
use crate::provider::DataProvider;
use crate::utils::normalize_address;

/// Tunables for registry, detector and scheduler
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    pub min_recheck: chrono::Duration,
    pub lookback: chrono::Duration,
    pub recency_window: chrono::Duration,
    pub max_candidates: usize,
    pub seen_capacity: usize,
    pub page_size: usize,
    pub call_timeout: Duration,
    pub max_concurrent_checks: usize,
    pub alert_check_delay: Duration,
}

impl MonitorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let m = &config.monitoring;
        Self {
            poll_interval: m.poll_interval(),
            min_recheck: m.min_recheck(),
            lookback: m.lookback(),
            recency_window: m.recency_window(),
            max_candidates: m.max_candidates_per_check,
            seen_capacity: m.seen_capacity,
            page_size: config.provider.page_size,
            call_timeout: m.call_timeout(),
            max_concurrent_checks: m.max_concurrent_checks,
            alert_check_delay: m.alert_check_delay(),
        }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Service-level summary
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub is_running: bool,
    pub total_monitored_wallets: usize,
    pub notifications_available: bool,
}

/// Operational surface of the wallet monitor
pub struct MonitoringService {
    registry: Arc<WalletRegistry>,
    detector: Arc<ChangeDetector>,
    notifier: Arc<Notifier>,
    events: Arc<EventBus>,
    metrics: Arc<MetricsState>,
    clock: Arc<dyn Clock>,
    settings: MonitorSettings,
    running: Arc<AtomicBool>,
}

fn require_address(address: &str) -> AppResult<String> {
    normalize_address(address)
        .ok_or_else(|| AppError::Validation(format!("Invalid wallet address: {}", address)))
}

impl MonitoringService {
    pub fn new(
        settings: MonitorSettings,
        provider: Arc<dyn DataProvider>,
        notifier: Notifier,
        clock: Arc<dyn Clock>,
        metrics: Arc<MetricsState>,
    ) -> Self {
        let registry = Arc::new(WalletRegistry::new(
            clock.clone(),
            settings.lookback,
            settings.seen_capacity,
        ));
        let notifier = Arc::new(notifier);
        let events = Arc::new(EventBus::default());
        let detector = Arc::new(ChangeDetector::new(
            registry.clone(),
            provider,
            notifier.clone(),
            events.clone(),
            metrics.clone(),
            clock.clone(),
            settings.clone(),
        ));

        Self {
            registry,
            detector,
            notifier,
            events,
            metrics,
            clock,
            settings,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start (or re-baseline) monitoring for `address`
    pub fn start_monitoring(
        &self,
        address: &str,
        subscriber_id: &str,
        alerts: Vec<AlertRuleInput>,
    ) -> AppResult<WalletStatus> {
        let address = require_address(address)?;
        let subscriber_id = subscriber_id.trim();
        if subscriber_id.is_empty() {
            return Err(AppError::Validation("subscriber_id is required".to_string()));
        }
        for input in &alerts {
            AlertRule::validate_input(input).map_err(AppError::Validation)?;
        }

        let now = self.clock.now();
        let rules: Vec<AlertRule> = alerts
            .into_iter()
            .map(|input| AlertRule::new(input, now))
            .collect();
        let alert_count = rules.len();

        let (status, reregistered) = self.registry.register(&address, subscriber_id, rules);
        self.metrics.monitored_wallets.set(self.registry.len() as i64);

        tracing::info!(
            wallet = %address,
            subscriber = %subscriber_id,
            alerts = alert_count,
            reregistered,
            "Started monitoring wallet"
        );
        self.events.publish(MonitorEvent::WalletRegistered {
            address,
            subscriber_id: subscriber_id.to_string(),
            alerts: alert_count,
            reregistered,
        });

        Ok(status)
    }

    /// Stop monitoring; returns whether the wallet was monitored
    pub fn stop_monitoring(&self, address: &str) -> AppResult<bool> {
        let address = require_address(address)?;
        let removed = self.registry.deregister(&address);
        self.metrics.monitored_wallets.set(self.registry.len() as i64);

        if removed {
            tracing::info!(wallet = %address, "Stopped monitoring wallet");
            self.events
                .publish(MonitorEvent::WalletDeregistered { address });
        }
        Ok(removed)
    }

    /// Add a rule and schedule a forced check so the rule can catch a
    /// matching transfer already inside the lookback window
    pub fn add_alert(&self, address: &str, input: AlertRuleInput) -> AppResult<AlertRule> {
        let address = require_address(address)?;
        AlertRule::validate_input(&input).map_err(AppError::Validation)?;

        let rule = AlertRule::new(input, self.clock.now());
        self.registry.add_alert(&address, rule.clone())?;

        tracing::info!(
            wallet = %address,
            rule_id = %rule.id,
            alert_type = %rule.alert_type,
            "Alert added"
        );
        self.events.publish(MonitorEvent::AlertAdded {
            address: address.clone(),
            rule_id: rule.id.clone(),
            alert_type: rule.alert_type,
        });

        let detector = self.detector.clone();
        let delay = self.settings.alert_check_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match detector.check(&address, CheckMode::Forced).await {
                Ok(outcome) => {
                    tracing::debug!(wallet = %address, outcome = outcome.as_str(), "Post-alert check finished")
                }
                Err(e) => tracing::debug!(wallet = %address, error = %e, "Post-alert check not run"),
            }
        });

        Ok(rule)
    }

    pub fn remove_alert(&self, address: &str, alert_id: &str) -> AppResult<AlertRule> {
        let address = require_address(address)?;
        let rule = self.registry.remove_alert(&address, alert_id)?;

        tracing::info!(wallet = %address, rule_id = %alert_id, "Alert removed");
        self.events.publish(MonitorEvent::AlertRemoved {
            address,
            rule_id: rule.id.clone(),
        });
        Ok(rule)
    }

    /// Status for one address; unmonitored addresses get an empty status
    pub fn status(&self, address: &str) -> AppResult<WalletStatus> {
        let address = require_address(address)?;
        Ok(self
            .registry
            .get(&address)
            .unwrap_or_else(|| WalletStatus::unmonitored(&address)))
    }

    pub fn alerts(&self, address: &str) -> AppResult<Vec<AlertRule>> {
        let address = require_address(address)?;
        self.registry
            .get(&address)
            .map(|status| status.alerts)
            .ok_or(AppError::NotMonitored(address))
    }

    pub fn list_all(&self) -> Vec<WalletStatus> {
        self.registry.list_all()
    }

    /// Run a forced check now
    pub async fn trigger_check(&self, address: &str) -> AppResult<CheckOutcome> {
        let address = require_address(address)?;
        tracing::info!(wallet = %address, "Manual check triggered");
        self.detector.check(&address, CheckMode::Forced).await
    }

    /// One scheduled pass over every wallet, outside the timer
    pub async fn poll_once(&self) -> Vec<(String, AppResult<CheckOutcome>)> {
        run_pass(
            &self.registry,
            &self.detector,
            self.settings.max_concurrent_checks,
        )
        .await
    }

    pub async fn send_test_notification(
        &self,
        subscriber_id: &str,
        message: Option<&str>,
    ) -> AppResult<()> {
        let subscriber_id = subscriber_id.trim();
        if subscriber_id.is_empty() {
            return Err(AppError::Validation("subscriber_id is required".to_string()));
        }
        self.notifier.send_test(subscriber_id, message).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn service_status(&self) -> ServiceStatus {
        ServiceStatus {
            is_running: self.is_running(),
            total_monitored_wallets: self.registry.len(),
            notifications_available: self.notifier.is_available(),
        }
    }

    /// Spawn the polling task; it stops when `cancel_token` is cancelled
    pub fn spawn_scheduler(&self, cancel_token: CancellationToken) -> JoinHandle<()> {
        let config = PollingConfig {
            interval: self.settings.poll_interval,
            max_concurrent_checks: self.settings.max_concurrent_checks,
        };
        tokio::spawn(start_polling_task(
            self.registry.clone(),
            self.detector.clone(),
            config,
            self.running.clone(),
            cancel_token,
        ))
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }
}
