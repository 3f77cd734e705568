//! Per-wallet change detection
//!
//! A check fetches both transaction feeds, keeps the candidates that are
//! newer than the wallet's watermark, unseen and recent, runs the alert
//! matcher over them, commits the new watermark and seen set, and only then
//! hands messages to the notifier.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::clock::Clock;
use super::events::{EventBus, MonitorEvent};
use super::matcher::matching_rules;
use super::registry::WalletRegistry;
use super::MonitorSettings;
use crate::error::{AppError, AppResult};
use crate::metrics::MetricsState;
use crate::models::{AlertRule, SeenHashes, Transaction};
use crate::notifications::Notifier;
use crate::provider::{DataProvider, FeedCategory, ProviderError};

/// How a check was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckMode {
    /// Poll scheduler tick; subject to the recheck spacing guard
    Scheduled,
    /// Alert add or explicit trigger; bypasses spacing, looks back over the lookback window
    Forced,
}

/// Result of a single wallet check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckOutcome {
    /// Checked too recently
    Skipped,
    Completed {
        new_transactions: usize,
        alerts_fired: usize,
    },
    /// Both feeds failed; watermark left in place
    ProviderUnavailable,
    /// Wallet was deregistered or re-registered mid-check
    Discarded,
}

impl CheckOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckOutcome::Skipped => "skipped",
            CheckOutcome::Completed { .. } => "completed",
            CheckOutcome::ProviderUnavailable => "provider_unavailable",
            CheckOutcome::Discarded => "discarded",
        }
    }
}

/// Keep transactions strictly after `watermark`, not in `seen` and within
/// `recency` of `now`; newest first, at most `max` entries.
pub fn select_candidates(
    transactions: Vec<Transaction>,
    watermark: DateTime<Utc>,
    seen: &SeenHashes,
    now: DateTime<Utc>,
    recency: chrono::Duration,
    max: usize,
) -> Vec<Transaction> {
    let mut candidates: Vec<Transaction> = transactions
        .into_iter()
        .filter(|tx| tx.timestamp > watermark)
        .filter(|tx| !seen.contains(&tx.hash))
        .filter(|tx| (now - tx.timestamp).abs() <= recency)
        .collect();
    candidates.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    candidates.truncate(max);
    candidates
}

struct CommittedCheck {
    subscriber_id: String,
    candidates: Vec<Transaction>,
    fired: Vec<(AlertRule, Transaction)>,
}

pub struct ChangeDetector {
    registry: Arc<WalletRegistry>,
    provider: Arc<dyn DataProvider>,
    notifier: Arc<Notifier>,
    events: Arc<EventBus>,
    metrics: Arc<MetricsState>,
    clock: Arc<dyn Clock>,
    settings: MonitorSettings,
}

impl ChangeDetector {
    pub fn new(
        registry: Arc<WalletRegistry>,
        provider: Arc<dyn DataProvider>,
        notifier: Arc<Notifier>,
        events: Arc<EventBus>,
        metrics: Arc<MetricsState>,
        clock: Arc<dyn Clock>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            registry,
            provider,
            notifier,
            events,
            metrics,
            clock,
            settings,
        }
    }

    /// Check one wallet.
    ///
    /// Errors only with [`AppError::NotMonitored`]; provider and delivery
    /// failures are contained and reported through the outcome.
    pub async fn check(&self, address: &str, mode: CheckMode) -> AppResult<CheckOutcome> {
        let handle = self
            .registry
            .entry(address)
            .ok_or_else(|| AppError::NotMonitored(address.to_string()))?;

        let _check_guard = handle.check_lock.lock().await;
        let started = Instant::now();
        let now = self.clock.now();

        // Spacing guard on the live registration. A forced check reaches back
        // over the lookback window for this pass only; the stored watermark
        // never moves backward.
        let prepared = self.registry.commit_if_current(address, &handle, |wallet| match mode {
            CheckMode::Scheduled if now - wallet.watermark < self.settings.min_recheck => None,
            CheckMode::Scheduled => Some(wallet.watermark),
            CheckMode::Forced => Some(wallet.watermark.min(now - self.settings.lookback)),
        });

        let baseline = match prepared {
            None => return Ok(self.discard(address)),
            Some(None) => {
                tracing::trace!(wallet = %address, "Checked recently, skipping");
                self.metrics.record_check(CheckOutcome::Skipped.as_str());
                self.events.publish(MonitorEvent::CheckSkipped {
                    address: address.to_string(),
                });
                return Ok(CheckOutcome::Skipped);
            }
            Some(Some(baseline)) => baseline,
        };

        let forced = mode == CheckMode::Forced;
        if forced {
            self.provider.invalidate(address);
        }
        self.events.publish(MonitorEvent::CheckStarted {
            address: address.to_string(),
            forced,
        });

        let Some(transactions) = self.fetch_all(address).await else {
            tracing::error!(
                wallet = %address,
                "Both transaction feeds failed, keeping watermark for retry"
            );
            return Ok(self.finish(address, CheckOutcome::ProviderUnavailable, started));
        };

        let settings = &self.settings;
        let committed = self.registry.commit_if_current(address, &handle, |wallet| {
            wallet.initialized = true;

            let candidates = select_candidates(
                transactions,
                baseline,
                &wallet.seen,
                now,
                settings.recency_window,
                settings.max_candidates,
            );
            for tx in &candidates {
                wallet.seen.insert(tx.hash.clone());
            }

            let fired: Vec<(AlertRule, Transaction)> = candidates
                .iter()
                .flat_map(|tx| {
                    matching_rules(&wallet.alerts, tx).map(move |rule| (rule.clone(), tx.clone()))
                })
                .collect();

            if now > wallet.watermark {
                wallet.watermark = now;
            }

            CommittedCheck {
                subscriber_id: wallet.subscriber_id.clone(),
                candidates,
                fired,
            }
        });

        let Some(committed) = committed else {
            return Ok(self.discard(address));
        };

        let new_transactions = committed.candidates.len();
        let alerts_fired = committed.fired.len();

        if new_transactions > 0 {
            tracing::info!(
                wallet = %address,
                count = new_transactions,
                alerts = alerts_fired,
                "New transactions detected"
            );
            self.metrics
                .transactions_detected
                .inc_by(new_transactions as u64);
            self.metrics.alerts_fired.inc_by(alerts_fired as u64);
            self.events.publish(MonitorEvent::TransactionsDetected {
                address: address.to_string(),
                count: new_transactions,
            });
        } else {
            tracing::debug!(wallet = %address, "No new transactions");
        }

        for (rule, tx) in &committed.fired {
            self.events.publish(MonitorEvent::AlertFired {
                address: address.to_string(),
                rule_id: rule.id.clone(),
                hash: tx.hash.clone(),
            });
            self.notifier
                .send_alert(&committed.subscriber_id, rule, tx)
                .await;
        }

        if new_transactions > 0 {
            self.notifier
                .send_batch_summary(&committed.subscriber_id, address, &committed.candidates)
                .await;
        }

        Ok(self.finish(
            address,
            CheckOutcome::Completed {
                new_transactions,
                alerts_fired,
            },
            started,
        ))
    }

    /// Fetch both feeds concurrently; `None` only when both fail
    async fn fetch_all(&self, address: &str) -> Option<Vec<Transaction>> {
        let limit = self.settings.page_size;
        let call_timeout = self.settings.call_timeout;

        let (native, token) = tokio::join!(
            with_timeout(call_timeout, self.provider.list_native_transactions(address, limit)),
            with_timeout(call_timeout, self.provider.list_token_transfers(address, limit)),
        );

        let native = self.feed_or_degrade(address, FeedCategory::Native, native);
        let token = self.feed_or_degrade(address, FeedCategory::Token, token);

        match (native, token) {
            (None, None) => None,
            (native, token) => {
                let mut merged = native.unwrap_or_default();
                merged.extend(token.unwrap_or_default());
                Some(merged)
            }
        }
    }

    fn feed_or_degrade(
        &self,
        address: &str,
        category: FeedCategory,
        result: Result<Vec<Transaction>, ProviderError>,
    ) -> Option<Vec<Transaction>> {
        match result {
            Ok(transactions) => Some(transactions),
            Err(e) => {
                tracing::warn!(
                    wallet = %address,
                    category = %category,
                    error = %e,
                    "Transaction feed failed, continuing without it"
                );
                self.metrics.record_provider_failure(category.as_str());
                self.events.publish(MonitorEvent::ProviderDegraded {
                    address: address.to_string(),
                    category,
                    error: e.to_string(),
                });
                None
            }
        }
    }

    fn discard(&self, address: &str) -> CheckOutcome {
        tracing::debug!(wallet = %address, "Wallet changed during check, discarding result");
        self.metrics.record_check(CheckOutcome::Discarded.as_str());
        self.events.publish(MonitorEvent::CheckDiscarded {
            address: address.to_string(),
        });
        CheckOutcome::Discarded
    }

    fn finish(&self, address: &str, outcome: CheckOutcome, started: Instant) -> CheckOutcome {
        self.metrics.record_check(outcome.as_str());
        self.metrics
            .check_latency
            .observe(started.elapsed().as_secs_f64() * 1000.0);
        self.events.publish(MonitorEvent::CheckCompleted {
            address: address.to_string(),
            outcome: outcome.clone(),
        });
        outcome
    }
}

async fn with_timeout<F>(limit: Duration, call: F) -> Result<Vec<Transaction>, ProviderError>
where
    F: std::future::Future<Output = Result<Vec<Transaction>, ProviderError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout),
    }
}
