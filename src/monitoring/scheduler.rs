//! Background polling task
//!
//! One repeating timer drives a pass over every registered wallet. Checks for
//! different wallets run concurrently up to a bound; the detector's per-wallet
//! lock keeps checks for the same wallet from overlapping, and its spacing
//! guard decides whether a wallet is actually re-fetched on a given tick.

use futures_util::stream::{self, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::detector::{ChangeDetector, CheckMode, CheckOutcome};
use super::registry::WalletRegistry;
use crate::error::AppResult;

/// Configuration for the polling task
#[derive(Debug, Clone)]
pub struct PollingConfig {
    /// Interval between polling passes
    pub interval: Duration,
    /// Maximum wallets checked at once
    pub max_concurrent_checks: usize,
}

/// Run one scheduled check for every registered wallet.
///
/// A failing wallet never stops the pass; results come back per address.
pub async fn run_pass(
    registry: &WalletRegistry,
    detector: &ChangeDetector,
    max_concurrent_checks: usize,
) -> Vec<(String, AppResult<CheckOutcome>)> {
    let addresses = registry.addresses();
    stream::iter(addresses)
        .map(|address| async move {
            let result = detector.check(&address, CheckMode::Scheduled).await;
            (address, result)
        })
        .buffer_unordered(max_concurrent_checks.max(1))
        .collect()
        .await
}

/// Start the wallet polling background task
///
/// Runs until `cancel_token` is cancelled. `running` is set while the loop is
/// alive so the service can report its state.
pub async fn start_polling_task(
    registry: Arc<WalletRegistry>,
    detector: Arc<ChangeDetector>,
    config: PollingConfig,
    running: Arc<AtomicBool>,
    cancel_token: CancellationToken,
) {
    tracing::info!(
        interval_ms = config.interval.as_millis() as u64,
        max_concurrent_checks = config.max_concurrent_checks,
        "Starting wallet polling task"
    );
    running.store(true, Ordering::SeqCst);

    let mut interval = tokio::time::interval(config.interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut poll_count = 0u64;

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                tracing::info!("Wallet polling task shutting down");
                break;
            }
            _ = interval.tick() => {
                poll_count += 1;

                if registry.is_empty() {
                    if poll_count % 60 == 0 {
                        tracing::debug!("No wallets to monitor");
                    }
                    continue;
                }

                let results = run_pass(&registry, &detector, config.max_concurrent_checks).await;

                let checked = results
                    .iter()
                    .filter(|(_, r)| matches!(r, Ok(CheckOutcome::Completed { .. })))
                    .count();
                for (address, result) in &results {
                    // Deregistered between listing and checking
                    if let Err(e) = result {
                        tracing::debug!(wallet = %address, error = %e, "Wallet check not run");
                    }
                }

                tracing::trace!(
                    poll_cycle = poll_count,
                    wallets = results.len(),
                    checked,
                    "Polling pass finished"
                );
            }
        }
    }

    running.store(false, Ordering::SeqCst);
}
