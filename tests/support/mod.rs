//! Shared test doubles
//!
//! - `ScriptedProvider`: per-address canned feeds, injectable failures, call counters
//! - `RecordingSink`: captures every delivered message, can be told to fail
//! - `ManualClock`: time only moves when a test says so

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use wallet_monitor::{
    Clock, DataProvider, Direction, MetricsState, MonitorEvent, MonitorSettings,
    MonitoringService, NotificationSink, Notifier, ProviderError, Transaction, TxKind,
};

pub const WALLET: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
pub const WALLET_B: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
pub const COUNTERPARTY: &str = "0xcccccccccccccccccccccccccccccccccccccccc";
pub const CHAT_ID: &str = "424242";

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn minutes(m: i64) -> chrono::Duration {
    chrono::Duration::minutes(m)
}

pub fn seconds(s: i64) -> chrono::Duration {
    chrono::Duration::seconds(s)
}

// =============================================================================
// CLOCK
// =============================================================================

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

// =============================================================================
// PROVIDER
// =============================================================================

type Feed = Result<Vec<Transaction>, String>;

#[derive(Default)]
pub struct ScriptedProvider {
    native: Mutex<HashMap<String, Feed>>,
    token: Mutex<HashMap<String, Feed>>,
    pub native_calls: AtomicUsize,
    pub token_calls: AtomicUsize,
    pub invalidations: Mutex<Vec<String>>,
    block_native: AtomicBool,
    pub native_entered: Notify,
    pub native_release: Notify,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_native(&self, address: &str, txs: Vec<Transaction>) {
        self.native.lock().insert(address.to_string(), Ok(txs));
    }

    pub fn set_token(&self, address: &str, txs: Vec<Transaction>) {
        self.token.lock().insert(address.to_string(), Ok(txs));
    }

    pub fn fail_native(&self, address: &str) {
        self.native
            .lock()
            .insert(address.to_string(), Err("native feed down".to_string()));
    }

    pub fn fail_token(&self, address: &str) {
        self.token
            .lock()
            .insert(address.to_string(), Err("token feed down".to_string()));
    }

    /// Make native calls wait for `native_release` after signalling `native_entered`
    pub fn block_native_calls(&self) {
        self.block_native.store(true, Ordering::SeqCst);
    }

    fn read(feed: &Mutex<HashMap<String, Feed>>, address: &str) -> Result<Vec<Transaction>, ProviderError> {
        match feed.lock().get(address) {
            None => Ok(Vec::new()),
            Some(Ok(txs)) => Ok(txs.clone()),
            Some(Err(body)) => Err(ProviderError::Api {
                status: 503,
                body: body.clone(),
            }),
        }
    }
}

#[async_trait::async_trait]
impl DataProvider for ScriptedProvider {
    async fn list_native_transactions(
        &self,
        address: &str,
        _limit: usize,
    ) -> Result<Vec<Transaction>, ProviderError> {
        self.native_calls.fetch_add(1, Ordering::SeqCst);
        if self.block_native.load(Ordering::SeqCst) {
            self.native_entered.notify_one();
            self.native_release.notified().await;
        }
        Self::read(&self.native, address)
    }

    async fn list_token_transfers(
        &self,
        address: &str,
        _limit: usize,
    ) -> Result<Vec<Transaction>, ProviderError> {
        self.token_calls.fetch_add(1, Ordering::SeqCst);
        Self::read(&self.token, address)
    }

    fn invalidate(&self, address: &str) {
        self.invalidations.lock().push(address.to_string());
    }
}

// =============================================================================
// SINK
// =============================================================================

#[derive(Default)]
pub struct RecordingSink {
    pub messages: Mutex<Vec<(String, String)>>,
    pub fail: AtomicBool,
    pub attempts: AtomicUsize,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texts(&self) -> Vec<String> {
        self.messages.lock().iter().map(|(_, t)| t.clone()).collect()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.texts()
            .into_iter()
            .filter(|t| t.contains("Alert!"))
            .collect()
    }

    pub fn summaries(&self) -> Vec<String> {
        self.texts()
            .into_iter()
            .filter(|t| t.contains("New Transactions Detected"))
            .collect()
    }

    pub fn clear(&self) {
        self.messages.lock().clear();
    }
}

#[async_trait::async_trait]
impl NotificationSink for RecordingSink {
    async fn send(&self, subscriber_id: &str, text: &str) -> anyhow::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("sink unreachable");
        }
        self.messages
            .lock()
            .push((subscriber_id.to_string(), text.to_string()));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

// =============================================================================
// TRANSACTIONS
// =============================================================================

pub fn native_tx(hash: &str, direction: Direction, value: &str, timestamp: DateTime<Utc>) -> Transaction {
    Transaction {
        hash: hash.to_string(),
        direction,
        value: Decimal::from_str(value).unwrap(),
        token_symbol: "ETH".to_string(),
        from: (if direction == Direction::In { COUNTERPARTY } else { WALLET }).to_string(),
        to: (if direction == Direction::In { WALLET } else { COUNTERPARTY }).to_string(),
        timestamp,
        kind: TxKind::Native,
    }
}

pub fn token_tx(
    hash: &str,
    direction: Direction,
    value: &str,
    symbol: &str,
    timestamp: DateTime<Utc>,
) -> Transaction {
    Transaction {
        token_symbol: symbol.to_string(),
        kind: TxKind::Token,
        ..native_tx(hash, direction, value, timestamp)
    }
}

// =============================================================================
// HARNESS
// =============================================================================

pub struct Harness {
    pub service: Arc<MonitoringService>,
    pub provider: Arc<ScriptedProvider>,
    pub sink: Arc<RecordingSink>,
    pub clock: Arc<ManualClock>,
    pub metrics: Arc<MetricsState>,
}

pub fn test_settings() -> MonitorSettings {
    MonitorSettings {
        alert_check_delay: Duration::from_millis(10),
        call_timeout: Duration::from_secs(5),
        ..MonitorSettings::default()
    }
}

pub fn harness() -> Harness {
    build_harness(test_settings(), true)
}

pub fn build_harness(settings: MonitorSettings, with_sink: bool) -> Harness {
    let provider = Arc::new(ScriptedProvider::new());
    let sink = Arc::new(RecordingSink::new());
    let clock = Arc::new(ManualClock::new(t0()));
    let metrics = Arc::new(MetricsState::new());

    let configured: Option<Arc<dyn NotificationSink>> = if with_sink {
        Some(sink.clone() as Arc<dyn NotificationSink>)
    } else {
        None
    };
    let notifier = Notifier::new(
        configured,
        "https://basescan.org",
        Duration::from_secs(2),
        metrics.clone(),
    );

    let service = Arc::new(MonitoringService::new(
        settings,
        provider.clone(),
        notifier,
        clock.clone(),
        metrics.clone(),
    ));

    Harness {
        service,
        provider,
        sink,
        clock,
        metrics,
    }
}

/// Wait for the first event matching `pred`, failing after two seconds
pub async fn wait_for_event(
    rx: &mut tokio::sync::broadcast::Receiver<MonitorEvent>,
    pred: impl Fn(&MonitorEvent) -> bool,
) -> MonitorEvent {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(e) => panic!("event stream closed: {}", e),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}
