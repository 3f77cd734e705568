//! Monitored wallet state

use chrono::{DateTime, Utc};
use lru::LruCache;
use serde::Serialize;
use std::num::NonZeroUsize;

use super::AlertRule;

/// Bounded set of transaction hashes already notified for a wallet.
///
/// Capacity is fixed at construction; inserting past capacity evicts the
/// oldest inserted hash.
pub struct SeenHashes {
    hashes: LruCache<String, ()>,
}

impl SeenHashes {
    pub fn new(capacity: usize) -> Self {
        Self {
            hashes: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
        }
    }

    /// Membership test; does not refresh the entry's age
    pub fn contains(&self, hash: &str) -> bool {
        self.hashes.contains(hash)
    }

    pub fn insert(&mut self, hash: String) {
        self.hashes.put(hash, ());
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.hashes.cap().get()
    }
}

impl std::fmt::Debug for SeenHashes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeenHashes")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

/// Per-wallet monitoring state, keyed by normalized address in the registry
#[derive(Debug)]
pub struct MonitoredWallet {
    pub address: String,
    pub subscriber_id: String,
    pub alerts: Vec<AlertRule>,
    /// Transactions at or before this instant are considered processed
    pub watermark: DateTime<Utc>,
    pub seen: SeenHashes,
    /// False until the first check has run against the registration baseline
    pub initialized: bool,
}

impl MonitoredWallet {
    pub fn new(
        address: String,
        subscriber_id: String,
        alerts: Vec<AlertRule>,
        watermark: DateTime<Utc>,
        seen_capacity: usize,
    ) -> Self {
        Self {
            address,
            subscriber_id,
            alerts,
            watermark,
            seen: SeenHashes::new(seen_capacity),
            initialized: false,
        }
    }

    /// Snapshot for status queries
    pub fn status(&self) -> WalletStatus {
        WalletStatus {
            address: self.address.clone(),
            is_monitored: true,
            subscriber_id: Some(self.subscriber_id.clone()),
            alerts: self.alerts.clone(),
            watermark: Some(self.watermark),
            initialized: Some(self.initialized),
            seen_count: Some(self.seen.len()),
        }
    }
}

/// Serializable view of a wallet's monitoring state
#[derive(Debug, Clone, Serialize)]
pub struct WalletStatus {
    pub address: String,
    pub is_monitored: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscriber_id: Option<String>,
    pub alerts: Vec<AlertRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watermark: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initialized: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seen_count: Option<usize>,
}

impl WalletStatus {
    /// Status for an address nobody is monitoring
    pub fn unmonitored(address: &str) -> Self {
        Self {
            address: address.to_string(),
            is_monitored: false,
            subscriber_id: None,
            alerts: Vec::new(),
            watermark: None,
            initialized: None,
            seen_count: None,
        }
    }
}
