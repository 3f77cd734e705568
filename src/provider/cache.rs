//! Provider response caching
//!
//! LRU cache for data provider responses with TTL-based expiration.
//! Keys are grouped by address so a caller can force fresh data for one wallet.

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CachedResponse {
    data: serde_json::Value,
    cached_at: Instant,
}

/// Provider response cache
pub struct ResponseCache {
    entries: Mutex<LruCache<String, CachedResponse>>,
    ttl: Duration,
}

impl ResponseCache {
    /// Create a new cache holding at most `max_size` responses for `ttl`
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(
                NonZeroUsize::new(max_size).unwrap_or(NonZeroUsize::MIN),
            )),
            ttl,
        }
    }

    /// Build the cache key for an endpoint call scoped to an address
    pub fn key(address: &str, endpoint: &str, limit: usize) -> String {
        format!("{}|{}|{}", address, endpoint, limit)
    }

    /// Cached response if present and not expired
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(cached) if cached.cached_at.elapsed() < self.ttl => Some(cached.data.clone()),
            Some(_) => {
                entries.pop(key);
                None
            }
            None => None,
        }
    }

    /// Store a response
    pub fn set(&self, key: String, data: serde_json::Value) {
        if self.ttl.is_zero() {
            return;
        }
        self.entries.lock().put(
            key,
            CachedResponse {
                data,
                cached_at: Instant::now(),
            },
        );
    }

    /// Remove every entry belonging to `address`
    pub fn invalidate_address(&self, address: &str) {
        let prefix = format!("{}|", address);
        let mut entries = self.entries.lock();
        let stale: Vec<String> = entries
            .iter()
            .filter(|(k, _)| k.starts_with(&prefix))
            .map(|(k, _)| k.clone())
            .collect();
        for key in stale {
            entries.pop(&key);
        }
    }
}
