//! Sliding-window rate limiter for outbound provider requests
//!
//! Keeps the data provider under its request-per-second plan limit when many
//! wallets are checked in parallel.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Rate limiter using a sliding window of request timestamps
pub struct RateLimiter {
    /// Maximum requests per window
    max_requests: u32,
    /// Window length
    window: Duration,
    /// Timestamps of requests inside the window
    requests: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    ///
    /// # Arguments
    /// * `max_requests` - Maximum requests per window (0 disables limiting)
    /// * `window_secs` - Window length in seconds (typically 1)
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs.max(1)),
            requests: Mutex::new(VecDeque::new()),
        }
    }

    /// Acquire permission to make a request (waits while at the limit)
    pub async fn acquire(&self) {
        loop {
            match self.reserve() {
                None => return,
                Some(wait) => sleep(wait).await,
            }
        }
    }

    /// `None` when granted, otherwise how long until a slot frees up
    fn reserve(&self) -> Option<Duration> {
        if self.max_requests == 0 {
            return None;
        }

        let now = Instant::now();
        let mut requests = self.requests.lock();
        Self::evict_expired(&mut requests, now, self.window);

        if (requests.len() as u32) < self.max_requests {
            requests.push_back(now);
            return None;
        }

        let wait = requests
            .front()
            .map(|oldest| (*oldest + self.window).saturating_duration_since(now))
            .unwrap_or_default();
        Some(wait.max(Duration::from_millis(10)))
    }

    fn evict_expired(requests: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(&oldest) = requests.front() {
            if now.duration_since(oldest) >= window {
                requests.pop_front();
            } else {
                break;
            }
        }
    }
}
