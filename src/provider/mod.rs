//! Blockchain data provider seam
//!
//! The change detector only depends on the [`DataProvider`] trait; the Nodit
//! client is the production implementation.

pub mod cache;
pub mod nodit;
pub mod rate_limiter;

pub use cache::ResponseCache;
pub use nodit::NoditClient;
pub use rate_limiter::RateLimiter;

use crate::models::Transaction;
use thiserror::Error;

/// Errors raised by a data provider call
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Transport failure (connect, TLS, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from the provider
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    /// Call did not finish in time
    #[error("request timed out")]
    Timeout,

    /// Response body could not be interpreted
    #[error("decode error: {0}")]
    Decode(String),
}

/// Transaction feed category
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedCategory {
    Native,
    Token,
}

impl FeedCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedCategory::Native => "native",
            FeedCategory::Token => "token",
        }
    }
}

impl std::fmt::Display for FeedCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of recent transactions for an address
#[async_trait::async_trait]
pub trait DataProvider: Send + Sync {
    /// Recent native-currency transfers touching `address` (kind = native)
    async fn list_native_transactions(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<Transaction>, ProviderError>;

    /// Recent token transfers touching `address` (kind = token)
    async fn list_token_transfers(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<Transaction>, ProviderError>;

    /// Drop any cached responses for `address` so the next call is fresh
    fn invalidate(&self, address: &str);
}
