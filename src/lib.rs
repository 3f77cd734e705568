//! Wallet Monitor Library
//!
//! Polls a blockchain data provider for watched addresses, detects new
//! transactions and sends alert notifications when they match per-wallet
//! rules. This library exposes core modules for the binary and for tests.

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod monitoring;
pub mod notifications;
pub mod provider;
pub mod utils;

// Re-export commonly used types for tests
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use handlers::{app_router, AppState};
pub use metrics::MetricsState;
pub use models::{AlertRule, AlertRuleInput, AlertType, Direction, Transaction, TxKind, WalletStatus};
pub use monitoring::{
    CheckMode, CheckOutcome, Clock, MonitorEvent, MonitorSettings, MonitoringService, SystemClock,
};
pub use notifications::{NotificationSink, Notifier, TelegramSink};
pub use provider::{DataProvider, FeedCategory, NoditClient, ProviderError};
