//! Configuration management for the wallet monitor
//!
//! Loads configuration from YAML/TOML/JSON files and environment variables.
//! Environment variables override file values.

use config::{Config, ConfigError, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Blockchain data provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Polling and change detection configuration
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    /// Notification configuration
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Data provider (Nodit Web3 Data API) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Data API base URL
    #[serde(default = "default_provider_url")]
    pub base_url: String,
    /// API key (from environment: NODIT_API_KEY)
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Per-request timeout in seconds
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
    /// Response cache TTL in seconds
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    /// Maximum cached responses
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Records requested per list call
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Outbound request budget per second
    #[serde(default = "default_provider_rate_limit")]
    pub rate_limit_per_second: u32,
    /// Native transfers at or below this ETH value are ignored
    #[serde(default = "default_min_native_value")]
    pub min_native_value: f64,
    /// Token contract addresses to keep (empty keeps every token)
    #[serde(default)]
    pub token_allowlist: Vec<String>,
}

fn default_provider_url() -> String {
    "https://web3.nodit.io/v1/base/mainnet".to_string()
}

fn default_provider_timeout() -> u64 {
    15
}

fn default_cache_ttl() -> u64 {
    3
}

fn default_cache_capacity() -> usize {
    256
}

fn default_page_size() -> usize {
    20
}

fn default_provider_rate_limit() -> u32 {
    5
}

fn default_min_native_value() -> f64 {
    0.0001
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_provider_url(),
            api_key: None,
            timeout_secs: default_provider_timeout(),
            cache_ttl_secs: default_cache_ttl(),
            cache_capacity: default_cache_capacity(),
            page_size: default_page_size(),
            rate_limit_per_second: default_provider_rate_limit(),
            min_native_value: default_min_native_value(),
            token_allowlist: Vec::new(),
        }
    }
}

/// Polling and change detection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    /// Scheduler tick interval in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Minimum spacing between provider fetches for one wallet
    #[serde(default = "default_min_recheck")]
    pub min_recheck_secs: u64,
    /// How far back a (re)registered or force-checked wallet looks
    #[serde(default = "default_window")]
    pub lookback_secs: u64,
    /// Maximum age of a transaction still treated as new
    #[serde(default = "default_window")]
    pub recency_window_secs: u64,
    /// Cap on new transactions handled per check
    #[serde(default = "default_max_candidates")]
    pub max_candidates_per_check: usize,
    /// Seen-hash capacity per wallet
    #[serde(default = "default_seen_capacity")]
    pub seen_capacity: usize,
    /// Timeout applied to every provider call made by a check
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
    /// Wallets checked in parallel per scheduler tick
    #[serde(default = "default_max_concurrent_checks")]
    pub max_concurrent_checks: usize,
    /// Delay before the catch-up check that follows an alert addition
    #[serde(default = "default_alert_check_delay")]
    pub alert_check_delay_ms: u64,
}

fn default_poll_interval() -> u64 {
    5
}

fn default_min_recheck() -> u64 {
    5
}

fn default_window() -> u64 {
    1800 // 30 minutes
}

fn default_max_candidates() -> usize {
    10
}

fn default_seen_capacity() -> usize {
    100
}

fn default_call_timeout() -> u64 {
    20
}

fn default_max_concurrent_checks() -> usize {
    4
}

fn default_alert_check_delay() -> u64 {
    1000
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            min_recheck_secs: default_min_recheck(),
            lookback_secs: default_window(),
            recency_window_secs: default_window(),
            max_candidates_per_check: default_max_candidates(),
            seen_capacity: default_seen_capacity(),
            call_timeout_secs: default_call_timeout(),
            max_concurrent_checks: default_max_concurrent_checks(),
            alert_check_delay_ms: default_alert_check_delay(),
        }
    }
}

impl MonitoringConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn min_recheck(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.min_recheck_secs as i64)
    }

    pub fn lookback(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.lookback_secs as i64)
    }

    pub fn recency_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.recency_window_secs as i64)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn alert_check_delay(&self) -> Duration {
        Duration::from_millis(self.alert_check_delay_ms)
    }
}

/// Notification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    /// Telegram notification settings
    #[serde(default)]
    pub telegram: TelegramNotificationConfig,
    /// Block explorer used for transaction and address links
    #[serde(default = "default_explorer_url")]
    pub explorer_base_url: String,
}

fn default_explorer_url() -> String {
    "https://basescan.org".to_string()
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            telegram: TelegramNotificationConfig::default(),
            explorer_base_url: default_explorer_url(),
        }
    }
}

/// Telegram-specific notification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramNotificationConfig {
    /// Whether Telegram notifications are enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Bot token (from environment: TELEGRAM_TOKEN or TELEGRAM_BOT_TOKEN)
    #[serde(default)]
    pub bot_token: Option<SecretString>,
    /// Per-message timeout in seconds
    #[serde(default = "default_telegram_timeout")]
    pub timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_telegram_timeout() -> u64 {
    10
}

impl Default for TelegramNotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bot_token: None,
            timeout_secs: default_telegram_timeout(),
        }
    }
}

impl TelegramNotificationConfig {
    /// Bot token when present and non-empty
    pub fn token(&self) -> Option<&str> {
        self.bot_token
            .as_ref()
            .map(|t| t.expose_secret().as_str())
            .filter(|t| !t.trim().is_empty())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            provider: ProviderConfig::default(),
            monitoring: MonitoringConfig::default(),
            notifications: NotificationsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    ///
    /// Priority (highest to lowest):
    /// 1. Well-known credential variables (NODIT_API_KEY, TELEGRAM_TOKEN), applied as overrides
    /// 2. Environment variables (WALLET_MONITOR_*)
    /// 3. config/config.* (if exists)
    /// 4. config.* (if exists)
    /// 5. Default values
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&["config", "config/config"])
    }

    /// Load using explicit config file stems (extension resolved by the config crate)
    pub fn load_from(file_stems: &[&str]) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port() as i64)?
            .set_default("monitoring.poll_interval_secs", default_poll_interval() as i64)?
            .set_default("monitoring.min_recheck_secs", default_min_recheck() as i64)?;

        for stem in file_stems {
            builder = builder.add_source(File::with_name(stem).required(false));
        }

        // Credential variables used by the rest of the stack
        if let Ok(key) = std::env::var("NODIT_API_KEY") {
            builder = builder.set_override("provider.api_key", key)?;
        }
        if let Some(token) = ["TELEGRAM_TOKEN", "TELEGRAM_BOT_TOKEN"]
            .iter()
            .find_map(|name| std::env::var(name).ok())
        {
            builder = builder.set_override("notifications.telegram.bot_token", token)?;
        }

        let config = builder
            // WALLET_MONITOR_MONITORING__POLL_INTERVAL_SECS=10 -> monitoring.poll_interval_secs = 10
            .add_source(
                Environment::with_prefix("WALLET_MONITOR")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("provider.token_allowlist"),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let m = &self.monitoring;
        if m.poll_interval_secs == 0 {
            return Err(ConfigError::Message(
                "monitoring.poll_interval_secs must be greater than 0".to_string(),
            ));
        }
        if m.seen_capacity == 0 || m.max_candidates_per_check == 0 || m.max_concurrent_checks == 0 {
            return Err(ConfigError::Message(
                "monitoring capacities (seen_capacity, max_candidates_per_check, max_concurrent_checks) must be greater than 0"
                    .to_string(),
            ));
        }
        if m.lookback_secs == 0 || m.call_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "monitoring.lookback_secs and monitoring.call_timeout_secs must be greater than 0"
                    .to_string(),
            ));
        }
        if m.seen_capacity < m.max_candidates_per_check {
            return Err(ConfigError::Message(
                "monitoring.seen_capacity must be at least monitoring.max_candidates_per_check"
                    .to_string(),
            ));
        }
        if m.recency_window_secs < m.min_recheck_secs {
            return Err(ConfigError::Message(
                "monitoring.recency_window_secs must not be shorter than monitoring.min_recheck_secs"
                    .to_string(),
            ));
        }
        if self.provider.base_url.is_empty() {
            return Err(ConfigError::Message("provider.base_url must be set".to_string()));
        }
        Ok(())
    }
}
