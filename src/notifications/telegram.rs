//! Telegram notification sink
//!
//! Sends HTML-formatted messages through the Bot API `sendMessage` method.
//! The subscriber id is the Telegram chat id.

use super::NotificationSink;
use crate::config::TelegramNotificationConfig;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Telegram Bot API sink
pub struct TelegramSink {
    /// Bot token
    bot_token: SecretString,
    /// HTTP client
    client: reqwest::Client,
    /// API base URL
    api_base: String,
}

impl TelegramSink {
    /// Create a new Telegram sink
    pub fn new(bot_token: SecretString, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            bot_token,
            client,
            api_base: TELEGRAM_API_BASE.to_string(),
        })
    }

    /// Build from config; `None` when disabled or no token is configured
    pub fn from_config(config: &TelegramNotificationConfig) -> anyhow::Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }
        let Some(token) = config.token() else {
            return Ok(None);
        };

        let sink = Self::new(
            SecretString::new(token.to_string()),
            Duration::from_secs(config.timeout_secs),
        )?;
        Ok(Some(sink))
    }

    /// Point the sink at another Bot API host (self-hosted bot API server)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn send_message_url(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_base,
            self.bot_token.expose_secret()
        )
    }
}

fn message_payload(chat_id: &str, text: &str) -> serde_json::Value {
    serde_json::json!({
        "chat_id": chat_id,
        "text": text,
        "parse_mode": "HTML",
        "disable_web_page_preview": true,
    })
}

#[async_trait::async_trait]
impl NotificationSink for TelegramSink {
    async fn send(&self, subscriber_id: &str, text: &str) -> anyhow::Result<()> {
        if subscriber_id.trim().is_empty() {
            anyhow::bail!("empty Telegram chat id");
        }

        let response = self
            .client
            .post(self.send_message_url())
            .json(&message_payload(subscriber_id, text))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Telegram API error: {} - {}", status, body);
        }

        tracing::info!(chat_id = %subscriber_id, "Sent Telegram notification");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}
