//! Notification delivery for wallet alerts
//!
//! Message shapes:
//! - Alert fired (one per matching rule and transaction)
//! - Batch summary (one per check that found new transactions)
//! - Test message
//!
//! Delivery is at-most-once: failures are logged and counted, never retried.

pub mod telegram;

pub use telegram::TelegramSink;

use std::sync::Arc;
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::metrics::MetricsState;
use crate::models::{AlertRule, AlertType, Direction, Transaction, TxKind};

/// Default text for test notifications
pub const DEFAULT_TEST_MESSAGE: &str = "🧪 Test notification from the wallet monitoring service!";

/// Destination for notification text
#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver `text` (HTML formatted) to `subscriber_id`
    async fn send(&self, subscriber_id: &str, text: &str) -> anyhow::Result<()>;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}

/// Escape text for Telegram HTML parse mode
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Formats alert messages and hands them to the configured sink
pub struct Notifier {
    sink: Option<Arc<dyn NotificationSink>>,
    explorer_base_url: String,
    timeout: Duration,
    metrics: Arc<MetricsState>,
}

impl Notifier {
    pub fn new(
        sink: Option<Arc<dyn NotificationSink>>,
        explorer_base_url: impl Into<String>,
        timeout: Duration,
        metrics: Arc<MetricsState>,
    ) -> Self {
        Self {
            sink,
            explorer_base_url: explorer_base_url.into().trim_end_matches('/').to_string(),
            timeout,
            metrics,
        }
    }

    /// Whether a sink is configured
    pub fn is_available(&self) -> bool {
        self.sink.is_some()
    }

    fn tx_link(&self, hash: &str) -> String {
        format!(
            "<a href=\"{}/tx/{}\">🔗 View on explorer</a>",
            self.explorer_base_url,
            escape_html(hash)
        )
    }

    fn address_link(&self, address: &str) -> String {
        format!(
            "<a href=\"{}/address/{}\">🔗 View on explorer</a>",
            self.explorer_base_url,
            escape_html(address)
        )
    }

    /// Message for one (rule, transaction) pair
    pub fn format_alert(&self, rule: &AlertRule, tx: &Transaction) -> String {
        let value = tx.value.normalize();
        let symbol = escape_html(&tx.token_symbol);
        let hash = escape_html(&tx.hash);
        let rule_line = format!(
            "Rule: {} ≥ {} {}",
            rule.alert_type,
            rule.amount.normalize(),
            escape_html(&rule.token)
        );

        let (header, headline, party_line) = match rule.alert_type {
            AlertType::IncomingFunds => (
                "💰 <b>Incoming Funds Alert!</b>",
                format!("Received <b>{} {}</b>", value, symbol),
                format!("- From: <code>{}</code>", escape_html(tx.counterparty())),
            ),
            AlertType::OutgoingFunds => (
                "📤 <b>Outgoing Funds Alert!</b>",
                format!("Sent <b>{} {}</b>", value, symbol),
                format!("- To: <code>{}</code>", escape_html(tx.counterparty())),
            ),
            AlertType::NftReceived => (
                "🎨 <b>NFT Received Alert!</b>",
                format!("Received NFT <b>{}</b>", symbol),
                format!("- From: <code>{}</code>", escape_html(tx.counterparty())),
            ),
            AlertType::CustomAmount => {
                let verb = match tx.direction {
                    Direction::In => "Received",
                    Direction::Out => "Sent",
                };
                let label = match tx.direction {
                    Direction::In => "From",
                    Direction::Out => "To",
                };
                (
                    "🔔 <b>Custom Amount Alert!</b>",
                    format!("{} <b>{} {}</b>", verb, value, symbol),
                    format!("- {}: <code>{}</code>", label, escape_html(tx.counterparty())),
                )
            }
        };

        format!(
            "{}\n\n{}\n\n<i>Transaction Details:</i>\n- Amount: {} {}\n- Direction: {}\n{}\n- Hash: <code>{}</code>\n{}\n\n{}",
            header,
            headline,
            value,
            symbol,
            tx.direction,
            party_line,
            hash,
            rule_line,
            self.tx_link(&tx.hash)
        )
    }

    /// Compact listing of every new transaction found by one check
    pub fn format_batch_summary(&self, address: &str, txs: &[Transaction]) -> String {
        let lines: Vec<String> = txs
            .iter()
            .map(|tx| {
                let marker = match tx.direction {
                    Direction::In => "📥",
                    Direction::Out => "📤",
                };
                let kind = match tx.kind {
                    TxKind::Native => "Native",
                    TxKind::Token => "Token",
                    TxKind::Nft => "NFT",
                };
                format!(
                    "{} <b>{:.6} {}</b> ({})",
                    marker,
                    tx.value,
                    escape_html(&tx.token_symbol),
                    kind
                )
            })
            .collect();

        format!(
            "📊 <b>New Transactions Detected!</b>\n\nWallet: <code>{}</code>\n\n{}\n\n{}",
            escape_html(address),
            lines.join("\n"),
            self.address_link(address)
        )
    }

    /// Send an alert message; returns whether it was delivered
    pub async fn send_alert(&self, subscriber_id: &str, rule: &AlertRule, tx: &Transaction) -> bool {
        let text = self.format_alert(rule, tx);
        self.deliver_logged(subscriber_id, &text, "alert").await
    }

    /// Send the batch summary; returns whether it was delivered
    pub async fn send_batch_summary(
        &self,
        subscriber_id: &str,
        address: &str,
        txs: &[Transaction],
    ) -> bool {
        if txs.is_empty() {
            return false;
        }
        let text = self.format_batch_summary(address, txs);
        self.deliver_logged(subscriber_id, &text, "batch_summary").await
    }

    /// Send a test message, surfacing failures to the caller
    pub async fn send_test(&self, subscriber_id: &str, message: Option<&str>) -> AppResult<()> {
        if self.sink.is_none() {
            return Err(AppError::NotificationsDisabled);
        }
        let text = message
            .map(escape_html)
            .unwrap_or_else(|| DEFAULT_TEST_MESSAGE.to_string());
        self.deliver(subscriber_id, &text)
            .await
            .map_err(|e| AppError::Notification(e.to_string()))
    }

    async fn deliver_logged(&self, subscriber_id: &str, text: &str, kind: &str) -> bool {
        if self.sink.is_none() {
            tracing::warn!(
                subscriber = %subscriber_id,
                kind,
                "Notifications not configured, skipping message"
            );
            return false;
        }

        match self.deliver(subscriber_id, text).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    subscriber = %subscriber_id,
                    kind,
                    error = %e,
                    "Failed to deliver notification"
                );
                false
            }
        }
    }

    async fn deliver(&self, subscriber_id: &str, text: &str) -> anyhow::Result<()> {
        let Some(sink) = &self.sink else {
            anyhow::bail!("no notification sink configured");
        };

        let result = match tokio::time::timeout(self.timeout, sink.send(subscriber_id, text)).await
        {
            Ok(result) => result,
            Err(_) => Err(anyhow::anyhow!(
                "{} delivery timed out after {:?}",
                sink.name(),
                self.timeout
            )),
        };

        match &result {
            Ok(()) => {
                self.metrics.notifications_sent.inc();
                tracing::debug!(subscriber = %subscriber_id, sink = sink.name(), "Notification sent");
            }
            Err(_) => self.metrics.notifications_failed.inc(),
        }
        result
    }
}
