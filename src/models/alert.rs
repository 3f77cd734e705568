//! Alert rule models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Alert rule types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    /// Funds received in the rule's token at or above the threshold
    IncomingFunds,
    /// Funds sent in the rule's token at or above the threshold
    OutgoingFunds,
    /// NFT received (the transaction feed never produces NFT records yet)
    NftReceived,
    /// Any movement in the rule's token at or above the threshold
    CustomAmount,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::IncomingFunds => "incoming_funds",
            AlertType::OutgoingFunds => "outgoing_funds",
            AlertType::NftReceived => "nft_received",
            AlertType::CustomAmount => "custom_amount",
        }
    }
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert rule as submitted by a caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRuleInput {
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    /// Token symbol (e.g. "ETH", "USDC")
    pub token: String,
    /// Minimum amount to trigger, already in token units
    pub amount: Decimal,
}

/// A registered alert rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    pub id: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub token: String,
    pub amount: Decimal,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl AlertRule {
    /// Create an enabled rule with a fresh id
    pub fn new(input: AlertRuleInput, created_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            alert_type: input.alert_type,
            token: input.token.trim().to_string(),
            amount: input.amount,
            enabled: true,
            created_at,
        }
    }

    /// Validate caller input before a rule is built from it
    pub fn validate_input(input: &AlertRuleInput) -> Result<(), String> {
        if input.token.trim().is_empty() {
            return Err("Alert token must not be empty".to_string());
        }
        if input.amount.is_sign_negative() {
            return Err("Alert amount must not be negative".to_string());
        }
        Ok(())
    }
}
