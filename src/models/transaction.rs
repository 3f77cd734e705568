//! Normalized transaction records produced by the data provider adapter

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Transfer direction relative to the monitored wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    In,
    Out,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::In => write!(f, "IN"),
            Direction::Out => write!(f, "OUT"),
        }
    }
}

/// Which feed a transaction came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
    Native,
    Token,
    /// Reserved for NFT transfers; no feed populates it
    Nft,
}

impl std::fmt::Display for TxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TxKind::Native => write!(f, "native"),
            TxKind::Token => write!(f, "token"),
            TxKind::Nft => write!(f, "nft"),
        }
    }
}

/// A transfer touching a monitored wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: String,
    pub direction: Direction,
    /// Amount already scaled by token decimals
    pub value: Decimal,
    pub token_symbol: String,
    pub from: String,
    pub to: String,
    pub timestamp: DateTime<Utc>,
    pub kind: TxKind,
}

impl Transaction {
    /// The other side of the transfer
    pub fn counterparty(&self) -> &str {
        match self.direction {
            Direction::In => &self.from,
            Direction::Out => &self.to,
        }
    }
}
