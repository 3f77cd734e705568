//! Domain models for wallet monitoring

pub mod alert;
pub mod transaction;
pub mod wallet;

pub use alert::{AlertRule, AlertRuleInput, AlertType};
pub use transaction::{Direction, Transaction, TxKind};
pub use wallet::{MonitoredWallet, SeenHashes, WalletStatus};
