//! Alert rule matching
//!
//! Pure functions; rules never consume or mutate a transaction and every
//! enabled rule that matches fires on its own.

use crate::models::{AlertRule, AlertType, Direction, Transaction, TxKind};

/// Whether `rule` fires for `tx`, ignoring the `enabled` flag
pub fn rule_fires(rule: &AlertRule, tx: &Transaction) -> bool {
    match rule.alert_type {
        AlertType::IncomingFunds => tx.direction == Direction::In && meets_threshold(rule, tx),
        AlertType::OutgoingFunds => tx.direction == Direction::Out && meets_threshold(rule, tx),
        AlertType::NftReceived => tx.direction == Direction::In && tx.kind == TxKind::Nft,
        AlertType::CustomAmount => meets_threshold(rule, tx),
    }
}

fn meets_threshold(rule: &AlertRule, tx: &Transaction) -> bool {
    tx.token_symbol == rule.token && tx.value >= rule.amount
}

/// Enabled rules in `rules` that fire for `tx`
pub fn matching_rules<'a>(
    rules: &'a [AlertRule],
    tx: &'a Transaction,
) -> impl Iterator<Item = &'a AlertRule> + 'a {
    rules
        .iter()
        .filter(move |rule| rule.enabled && rule_fires(rule, tx))
}
