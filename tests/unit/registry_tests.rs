//! Wallet registry tests
//!
//! Tests registration baselines, re-registration resets and alert edits.

use std::sync::Arc;

use rust_decimal::Decimal;
use wallet_monitor::models::AlertRuleInput;
use wallet_monitor::monitoring::WalletRegistry;
use wallet_monitor::{AlertRule, AlertType, AppError};

use crate::support::{minutes, t0, ManualClock, CHAT_ID, WALLET};

fn registry(clock: Arc<ManualClock>) -> WalletRegistry {
    WalletRegistry::new(clock, minutes(30), 100)
}

fn usdc_rule() -> AlertRule {
    AlertRule::new(
        AlertRuleInput {
            alert_type: AlertType::IncomingFunds,
            token: "USDC".to_string(),
            amount: Decimal::from(5),
        },
        t0(),
    )
}

#[test]
fn test_registration_baseline_is_now_minus_lookback() {
    let clock = Arc::new(ManualClock::new(t0()));
    let registry = registry(clock);

    let (status, replaced) = registry.register(WALLET, CHAT_ID, vec![usdc_rule()]);

    assert!(!replaced);
    assert!(status.is_monitored);
    assert_eq!(status.watermark, Some(t0() - minutes(30)));
    assert_eq!(status.initialized, Some(false));
    assert_eq!(status.seen_count, Some(0));
    assert_eq!(status.alerts.len(), 1);
}

#[test]
fn test_reregistration_rebaselines_state() {
    let clock = Arc::new(ManualClock::new(t0()));
    let registry = registry(clock.clone());
    registry.register(WALLET, CHAT_ID, vec![usdc_rule()]);

    // Simulate a completed check on the first registration
    let handle = registry.entry(WALLET).unwrap();
    registry
        .commit_if_current(WALLET, &handle, |wallet| {
            wallet.seen.insert("0xseen".to_string());
            wallet.initialized = true;
            wallet.watermark = t0();
        })
        .unwrap();

    clock.advance(minutes(20));
    let (status, replaced) = registry.register(WALLET, "other-chat", vec![]);

    assert!(replaced);
    assert_eq!(status.subscriber_id.as_deref(), Some("other-chat"));
    assert!(status.alerts.is_empty());
    assert_eq!(status.seen_count, Some(0));
    assert_eq!(status.initialized, Some(false));
    assert_eq!(status.watermark, Some(t0() + minutes(20) - minutes(30)));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_stale_handle_cannot_commit() {
    let clock = Arc::new(ManualClock::new(t0()));
    let registry = registry(clock);
    registry.register(WALLET, CHAT_ID, vec![]);
    let stale = registry.entry(WALLET).unwrap();

    registry.deregister(WALLET);
    assert!(registry.commit_if_current(WALLET, &stale, |_| ()).is_none());

    registry.register(WALLET, CHAT_ID, vec![]);
    assert!(registry.commit_if_current(WALLET, &stale, |_| ()).is_none());
    let fresh = registry.entry(WALLET).unwrap();
    assert!(registry.commit_if_current(WALLET, &fresh, |_| ()).is_some());
}

#[test]
fn test_alert_operations_on_unknown_wallet() {
    let clock = Arc::new(ManualClock::new(t0()));
    let registry = registry(clock);

    assert!(matches!(
        registry.add_alert(WALLET, usdc_rule()),
        Err(AppError::NotMonitored(_))
    ));
    assert!(matches!(
        registry.remove_alert(WALLET, "id"),
        Err(AppError::NotMonitored(_))
    ));
    assert!(registry.get(WALLET).is_none());
}

#[test]
fn test_list_all_is_sorted() {
    let clock = Arc::new(ManualClock::new(t0()));
    let registry = registry(clock);
    registry.register(crate::support::WALLET_B, CHAT_ID, vec![]);
    registry.register(WALLET, CHAT_ID, vec![]);

    let addresses: Vec<String> = registry.list_all().into_iter().map(|s| s.address).collect();
    assert_eq!(addresses, vec![WALLET.to_string(), crate::support::WALLET_B.to_string()]);
}
