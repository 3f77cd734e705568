//! In-memory table of monitored wallets
//!
//! Each wallet lives behind its own [`WalletEntry`]: an async `check_lock`
//! serializes checks for that wallet, while the short-lived `state` mutex
//! guards the data itself so status reads and alert edits never wait on
//! provider calls. Re-registration installs a brand-new entry; a check still
//! holding the old entry sees that via [`WalletRegistry::commit_if_current`]
//! and drops its result.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

use super::clock::Clock;
use crate::error::{AppError, AppResult};
use crate::models::{AlertRule, MonitoredWallet, WalletStatus};

/// Per-wallet slot in the registry
pub struct WalletEntry {
    pub check_lock: tokio::sync::Mutex<()>,
    pub state: Mutex<MonitoredWallet>,
}

pub type WalletHandle = Arc<WalletEntry>;

pub struct WalletRegistry {
    wallets: RwLock<HashMap<String, WalletHandle>>,
    clock: Arc<dyn Clock>,
    lookback: chrono::Duration,
    seen_capacity: usize,
}

fn key(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}

impl WalletRegistry {
    pub fn new(clock: Arc<dyn Clock>, lookback: chrono::Duration, seen_capacity: usize) -> Self {
        Self {
            wallets: RwLock::new(HashMap::new()),
            clock,
            lookback,
            seen_capacity,
        }
    }

    /// Register or re-baseline a wallet.
    ///
    /// Returns the new status and whether an existing registration was replaced.
    pub fn register(
        &self,
        address: &str,
        subscriber_id: &str,
        alerts: Vec<AlertRule>,
    ) -> (WalletStatus, bool) {
        let address = key(address);
        let now = self.clock.now();
        let wallet = MonitoredWallet::new(
            address.clone(),
            subscriber_id.to_string(),
            alerts,
            now - self.lookback,
            self.seen_capacity,
        );
        let status = wallet.status();
        let entry = Arc::new(WalletEntry {
            check_lock: tokio::sync::Mutex::new(()),
            state: Mutex::new(wallet),
        });

        let replaced = self.wallets.write().insert(address, entry).is_some();
        (status, replaced)
    }

    /// Remove a wallet; returns whether it was registered
    pub fn deregister(&self, address: &str) -> bool {
        self.wallets.write().remove(&key(address)).is_some()
    }

    pub fn add_alert(&self, address: &str, rule: AlertRule) -> AppResult<()> {
        let entry = self.require(address)?;
        entry.state.lock().alerts.push(rule);
        Ok(())
    }

    /// Remove a rule by id and return it
    pub fn remove_alert(&self, address: &str, rule_id: &str) -> AppResult<AlertRule> {
        let entry = self.require(address)?;
        let mut state = entry.state.lock();
        let index = state
            .alerts
            .iter()
            .position(|r| r.id == rule_id)
            .ok_or_else(|| AppError::NotFound(format!("Alert {} not found", rule_id)))?;
        Ok(state.alerts.remove(index))
    }

    pub fn get(&self, address: &str) -> Option<WalletStatus> {
        self.entry(address).map(|e| e.state.lock().status())
    }

    /// Snapshot of every wallet, ordered by address
    pub fn list_all(&self) -> Vec<WalletStatus> {
        let entries: Vec<WalletHandle> = self.wallets.read().values().cloned().collect();
        let mut statuses: Vec<WalletStatus> =
            entries.iter().map(|e| e.state.lock().status()).collect();
        statuses.sort_by(|a, b| a.address.cmp(&b.address));
        statuses
    }

    pub fn addresses(&self) -> Vec<String> {
        self.wallets.read().keys().cloned().collect()
    }

    pub fn entry(&self, address: &str) -> Option<WalletHandle> {
        self.wallets.read().get(&key(address)).cloned()
    }

    /// Run `f` on the wallet state only if `handle` is still registered.
    ///
    /// The registry read lock is held for the duration, so a concurrent
    /// deregister or re-register either happens entirely before (and `f` is
    /// skipped) or entirely after the commit.
    pub fn commit_if_current<R>(
        &self,
        address: &str,
        handle: &WalletHandle,
        f: impl FnOnce(&mut MonitoredWallet) -> R,
    ) -> Option<R> {
        let wallets = self.wallets.read();
        match wallets.get(&key(address)) {
            Some(current) if Arc::ptr_eq(current, handle) => {
                let mut state = handle.state.lock();
                Some(f(&mut state))
            }
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.wallets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.read().is_empty()
    }

    fn require(&self, address: &str) -> AppResult<WalletHandle> {
        self.entry(address)
            .ok_or_else(|| AppError::NotMonitored(key(address)))
    }
}
