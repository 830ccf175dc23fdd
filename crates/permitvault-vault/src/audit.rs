//! Custody invariant checker.
//!
//! Two identities must hold for every asset at any quiescent point:
//!
//! ```text
//! Σ ledger(asset) == Σ deposits(asset) − Σ withdrawals(asset)
//! Σ ledger(asset) <= custody(vault, asset)
//! ```
//!
//! The first catches accounting bugs inside the vault (a credit without a
//! pull, a debit without a payout). The second is the solvency guarantee:
//! depositors can never be owed more than the vault actually holds.

use std::collections::{BTreeSet, HashMap};

use parking_lot::Mutex;
use permitvault_types::{Amount, Asset, Result, VaultError};

#[derive(Debug, Default)]
struct Flows {
    deposits: HashMap<Asset, Amount>,
    withdrawals: HashMap<Asset, Amount>,
}

/// Cumulative per-asset deposit and withdrawal totals.
#[derive(Debug, Default)]
pub struct CustodyAudit {
    flows: Mutex<Flows>,
}

impl CustodyAudit {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_deposit(&self, asset: &str, amount: Amount) {
        let mut flows = self.flows.lock();
        let total = flows.deposits.entry(asset.to_string()).or_insert(0);
        *total = total.saturating_add(amount);
    }

    pub fn record_withdrawal(&self, asset: &str, amount: Amount) {
        let mut flows = self.flows.lock();
        let total = flows.withdrawals.entry(asset.to_string()).or_insert(0);
        *total = total.saturating_add(amount);
    }

    #[must_use]
    pub fn total_deposits(&self, asset: &str) -> Amount {
        self.flows.lock().deposits.get(asset).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total_withdrawals(&self, asset: &str) -> Amount {
        self.flows.lock().withdrawals.get(asset).copied().unwrap_or(0)
    }

    /// Deposits minus withdrawals.
    #[must_use]
    pub fn expected_outstanding(&self, asset: &str) -> Amount {
        let flows = self.flows.lock();
        let deposited = flows.deposits.get(asset).copied().unwrap_or(0);
        let withdrawn = flows.withdrawals.get(asset).copied().unwrap_or(0);
        deposited.saturating_sub(withdrawn)
    }

    /// Every asset that has seen a deposit or withdrawal, sorted.
    #[must_use]
    pub fn tracked_assets(&self) -> Vec<Asset> {
        let flows = self.flows.lock();
        let assets: BTreeSet<&Asset> = flows.deposits.keys().chain(flows.withdrawals.keys()).collect();
        assets.into_iter().cloned().collect()
    }

    /// Check both identities for `asset`.
    ///
    /// # Errors
    /// Returns [`VaultError::CustodyInvariantViolation`] if either fails.
    pub fn verify(&self, asset: &str, ledger_total: Amount, custody: Amount) -> Result<()> {
        let expected = self.expected_outstanding(asset);
        if ledger_total != expected {
            return Err(VaultError::CustodyInvariantViolation {
                reason: format!(
                    "asset {asset}: ledger total {ledger_total} != deposits - withdrawals {expected} \
                     (deposits={}, withdrawals={})",
                    self.total_deposits(asset),
                    self.total_withdrawals(asset),
                ),
            });
        }
        if ledger_total > custody {
            return Err(VaultError::CustodyInvariantViolation {
                reason: format!("asset {asset}: ledger total {ledger_total} exceeds custody {custody}"),
            });
        }
        Ok(())
    }
}
