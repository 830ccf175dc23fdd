//! The vault's internal ledger.
//!
//! Tracks per-(depositor, asset) balances. Every mutation is a single
//! read-modify-write under the entry's shard lock, so concurrent operations
//! on the same pair never observe a half-applied credit or debit, while
//! operations on different pairs proceed independently.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use permitvault_types::{
    Address, Amount, Asset, BalanceEntry, Result, VaultError, checked_credit, ensure_nonzero,
};

/// Per-(depositor, asset) deposited balances.
///
/// Only the vault mutates the ledger. Entries that reach zero are removed,
/// so reads of drained pairs fall back to the zero default.
#[derive(Debug, Default)]
pub struct Ledger {
    entries: DashMap<(Address, Asset), Amount>,
}

impl Ledger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increase the entry by `amount`.
    ///
    /// # Errors
    /// - `ZeroAmount` if `amount` is zero
    /// - `ArithmeticOverflow` if the entry would exceed `Amount::MAX`
    pub fn credit(&self, depositor: &Address, asset: &str, amount: Amount) -> Result<Amount> {
        ensure_nonzero(amount)?;
        match self.entries.entry((*depositor, asset.to_string())) {
            Entry::Occupied(mut occupied) => {
                let next = checked_credit(*occupied.get(), amount)?;
                *occupied.get_mut() = next;
                Ok(next)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(amount);
                Ok(amount)
            }
        }
    }

    /// Decrease the entry by `amount`.
    ///
    /// # Errors
    /// - `ZeroAmount` if `amount` is zero
    /// - `InsufficientBalance` if the entry is below `amount`
    pub fn debit(&self, depositor: &Address, asset: &str, amount: Amount) -> Result<Amount> {
        ensure_nonzero(amount)?;
        let insufficient = |available| VaultError::InsufficientBalance {
            asset: asset.to_string(),
            needed: amount,
            available,
        };
        match self.entries.entry((*depositor, asset.to_string())) {
            Entry::Occupied(mut occupied) => {
                let available = *occupied.get();
                if available < amount {
                    return Err(insufficient(available));
                }
                let remaining = available - amount;
                if remaining == 0 {
                    occupied.remove();
                } else {
                    *occupied.get_mut() = remaining;
                }
                Ok(remaining)
            }
            Entry::Vacant(_) => Err(insufficient(0)),
        }
    }

    /// Current balance; zero for pairs never credited.
    #[must_use]
    pub fn read(&self, depositor: &Address, asset: &str) -> Amount {
        self.entries
            .get(&(*depositor, asset.to_string()))
            .map_or(0, |entry| *entry)
    }

    /// Sum of every depositor's entry for `asset`.
    ///
    /// Saturates at `Amount::MAX`; the total can never legitimately exceed
    /// custody, which is itself an `Amount`.
    #[must_use]
    pub fn total(&self, asset: &str) -> Amount {
        self.entries
            .iter()
            .filter(|entry| entry.key().1 == asset)
            .fold(0, |acc: Amount, entry| acc.saturating_add(*entry.value()))
    }

    /// A depositor's non-zero entries, sorted by asset.
    #[must_use]
    pub fn entries_for(&self, depositor: &Address) -> Vec<BalanceEntry> {
        let mut out: Vec<BalanceEntry> = self
            .entries
            .iter()
            .filter(|entry| entry.key().0 == *depositor)
            .map(|entry| BalanceEntry {
                depositor: *depositor,
                asset: entry.key().1.clone(),
                amount: *entry.value(),
            })
            .collect();
        out.sort_by(|a, b| a.asset.cmp(&b.asset));
        out
    }

    /// Number of non-zero entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
