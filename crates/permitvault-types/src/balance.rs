//! Balance types for the vault ledger.
//!
//! Amounts are non-negative integers in the asset's smallest unit. Every
//! arithmetic path is checked; nothing wraps.

use serde::{Deserialize, Serialize};

use crate::{Address, Result, VaultError};

/// Type alias for asset identifiers (e.g., "USDC", "WETH").
pub type Asset = String;

/// Integer amount of an asset in its smallest unit.
pub type Amount = u128;

/// A single ledger entry: how much of `asset` is credited to `depositor`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BalanceEntry {
    pub depositor: Address,
    pub asset: Asset,
    pub amount: Amount,
}

/// Reject zero amounts. Every mutating operation moves something.
pub fn ensure_nonzero(amount: Amount) -> Result<()> {
    if amount == 0 {
        return Err(VaultError::ZeroAmount);
    }
    Ok(())
}

/// Checked addition that reports [`VaultError::ArithmeticOverflow`].
pub fn checked_credit(current: Amount, amount: Amount) -> Result<Amount> {
    current
        .checked_add(amount)
        .ok_or(VaultError::ArithmeticOverflow { current, amount })
}
