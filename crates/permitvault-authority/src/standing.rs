//! Standing allowances: signature-free grants a spender draws down.
//!
//! Grants carry no expiration: once approved they stay usable until drawn
//! down or re-approved. An [`constants::UNLIMITED_ALLOWANCE`] grant is never
//! decremented.

use std::collections::HashMap;

use permitvault_types::{Address, Amount, Asset, Result, VaultError, constants};

/// Per-(owner, asset, spender) standing allowances.
#[derive(Debug, Default)]
pub struct StandingAllowances {
    grants: HashMap<(Address, Asset, Address), Amount>,
}

impl StandingAllowances {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the grant. Zero removes it.
    pub fn approve(&mut self, owner: &Address, asset: &str, spender: &Address, amount: Amount) {
        let key = (*owner, asset.to_string(), *spender);
        if amount == 0 {
            self.grants.remove(&key);
        } else {
            self.grants.insert(key, amount);
        }
    }

    #[must_use]
    pub fn get(&self, owner: &Address, asset: &str, spender: &Address) -> Amount {
        self.grants
            .get(&(*owner, asset.to_string(), *spender))
            .copied()
            .unwrap_or(0)
    }

    /// Fail with `InsufficientAllowance` if the grant is below `amount`.
    pub fn check(&self, owner: &Address, asset: &str, spender: &Address, amount: Amount) -> Result<()> {
        let available = self.get(owner, asset, spender);
        if available < amount {
            return Err(VaultError::InsufficientAllowance {
                asset: asset.to_string(),
                needed: amount,
                available,
            });
        }
        Ok(())
    }

    /// Draw `amount` from the grant.
    ///
    /// # Errors
    /// Returns `InsufficientAllowance` if the grant is below `amount`.
    pub fn spend(&mut self, owner: &Address, asset: &str, spender: &Address, amount: Amount) -> Result<()> {
        self.check(owner, asset, spender, amount)?;
        let key = (*owner, asset.to_string(), *spender);
        if let Some(grant) = self.grants.get_mut(&key) {
            if *grant == constants::UNLIMITED_ALLOWANCE {
                return Ok(());
            }
            *grant -= amount;
            if *grant == 0 {
                self.grants.remove(&key);
            }
        }
        Ok(())
    }
}
