//! In-memory fungible-token custody.
//!
//! Models the underlying token standard: balances per (holder, asset),
//! token-level allowances per (owner, spender, asset), and transfers. All
//! state sits behind one lock so a multi-asset pull is atomic.

use std::collections::HashMap;

use parking_lot::Mutex;
use permitvault_types::{
    Address, Amount, Asset, AssetCustody, Result, VaultError, checked_credit, constants,
};

#[derive(Debug, Default)]
struct BankState {
    /// Per-(holder, asset) balances.
    balances: HashMap<(Address, Asset), Amount>,
    /// Per-(owner, spender, asset) token allowances.
    allowances: HashMap<(Address, Address, Asset), Amount>,
    /// Minted supply per asset.
    supply: HashMap<Asset, Amount>,
}

impl BankState {
    fn balance(&self, holder: &Address, asset: &str) -> Amount {
        self.balances
            .get(&(*holder, asset.to_string()))
            .copied()
            .unwrap_or(0)
    }

    fn allowance(&self, owner: &Address, spender: &Address, asset: &str) -> Amount {
        self.allowances
            .get(&(*owner, *spender, asset.to_string()))
            .copied()
            .unwrap_or(0)
    }

    fn ensure_funds(&self, from: &Address, asset: &str, amount: Amount) -> Result<()> {
        let held = self.balance(from, asset);
        if held < amount {
            return Err(VaultError::transfer_failed(format!(
                "{} holds {held} {asset}, needs {amount}",
                from.short()
            )));
        }
        Ok(())
    }

    fn ensure_allowance(
        &self,
        owner: &Address,
        spender: &Address,
        asset: &str,
        amount: Amount,
    ) -> Result<()> {
        let allowed = self.allowance(owner, spender, asset);
        if allowed < amount {
            return Err(VaultError::transfer_failed(format!(
                "{} allows {} only {allowed} {asset}, needs {amount}",
                owner.short(),
                spender.short()
            )));
        }
        Ok(())
    }

    fn move_funds(&mut self, from: &Address, to: &Address, asset: &str, amount: Amount) -> Result<()> {
        self.ensure_funds(from, asset, amount)?;
        if from == to || amount == 0 {
            return Ok(());
        }
        let to_balance = checked_credit(self.balance(to, asset), amount)?;

        let from_key = (*from, asset.to_string());
        let remaining = self.balance(from, asset) - amount;
        if remaining == 0 {
            self.balances.remove(&from_key);
        } else {
            self.balances.insert(from_key, remaining);
        }
        self.balances.insert((*to, asset.to_string()), to_balance);
        Ok(())
    }

    fn spend_allowance(&mut self, owner: &Address, spender: &Address, asset: &str, amount: Amount) {
        let key = (*owner, *spender, asset.to_string());
        if let Some(allowed) = self.allowances.get_mut(&key) {
            if *allowed != constants::UNLIMITED_ALLOWANCE {
                *allowed -= amount;
            }
        }
    }
}

/// Thread-safe in-memory token ledger.
#[derive(Debug, Default)]
pub struct TokenBank {
    state: Mutex<BankState>,
}

impl TokenBank {
    /// Create an empty bank.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `amount` new units of `asset` owned by `to`.
    ///
    /// # Errors
    /// Returns `ArithmeticOverflow` if total supply would overflow.
    pub fn mint(&self, to: &Address, asset: &str, amount: Amount) -> Result<()> {
        let mut state = self.state.lock();
        let supply = state.supply.get(asset).copied().unwrap_or(0);
        let new_supply = checked_credit(supply, amount)?;
        // Balances never exceed supply, so this cannot overflow once supply didn't.
        let new_balance = state.balance(to, asset) + amount;
        state.supply.insert(asset.to_string(), new_supply);
        state.balances.insert((*to, asset.to_string()), new_balance);
        tracing::debug!(to = %to.short(), asset, amount, "Minted");
        Ok(())
    }

    /// Set the token-level allowance `owner` grants `spender`.
    /// [`constants::UNLIMITED_ALLOWANCE`] is never decremented.
    pub fn approve(&self, owner: &Address, spender: &Address, asset: &str, amount: Amount) {
        let mut state = self.state.lock();
        let key = (*owner, *spender, asset.to_string());
        if amount == 0 {
            state.allowances.remove(&key);
        } else {
            state.allowances.insert(key, amount);
        }
    }

    /// Token-level allowance `owner` has granted `spender`.
    #[must_use]
    pub fn token_allowance(&self, owner: &Address, spender: &Address, asset: &str) -> Amount {
        self.state.lock().allowance(owner, spender, asset)
    }

    /// Move `amount` from `from` to `to` on behalf of `spender`, consuming
    /// `spender`'s token allowance.
    ///
    /// # Errors
    /// Returns `TransferFailed` if the allowance or the balance is short.
    pub fn transfer_from(
        &self,
        spender: &Address,
        from: &Address,
        to: &Address,
        asset: &str,
        amount: Amount,
    ) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_allowance(from, spender, asset, amount)?;
        state.move_funds(from, to, asset, amount)?;
        state.spend_allowance(from, spender, asset, amount);
        Ok(())
    }

    /// Several `transfer_from`s between the same parties, all or nothing.
    ///
    /// Every move is validated (aggregated per asset) before any is applied.
    ///
    /// # Errors
    /// Returns `TransferFailed` if any asset's allowance or balance is short.
    pub fn transfer_from_many(
        &self,
        spender: &Address,
        from: &Address,
        to: &Address,
        moves: &[(Asset, Amount)],
    ) -> Result<()> {
        let mut state = self.state.lock();

        let mut needed: Vec<(&str, Amount)> = Vec::new();
        for (asset, amount) in moves {
            match needed.iter_mut().find(|(a, _)| *a == asset.as_str()) {
                Some((_, total)) => {
                    *total = total
                        .checked_add(*amount)
                        .ok_or_else(|| VaultError::transfer_failed(format!("{asset} total overflows")))?;
                }
                None => needed.push((asset.as_str(), *amount)),
            }
        }
        for (asset, total) in &needed {
            state.ensure_allowance(from, spender, asset, *total)?;
            state.ensure_funds(from, asset, *total)?;
        }

        for (asset, amount) in moves {
            state.move_funds(from, to, asset, *amount)?;
            state.spend_allowance(from, spender, asset, *amount);
        }
        Ok(())
    }

    /// Minted supply of `asset`.
    #[must_use]
    pub fn total_supply(&self, asset: &str) -> Amount {
        self.state.lock().supply.get(asset).copied().unwrap_or(0)
    }
}

impl AssetCustody for TokenBank {
    fn transfer(&self, from: &Address, to: &Address, asset: &str, amount: Amount) -> Result<()> {
        self.state.lock().move_funds(from, to, asset, amount)
    }

    fn balance_of(&self, holder: &Address, asset: &str) -> Amount {
        self.state.lock().balance(holder, asset)
    }
}
