//! Scriptable fakes for the vault's collaborators.
//!
//! `FakeAuthority` performs no signature or nonce checks; it moves funds in
//! a shared [`FakeCustody`] and returns whatever failure a test scripts.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use permitvault_types::{
    Address, AllowanceAuthority, Amount, Asset, AssetCustody, PermitBatch, PermitSingle, Result,
    VaultError,
};

#[derive(Debug, Default)]
pub struct FakeCustody {
    balances: Mutex<HashMap<(Address, Asset), Amount>>,
    fail_transfers: AtomicBool,
}

impl FakeCustody {
    pub fn fund(&self, holder: &Address, asset: &str, amount: Amount) {
        *self
            .balances
            .lock()
            .entry((*holder, asset.to_string()))
            .or_insert(0) += amount;
    }

    pub fn set_fail_transfers(&self, fail: bool) {
        self.fail_transfers.store(fail, Ordering::SeqCst);
    }
}

impl AssetCustody for FakeCustody {
    fn transfer(&self, from: &Address, to: &Address, asset: &str, amount: Amount) -> Result<()> {
        if self.fail_transfers.load(Ordering::SeqCst) {
            return Err(VaultError::transfer_failed("custody offline"));
        }
        let mut balances = self.balances.lock();
        let held = balances.get(&(*from, asset.to_string())).copied().unwrap_or(0);
        if held < amount {
            return Err(VaultError::transfer_failed(format!(
                "{} holds {held} {asset}, needs {amount}",
                from.short()
            )));
        }
        balances.insert((*from, asset.to_string()), held - amount);
        *balances.entry((*to, asset.to_string())).or_insert(0) += amount;
        Ok(())
    }

    fn balance_of(&self, holder: &Address, asset: &str) -> Amount {
        self.balances
            .lock()
            .get(&(*holder, asset.to_string()))
            .copied()
            .unwrap_or(0)
    }
}

#[derive(Debug, Default)]
struct Script {
    permit_error: Option<VaultError>,
    /// Assets whose `allowance_pull` fails with the given error.
    pull_errors: HashMap<Asset, VaultError>,
    /// Report this amount as pulled instead of the requested one.
    short_pull: Option<Amount>,
}

pub struct FakeAuthority {
    custody: Arc<FakeCustody>,
    allowances: Mutex<HashMap<(Address, Asset, Address), Amount>>,
    script: Mutex<Script>,
}

impl FakeAuthority {
    pub fn new(custody: Arc<FakeCustody>) -> Self {
        Self {
            custody,
            allowances: Mutex::new(HashMap::new()),
            script: Mutex::new(Script::default()),
        }
    }

    pub fn grant(&self, owner: &Address, asset: &str, spender: &Address, amount: Amount) {
        self.allowances
            .lock()
            .insert((*owner, asset.to_string(), *spender), amount);
    }

    pub fn fail_permits_with(&self, err: VaultError) {
        self.script.lock().permit_error = Some(err);
    }

    pub fn fail_pull_of(&self, asset: &str, err: VaultError) {
        self.script.lock().pull_errors.insert(asset.to_string(), err);
    }

    pub fn report_short_pull(&self, amount: Amount) {
        self.script.lock().short_pull = Some(amount);
    }

    fn reported(&self, amount: Amount) -> Amount {
        self.script.lock().short_pull.unwrap_or(amount)
    }
}

impl AllowanceAuthority for FakeAuthority {
    fn permit_redeem_and_pull(
        &self,
        owner: &Address,
        spender: &Address,
        permit: &PermitSingle,
        _signature: &[u8],
        amount: Amount,
    ) -> Result<Amount> {
        if let Some(err) = self.script.lock().permit_error.clone() {
            return Err(err);
        }
        self.custody
            .transfer(owner, spender, &permit.details.asset, amount)?;
        Ok(self.reported(amount))
    }

    fn permit_redeem_and_pull_batch(
        &self,
        owner: &Address,
        spender: &Address,
        permit: &PermitBatch,
        _signature: &[u8],
        amounts: &[Amount],
    ) -> Result<Vec<Amount>> {
        if let Some(err) = self.script.lock().permit_error.clone() {
            return Err(err);
        }
        for (details, amount) in permit.details.iter().zip(amounts) {
            self.custody.transfer(owner, spender, &details.asset, *amount)?;
        }
        Ok(amounts.iter().map(|a| self.reported(*a)).collect())
    }

    fn allowance_pull(
        &self,
        owner: &Address,
        spender: &Address,
        asset: &str,
        amount: Amount,
    ) -> Result<Amount> {
        if let Some(err) = self.script.lock().pull_errors.get(asset).cloned() {
            return Err(err);
        }
        let key = (*owner, asset.to_string(), *spender);
        let available = self.allowances.lock().get(&key).copied().unwrap_or(0);
        if available < amount {
            return Err(VaultError::InsufficientAllowance {
                asset: asset.to_string(),
                needed: amount,
                available,
            });
        }
        self.custody.transfer(owner, spender, asset, amount)?;
        self.allowances.lock().insert(key, available - amount);
        Ok(self.reported(amount))
    }

    fn allowance(&self, owner: &Address, asset: &str, spender: &Address) -> Amount {
        self.allowances
            .lock()
            .get(&(*owner, asset.to_string(), *spender))
            .copied()
            .unwrap_or(0)
    }
}
