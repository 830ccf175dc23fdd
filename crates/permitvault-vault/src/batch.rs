//! Multi-asset deposits.
//!
//! Both batch paths are all-or-nothing: either every element is pulled and
//! credited, or no ledger entry changes and anything already pulled goes
//! back to the depositor. The first failing element in input order decides
//! the reported error.

use std::collections::HashMap;

use permitvault_types::{
    Address, AllowanceAuthority, Amount, Asset, AssetCustody, FundingPath, PermitBatch, Receipt,
    Result, VaultError, ensure_nonzero,
};

use crate::vault::Vault;

impl<A: AllowanceAuthority, C: AssetCustody> Vault<A, C> {
    /// Deposit against a signed batch permit; `amounts[i]` is drawn against
    /// `permit.details[i]`. Returns one receipt per element, in order.
    ///
    /// # Errors
    /// - `EmptyBatch`, `BatchLengthMismatch`, `BatchTooLarge` for bad shapes
    /// - `WrongSpender` if the permit names another spender
    /// - any authority error, unchanged (`ZeroAmount`, `AmountExceedsPermit`,
    ///   `NonceReused`, ... for the first failing element)
    pub fn deposit_batch(
        &self,
        caller: &Address,
        amounts: &[Amount],
        permit: &PermitBatch,
        signature: &[u8],
    ) -> Result<Vec<Receipt>> {
        self.try_deposit_batch(caller, amounts, permit, signature)
            .inspect_err(|e| self.log_rejected("deposit_batch", caller, e))
    }

    fn try_deposit_batch(
        &self,
        caller: &Address,
        amounts: &[Amount],
        permit: &PermitBatch,
        signature: &[u8],
    ) -> Result<Vec<Receipt>> {
        if permit.is_empty() {
            return Err(VaultError::EmptyBatch);
        }
        if amounts.len() != permit.len() {
            return Err(VaultError::BatchLengthMismatch {
                details: permit.len(),
                amounts: amounts.len(),
            });
        }
        self.check_batch_len(permit.len())?;
        self.check_spender(&permit.spender)?;

        // Per-element checks belong to the authority, which reports the
        // first failing element in input order and redeems all or nothing.
        let vault = self.address();
        let pulled = self
            .authority
            .permit_redeem_and_pull_batch(caller, &vault, permit, signature, amounts)?;
        let pulls: Vec<(Asset, Amount)> = permit
            .details
            .iter()
            .map(|d| d.asset.clone())
            .zip(pulled)
            .collect();
        self.ensure_pulled(caller, &pulls, amounts)?;

        self.settle(caller, FundingPath::Permit, &pulls)
    }

    /// Deposit `amount` of every asset in `assets` from the caller's
    /// standing allowances, one pull per asset in input order.
    ///
    /// Allowances are pre-flighted so a batch that cannot succeed fails
    /// before anything moves. A pull that still fails mid-batch has every
    /// earlier pull refunded to the caller.
    ///
    /// The ledger and the caller's tokens are all-or-nothing; the standing
    /// allowance is not. Allowance drawn by an earlier, refunded pull stays
    /// consumed, since only the authority can re-grant it.
    ///
    /// # Errors
    /// - `EmptyBatch`, `BatchTooLarge`, `ZeroAmount` for bad inputs
    /// - `InsufficientAllowance` for the first element the allowance cannot cover
    /// - any authority error from a pull, unchanged
    pub fn deposit_batch_allowed(
        &self,
        caller: &Address,
        amount: Amount,
        assets: &[&str],
    ) -> Result<Vec<Receipt>> {
        self.try_deposit_batch_allowed(caller, amount, assets)
            .inspect_err(|e| self.log_rejected("deposit_batch_allowed", caller, e))
    }

    fn try_deposit_batch_allowed(
        &self,
        caller: &Address,
        amount: Amount,
        assets: &[&str],
    ) -> Result<Vec<Receipt>> {
        if assets.is_empty() {
            return Err(VaultError::EmptyBatch);
        }
        self.check_batch_len(assets.len())?;
        ensure_nonzero(amount)?;
        self.preflight_allowances(caller, amount, assets)?;

        let vault = self.address();
        let mut pulls: Vec<(Asset, Amount)> = Vec::with_capacity(assets.len());
        for asset in assets {
            match self.authority.allowance_pull(caller, &vault, asset, amount) {
                Ok(pulled) => pulls.push(((*asset).to_string(), pulled)),
                Err(e) => {
                    self.refund(caller, &pulls);
                    return Err(e);
                }
            }
        }
        self.ensure_pulled(caller, &pulls, &vec![amount; assets.len()])?;

        self.settle(caller, FundingPath::StandingAllowance, &pulls)
    }

    fn check_batch_len(&self, len: usize) -> Result<()> {
        let max = self.config.max_batch_len;
        if len > max {
            return Err(VaultError::BatchTooLarge { len, max });
        }
        Ok(())
    }

    /// Walk the batch in order with a running per-asset total, so an asset
    /// listed twice needs allowance for both draws.
    fn preflight_allowances(&self, caller: &Address, amount: Amount, assets: &[&str]) -> Result<()> {
        let vault = self.address();
        let mut needed: HashMap<&str, Amount> = HashMap::with_capacity(assets.len());
        for asset in assets {
            let total = needed.entry(*asset).or_insert(0);
            *total = total.saturating_add(amount);
            let available = self.authority.allowance(caller, asset, &vault);
            if *total > available {
                return Err(VaultError::InsufficientAllowance {
                    asset: (*asset).to_string(),
                    needed: *total,
                    available,
                });
            }
        }
        Ok(())
    }
}
