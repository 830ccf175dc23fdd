//! Interfaces the vault consumes from the outside world.
//!
//! The vault never verifies signatures, tracks nonces, or moves tokens
//! itself. It asks an [`AllowanceAuthority`] to authorize-and-pull funds
//! into custody, and an [`AssetCustody`] to pay them back out.
//!
//! Each call is one blocking step with no partial results: it either fully
//! authorizes and transfers, or it fails and nothing moved.

use std::sync::Arc;

use crate::{Address, Amount, PermitBatch, PermitSingle, Result};

/// Signature verification, nonce invalidation and allowance-gated pulls.
pub trait AllowanceAuthority: Send + Sync {
    /// Redeem a single-asset permit and move `amount` from `owner` to
    /// `spender`. The nonce is consumed only if the transfer succeeds.
    fn permit_redeem_and_pull(
        &self,
        owner: &Address,
        spender: &Address,
        permit: &PermitSingle,
        signature: &[u8],
        amount: Amount,
    ) -> Result<Amount>;

    /// Redeem a batch permit; `amounts[i]` is pulled against
    /// `permit.details[i]`. Any element failure aborts the whole batch.
    fn permit_redeem_and_pull_batch(
        &self,
        owner: &Address,
        spender: &Address,
        permit: &PermitBatch,
        signature: &[u8],
        amounts: &[Amount],
    ) -> Result<Vec<Amount>>;

    /// Draw `amount` from the standing allowance (owner, asset, spender)
    /// and move it from `owner` to `spender`.
    fn allowance_pull(
        &self,
        owner: &Address,
        spender: &Address,
        asset: &str,
        amount: Amount,
    ) -> Result<Amount>;

    /// Remaining standing allowance. Read-only.
    fn allowance(&self, owner: &Address, asset: &str, spender: &Address) -> Amount;
}

/// Movement of already-custodied assets.
pub trait AssetCustody: Send + Sync {
    fn transfer(&self, from: &Address, to: &Address, asset: &str, amount: Amount) -> Result<()>;

    fn balance_of(&self, holder: &Address, asset: &str) -> Amount;
}

impl<T: AllowanceAuthority + ?Sized> AllowanceAuthority for Arc<T> {
    fn permit_redeem_and_pull(
        &self,
        owner: &Address,
        spender: &Address,
        permit: &PermitSingle,
        signature: &[u8],
        amount: Amount,
    ) -> Result<Amount> {
        (**self).permit_redeem_and_pull(owner, spender, permit, signature, amount)
    }

    fn permit_redeem_and_pull_batch(
        &self,
        owner: &Address,
        spender: &Address,
        permit: &PermitBatch,
        signature: &[u8],
        amounts: &[Amount],
    ) -> Result<Vec<Amount>> {
        (**self).permit_redeem_and_pull_batch(owner, spender, permit, signature, amounts)
    }

    fn allowance_pull(
        &self,
        owner: &Address,
        spender: &Address,
        asset: &str,
        amount: Amount,
    ) -> Result<Amount> {
        (**self).allowance_pull(owner, spender, asset, amount)
    }

    fn allowance(&self, owner: &Address, asset: &str, spender: &Address) -> Amount {
        (**self).allowance(owner, asset, spender)
    }
}

impl<T: AssetCustody + ?Sized> AssetCustody for Arc<T> {
    fn transfer(&self, from: &Address, to: &Address, asset: &str, amount: Amount) -> Result<()> {
        (**self).transfer(from, to, asset, amount)
    }

    fn balance_of(&self, holder: &Address, asset: &str) -> Amount {
        (**self).balance_of(holder, asset)
    }
}
