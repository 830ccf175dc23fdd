//! Vault operations: deposit by permit, deposit by standing allowance, and
//! withdraw.
//!
//! The vault holds no signature, nonce or allowance state. Every deposit is
//! a pull performed by the injected [`AllowanceAuthority`]; the ledger is
//! credited only after that pull has fully succeeded. Withdrawals debit
//! first and pay out through [`AssetCustody`], re-crediting if the payout
//! fails.

use permitvault_types::{
    Address, AllowanceAuthority, Amount, Asset, AssetCustody, BalanceEntry, FundingPath,
    PermitDetails, PermitSingle, Receipt, Result, VaultConfig, VaultError, ensure_nonzero,
};

use crate::audit::CustodyAudit;
use crate::ledger::Ledger;

/// A custodial deposit vault.
///
/// Generic over its authority and custody so tests can inject fakes. All
/// operations take `&self`; the vault is `Send + Sync` whenever `A` and `C`
/// are.
pub struct Vault<A, C> {
    pub(crate) config: VaultConfig,
    pub(crate) authority: A,
    pub(crate) custody: C,
    pub(crate) ledger: Ledger,
    pub(crate) audit: CustodyAudit,
}

impl<A: AllowanceAuthority, C: AssetCustody> Vault<A, C> {
    /// Create a vault.
    ///
    /// # Errors
    /// Returns `Configuration` if the config is invalid.
    pub fn new(config: VaultConfig, authority: A, custody: C) -> Result<Self> {
        config.validate()?;
        tracing::info!(
            vault = %config.address.short(),
            max_batch_len = config.max_batch_len,
            "Vault initialized"
        );
        Ok(Self {
            config,
            authority,
            custody,
            ledger: Ledger::new(),
            audit: CustodyAudit::new(),
        })
    }

    /// The vault's address. Permits must name it as spender.
    #[must_use]
    pub fn address(&self) -> Address {
        self.config.address
    }

    #[must_use]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    // =================================================================
    // Deposits
    // =================================================================

    /// Deposit `amount` by redeeming a signed single-asset permit.
    ///
    /// 1. Check spender, amount and permit cap locally (no nonce touched)
    /// 2. Redeem the permit through the authority, pulling `amount` in
    /// 3. Credit (caller, asset)
    ///
    /// # Errors
    /// - `ZeroAmount`, `WrongSpender`, `AmountExceedsPermit` from the local checks
    /// - any authority error, unchanged (`InvalidSignature`, `NonceReused`,
    ///   `PermitExpired`, `SignatureExpired`, `TransferFailed`, ...)
    /// - `ArithmeticOverflow` if the credit would overflow; the pull is refunded
    pub fn deposit(
        &self,
        caller: &Address,
        amount: Amount,
        permit: &PermitSingle,
        signature: &[u8],
    ) -> Result<Receipt> {
        self.try_deposit(caller, amount, permit, signature)
            .inspect_err(|e| self.log_rejected("deposit", caller, e))
    }

    fn try_deposit(
        &self,
        caller: &Address,
        amount: Amount,
        permit: &PermitSingle,
        signature: &[u8],
    ) -> Result<Receipt> {
        // Step 1: Local checks
        self.check_spender(&permit.spender)?;
        Self::check_permitted(&permit.details, amount)?;

        // Step 2: Pull (on failure nothing moved)
        let vault = self.address();
        let pulled = self
            .authority
            .permit_redeem_and_pull(caller, &vault, permit, signature, amount)?;
        let pulls = vec![(permit.details.asset.clone(), pulled)];
        self.ensure_pulled(caller, &pulls, &[amount])?;

        // Step 3: Credit
        let mut receipts = self.settle(caller, FundingPath::Permit, &pulls)?;
        receipts
            .pop()
            .ok_or_else(|| VaultError::Internal("settle returned no receipt".into()))
    }

    /// Deposit `amount` of `asset` drawn from the caller's standing
    /// allowance to this vault. No signature, no expiration.
    ///
    /// # Errors
    /// - `ZeroAmount` if `amount` is zero
    /// - `InsufficientAllowance` / `TransferFailed` from the authority
    /// - `ArithmeticOverflow` if the credit would overflow; the pull is refunded
    pub fn deposit_allowed(&self, caller: &Address, amount: Amount, asset: &str) -> Result<Receipt> {
        self.try_deposit_allowed(caller, amount, asset)
            .inspect_err(|e| self.log_rejected("deposit_allowed", caller, e))
    }

    fn try_deposit_allowed(&self, caller: &Address, amount: Amount, asset: &str) -> Result<Receipt> {
        ensure_nonzero(amount)?;
        let vault = self.address();
        let pulled = self.authority.allowance_pull(caller, &vault, asset, amount)?;
        let pulls = vec![(asset.to_string(), pulled)];
        self.ensure_pulled(caller, &pulls, &[amount])?;

        let mut receipts = self.settle(caller, FundingPath::StandingAllowance, &pulls)?;
        receipts
            .pop()
            .ok_or_else(|| VaultError::Internal("settle returned no receipt".into()))
    }

    // =================================================================
    // Withdraw
    // =================================================================

    /// Withdraw `amount` of `asset` from the caller's own entry.
    ///
    /// 1. Debit (caller, asset)
    /// 2. Transfer from custody to the caller
    /// 3. If the transfer fails, re-credit and surface the transfer error
    ///
    /// There is no way to withdraw another depositor's entry.
    ///
    /// # Errors
    /// - `ZeroAmount` if `amount` is zero
    /// - `InsufficientBalance` if the entry is below `amount`
    /// - `TransferFailed` if custody could not pay out
    pub fn withdraw(&self, caller: &Address, asset: &str, amount: Amount) -> Result<Receipt> {
        self.try_withdraw(caller, asset, amount)
            .inspect_err(|e| self.log_rejected("withdraw", caller, e))
    }

    fn try_withdraw(&self, caller: &Address, asset: &str, amount: Amount) -> Result<Receipt> {
        ensure_nonzero(amount)?;
        let remaining = self.ledger.debit(caller, asset, amount)?;

        let vault = self.address();
        if let Err(transfer_err) = self.custody.transfer(&vault, caller, asset, amount) {
            if let Err(rollback_err) = self.ledger.credit(caller, asset, amount) {
                tracing::error!(
                    depositor = %caller.short(),
                    asset,
                    amount,
                    error = %rollback_err,
                    "Withdraw rollback failed; ledger entry lost"
                );
                return Err(VaultError::Internal(format!(
                    "withdraw rollback failed after {transfer_err}: {rollback_err}"
                )));
            }
            return Err(transfer_err);
        }

        self.audit.record_withdrawal(asset, amount);
        tracing::info!(
            depositor = %caller.short(),
            asset,
            amount,
            remaining,
            "Withdraw completed"
        );
        Ok(Receipt::withdraw(*caller, asset, amount))
    }

    // =================================================================
    // Queries
    // =================================================================

    /// The caller's deposited balance; zero if never credited.
    #[must_use]
    pub fn balance_of(&self, depositor: &Address, asset: &str) -> Amount {
        self.ledger.read(depositor, asset)
    }

    /// Every non-zero entry of `depositor`, sorted by asset.
    #[must_use]
    pub fn balances_of(&self, depositor: &Address) -> Vec<BalanceEntry> {
        self.ledger.entries_for(depositor)
    }

    /// What the vault actually holds of `asset` according to custody.
    #[must_use]
    pub fn custody_of(&self, asset: &str) -> Amount {
        self.custody.balance_of(&self.address(), asset)
    }

    /// Check the custody invariants for `asset`.
    ///
    /// Only meaningful while no operation on `asset` is in flight.
    ///
    /// # Errors
    /// Returns `CustodyInvariantViolation` if the ledger disagrees with the
    /// recorded flows or exceeds custody.
    pub fn audit(&self, asset: &str) -> Result<()> {
        let result = self
            .audit
            .verify(asset, self.ledger.total(asset), self.custody_of(asset));
        if let Err(e) = &result {
            tracing::error!(vault = %self.address().short(), asset, error = %e, "Custody audit failed");
        }
        result
    }

    /// [`Self::audit`] every asset the vault has seen.
    ///
    /// # Errors
    /// The first violation found, in asset order.
    pub fn audit_all(&self) -> Result<()> {
        for asset in self.audit.tracked_assets() {
            self.audit(&asset)?;
        }
        Ok(())
    }

    // =================================================================
    // Shared steps
    // =================================================================

    pub(crate) fn check_spender(&self, spender: &Address) -> Result<()> {
        if *spender != self.config.address {
            return Err(VaultError::WrongSpender {
                expected: self.config.address,
                actual: *spender,
            });
        }
        Ok(())
    }

    fn check_permitted(details: &PermitDetails, amount: Amount) -> Result<()> {
        ensure_nonzero(amount)?;
        if amount > details.amount {
            return Err(VaultError::AmountExceedsPermit {
                requested: amount,
                permitted: details.amount,
            });
        }
        Ok(())
    }

    /// Fail (and refund) unless the authority reported exactly the
    /// requested amounts.
    ///
    /// A refund never exceeds what the vault asked for: an over-reported
    /// pull must not pay the caller out of other depositors' custody.
    pub(crate) fn ensure_pulled(
        &self,
        caller: &Address,
        pulls: &[(Asset, Amount)],
        requested: &[Amount],
    ) -> Result<()> {
        let matches = pulls.len() == requested.len()
            && pulls.iter().zip(requested).all(|((_, got), want)| got == want);
        if matches {
            return Ok(());
        }
        let refunds: Vec<(Asset, Amount)> = pulls
            .iter()
            .zip(requested)
            .map(|((asset, got), want)| (asset.clone(), (*got).min(*want)))
            .collect();
        self.refund(caller, &refunds);
        Err(VaultError::transfer_failed(format!(
            "authority reported pulls {:?}, requested {requested:?}",
            pulls.iter().map(|(_, a)| *a).collect::<Vec<_>>()
        )))
    }

    /// Credit every pull to `caller`, or none of them.
    ///
    /// On a credit failure, earlier credits are debited back. Pulls whose
    /// credit was undone, or never made, are refunded before the error is
    /// returned.
    pub(crate) fn settle(
        &self,
        caller: &Address,
        path: FundingPath,
        pulls: &[(Asset, Amount)],
    ) -> Result<Vec<Receipt>> {
        for (i, (asset, amount)) in pulls.iter().enumerate() {
            if let Err(e) = self.ledger.credit(caller, asset, *amount) {
                let mut refunds = self.unwind_credits(caller, &pulls[..i]);
                refunds.extend_from_slice(&pulls[i..]);
                self.refund(caller, &refunds);
                return Err(e);
            }
        }

        let receipts = pulls
            .iter()
            .map(|(asset, amount)| {
                self.audit.record_deposit(asset, *amount);
                tracing::info!(
                    depositor = %caller.short(),
                    asset = %asset,
                    amount = *amount,
                    path = %path,
                    "Deposit credited"
                );
                Receipt::deposit(path, *caller, asset, *amount)
            })
            .collect();
        Ok(receipts)
    }

    /// Debit back credits made earlier in a failing call. Returns the ones
    /// undone; only those may be refunded.
    ///
    /// A credit that can no longer be debited was already withdrawn by a
    /// concurrent call and paid out of this pull, so it stands and is
    /// recorded as a deposit.
    pub(crate) fn unwind_credits(
        &self,
        caller: &Address,
        credited: &[(Asset, Amount)],
    ) -> Vec<(Asset, Amount)> {
        let mut undone = Vec::with_capacity(credited.len());
        for (asset, amount) in credited {
            match self.ledger.debit(caller, asset, *amount) {
                Ok(_) => undone.push((asset.clone(), *amount)),
                Err(e) => {
                    self.audit.record_deposit(asset, *amount);
                    tracing::error!(
                        depositor = %caller.short(),
                        asset = %asset,
                        amount = *amount,
                        error = %e,
                        "Credit rollback failed; credit stands"
                    );
                }
            }
        }
        undone
    }

    /// Return already-pulled funds from custody to `caller`.
    pub(crate) fn refund(&self, caller: &Address, pulls: &[(Asset, Amount)]) {
        let vault = self.address();
        for (asset, amount) in pulls.iter().filter(|(_, a)| *a > 0) {
            match self.custody.transfer(&vault, caller, asset, *amount) {
                Ok(()) => tracing::warn!(
                    depositor = %caller.short(),
                    asset = %asset,
                    amount = *amount,
                    "Pulled funds refunded"
                ),
                Err(e) => tracing::error!(
                    depositor = %caller.short(),
                    asset = %asset,
                    amount = *amount,
                    error = %e,
                    "Refund failed; funds remain in custody"
                ),
            }
        }
    }

    pub(crate) fn log_rejected(&self, op: &'static str, caller: &Address, err: &VaultError) {
        tracing::warn!(
            vault = %self.address().short(),
            depositor = %caller.short(),
            op,
            category = %err.category(),
            error = %err,
            "Operation rejected"
        );
    }
}
