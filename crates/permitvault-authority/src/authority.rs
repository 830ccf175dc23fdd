//! Reference allowance authority.
//!
//! Verifies ed25519 permits against the configured typed-data domain, burns
//! nonces, keeps standing allowances, and pulls funds through the
//! [`TokenBank`] using its own token-level allowance from each owner.
//!
//! Check order for a single permit: spender, amount, signature deadline,
//! expiration, signature, nonce, transfer. A batch checks its shape,
//! deadline and signature first, then each element completely (amount,
//! expiration, nonce) in input order, so the first failing element decides
//! the error. Cheap stateless checks run before
//! the signature; stateful ones run under the state lock so a nonce can
//! never be redeemed twice concurrently.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use ed25519_dalek::{Signature, VerifyingKey};
use parking_lot::Mutex;
use permitvault_types::{
    Address, AllowanceAuthority, Amount, AuthorityConfig, PermitBatch, PermitDetails,
    PermitDomain, PermitSingle, Result, VaultError, ensure_nonzero,
};

use crate::nonce_bitmap::{NonceBitmap, NonceWord};
use crate::standing::StandingAllowances;
use crate::token_bank::TokenBank;

#[derive(Debug, Default)]
struct AuthorityState {
    nonces: NonceBitmap,
    allowances: StandingAllowances,
}

/// In-memory allowance authority.
pub struct PermitAuthority {
    config: AuthorityConfig,
    /// Cached from `config`.
    domain: PermitDomain,
    bank: Arc<TokenBank>,
    state: Mutex<AuthorityState>,
}

impl PermitAuthority {
    /// Create an authority over `bank`.
    ///
    /// # Errors
    /// Returns `Configuration` if the config is invalid.
    pub fn new(config: AuthorityConfig, bank: Arc<TokenBank>) -> Result<Self> {
        config.validate()?;
        let domain = config.domain();
        Ok(Self {
            config,
            domain,
            bank,
            state: Mutex::new(AuthorityState::default()),
        })
    }

    /// The authority's own address. Owners grant it token-level allowance.
    #[must_use]
    pub fn address(&self) -> Address {
        self.config.address
    }

    /// The domain permits must be signed under.
    #[must_use]
    pub fn domain(&self) -> &PermitDomain {
        &self.domain
    }

    /// Set the standing allowance `owner` grants `spender` for `asset`.
    pub fn approve(&self, owner: &Address, asset: &str, spender: &Address, amount: Amount) {
        self.state.lock().allowances.approve(owner, asset, spender, amount);
        tracing::debug!(
            owner = %owner.short(),
            spender = %spender.short(),
            asset,
            amount,
            "Standing allowance set"
        );
    }

    /// Burn every nonce of (owner, asset) selected by `mask` in `word`.
    pub fn invalidate_nonces(&self, owner: &Address, asset: &str, word: u64, mask: NonceWord) {
        self.state.lock().nonces.invalidate(owner, asset, word, mask);
        tracing::debug!(owner = %owner.short(), asset, word, "Nonces invalidated");
    }

    #[must_use]
    pub fn is_nonce_used(&self, owner: &Address, asset: &str, nonce: u64) -> bool {
        self.state.lock().nonces.is_used(owner, asset, nonce)
    }

    fn verify_signature(&self, owner: &Address, digest: &[u8; 32], signature: &[u8]) -> Result<()> {
        let invalid = || VaultError::InvalidSignature { owner: *owner };
        let key = VerifyingKey::from_bytes(owner.as_bytes()).map_err(|_| invalid())?;
        let signature = Signature::from_slice(signature).map_err(|_| invalid())?;
        key.verify_strict(digest, &signature).map_err(|_| invalid())
    }

    fn check_spender(permit_spender: &Address, spender: &Address) -> Result<()> {
        if permit_spender != spender {
            return Err(VaultError::WrongSpender {
                expected: *spender,
                actual: *permit_spender,
            });
        }
        Ok(())
    }

    fn check_details(details: &PermitDetails, amount: Amount) -> Result<()> {
        ensure_nonzero(amount)?;
        if amount > details.amount {
            return Err(VaultError::AmountExceedsPermit {
                requested: amount,
                permitted: details.amount,
            });
        }
        if details.is_expired_at(Utc::now()) {
            return Err(VaultError::PermitExpired {
                expiration: details.expiration,
            });
        }
        Ok(())
    }
}

impl AllowanceAuthority for PermitAuthority {
    fn permit_redeem_and_pull(
        &self,
        owner: &Address,
        spender: &Address,
        permit: &PermitSingle,
        signature: &[u8],
        amount: Amount,
    ) -> Result<Amount> {
        Self::check_spender(&permit.spender, spender)?;
        if permit.signature_expired_at(Utc::now()) {
            return Err(VaultError::SignatureExpired {
                deadline: permit.sig_deadline,
            });
        }
        Self::check_details(&permit.details, amount)?;
        self.verify_signature(owner, &permit.digest(&self.domain), signature)?;

        let details = &permit.details;
        let mut state = self.state.lock();
        state.nonces.check_unused(owner, &details.asset, details.nonce)?;
        self.bank
            .transfer_from(&self.config.address, owner, spender, &details.asset, amount)?;
        state.nonces.consume(owner, &details.asset, details.nonce)?;

        tracing::debug!(
            owner = %owner.short(),
            spender = %spender.short(),
            asset = %details.asset,
            nonce = details.nonce,
            amount,
            "Permit redeemed"
        );
        Ok(amount)
    }

    fn permit_redeem_and_pull_batch(
        &self,
        owner: &Address,
        spender: &Address,
        permit: &PermitBatch,
        signature: &[u8],
        amounts: &[Amount],
    ) -> Result<Vec<Amount>> {
        Self::check_spender(&permit.spender, spender)?;
        if permit.is_empty() {
            return Err(VaultError::EmptyBatch);
        }
        if amounts.len() != permit.len() {
            return Err(VaultError::BatchLengthMismatch {
                details: permit.len(),
                amounts: amounts.len(),
            });
        }
        if permit.signature_expired_at(Utc::now()) {
            return Err(VaultError::SignatureExpired {
                deadline: permit.sig_deadline,
            });
        }
        // One signature covers the batch; after it, elements fail in input order.
        self.verify_signature(owner, &permit.digest(&self.domain), signature)?;

        let mut state = self.state.lock();
        let mut seen = HashSet::with_capacity(permit.len());
        for (details, amount) in permit.details.iter().zip(amounts) {
            Self::check_details(details, *amount)?;
            state.nonces.check_unused(owner, &details.asset, details.nonce)?;
            // The same (asset, nonce) twice in one batch is a replay too.
            if !seen.insert((details.asset.as_str(), details.nonce)) {
                return Err(VaultError::NonceReused {
                    owner: *owner,
                    asset: details.asset.clone(),
                    nonce: details.nonce,
                });
            }
        }

        let moves: Vec<_> = permit
            .details
            .iter()
            .zip(amounts)
            .map(|(details, amount)| (details.asset.clone(), *amount))
            .collect();
        self.bank
            .transfer_from_many(&self.config.address, owner, spender, &moves)?;
        for details in &permit.details {
            state.nonces.consume(owner, &details.asset, details.nonce)?;
        }

        tracing::debug!(
            owner = %owner.short(),
            spender = %spender.short(),
            elements = permit.len(),
            "Batch permit redeemed"
        );
        Ok(amounts.to_vec())
    }

    fn allowance_pull(
        &self,
        owner: &Address,
        spender: &Address,
        asset: &str,
        amount: Amount,
    ) -> Result<Amount> {
        ensure_nonzero(amount)?;
        let mut state = self.state.lock();
        state.allowances.check(owner, asset, spender, amount)?;
        self.bank
            .transfer_from(&self.config.address, owner, spender, asset, amount)?;
        state.allowances.spend(owner, asset, spender, amount)?;

        tracing::debug!(
            owner = %owner.short(),
            spender = %spender.short(),
            asset,
            amount,
            "Standing allowance drawn"
        );
        Ok(amount)
    }

    fn allowance(&self, owner: &Address, asset: &str, spender: &Address) -> Amount {
        self.state.lock().allowances.get(owner, asset, spender)
    }
}
