//! # Permits: signed, time-boxed allowances
//!
//! A permit lets an owner authorize a spender (the vault) to pull a bounded
//! amount of an asset without a separate on-ledger approval. The owner signs
//! a typed-data digest; the allowance authority verifies it, burns the nonce
//! and moves the funds.
//!
//! ## Digest layout
//!
//! ```text
//!   digest      = SHA-256(0x19 0x01 || domain_separator || struct_hash)
//!   domain_sep  = SHA-256(DOMAIN_TAG || len(name) || name || chain_id || authority)
//!   details     = SHA-256(DETAILS_TAG || len(asset) || asset || amount || expiration_ms || nonce)
//!   single      = SHA-256(PERMIT_SINGLE_TAG || details || spender || sig_deadline_ms)
//!   batch       = SHA-256(PERMIT_BATCH_TAG || n || details_0 .. details_n || spender || sig_deadline_ms)
//! ```
//!
//! Integers are little-endian. Every field participates, so changing any
//! one of them invalidates the signature.
//!
//! ## Temporal guarantees
//!
//! - `expiration`: last instant the allowance itself may be used
//! - `sig_deadline`: last instant the signature may be redeemed
//!
//! Both are inclusive (`now <= t` is still valid).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Address, Amount, Asset, constants};

/// The typed-data domain a permit is signed under.
///
/// Binding the authority address and chain id prevents a signature for one
/// deployment from being replayed against another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitDomain {
    /// Human-readable domain name.
    pub name: String,
    /// Chain (or deployment) identifier.
    pub chain_id: u64,
    /// Address of the authority that verifies permits in this domain.
    pub verifying_authority: Address,
}

impl PermitDomain {
    /// SHA-256 domain separator.
    #[must_use]
    pub fn separator(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(constants::DOMAIN_TAG);
        hasher.update((self.name.len() as u64).to_le_bytes());
        hasher.update(self.name.as_bytes());
        hasher.update(self.chain_id.to_le_bytes());
        hasher.update(self.verifying_authority.as_bytes());
        hasher.finalize().into()
    }
}

/// Per-asset allowance terms shared by single and batch permits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitDetails {
    /// Asset the allowance applies to.
    pub asset: Asset,
    /// Maximum amount the spender may pull.
    pub amount: Amount,
    /// When the allowance stops being usable.
    pub expiration: DateTime<Utc>,
    /// Single-use nonce, unique per (owner, asset).
    pub nonce: u64,
}

impl PermitDetails {
    /// Hash of the details record.
    #[must_use]
    pub fn hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(constants::DETAILS_TAG);
        hasher.update((self.asset.len() as u64).to_le_bytes());
        hasher.update(self.asset.as_bytes());
        hasher.update(self.amount.to_le_bytes());
        hasher.update(self.expiration.timestamp_millis().to_le_bytes());
        hasher.update(self.nonce.to_le_bytes());
        hasher.finalize().into()
    }

    /// Returns `true` if the allowance has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        passed(now, self.expiration)
    }
}

/// A permit covering exactly one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitSingle {
    pub details: PermitDetails,
    /// The only party allowed to redeem this permit.
    pub spender: Address,
    /// Last instant the signature may be redeemed.
    pub sig_deadline: DateTime<Utc>,
}

impl PermitSingle {
    /// Struct hash, before domain binding.
    #[must_use]
    pub fn struct_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(constants::PERMIT_SINGLE_TAG);
        hasher.update(self.details.hash());
        hasher.update(self.spender.as_bytes());
        hasher.update(self.sig_deadline.timestamp_millis().to_le_bytes());
        hasher.finalize().into()
    }

    /// The digest the owner signs.
    #[must_use]
    pub fn digest(&self, domain: &PermitDomain) -> [u8; 32] {
        typed_data_digest(&domain.separator(), &self.struct_hash())
    }

    /// Returns `true` if the signature deadline has passed at `now`.
    #[must_use]
    pub fn signature_expired_at(&self, now: DateTime<Utc>) -> bool {
        passed(now, self.sig_deadline)
    }
}

/// A permit covering an ordered list of assets under one signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitBatch {
    pub details: Vec<PermitDetails>,
    pub spender: Address,
    pub sig_deadline: DateTime<Utc>,
}

impl PermitBatch {
    /// Struct hash, before domain binding. Element order is significant.
    #[must_use]
    pub fn struct_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(constants::PERMIT_BATCH_TAG);
        hasher.update((self.details.len() as u64).to_le_bytes());
        for details in &self.details {
            hasher.update(details.hash());
        }
        hasher.update(self.spender.as_bytes());
        hasher.update(self.sig_deadline.timestamp_millis().to_le_bytes());
        hasher.finalize().into()
    }

    /// The digest the owner signs.
    #[must_use]
    pub fn digest(&self, domain: &PermitDomain) -> [u8; 32] {
        typed_data_digest(&domain.separator(), &self.struct_hash())
    }

    /// Returns `true` if the signature deadline has passed at `now`.
    #[must_use]
    pub fn signature_expired_at(&self, now: DateTime<Utc>) -> bool {
        passed(now, self.sig_deadline)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.details.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }
}

/// Deadline comparison at the millisecond precision the digest signs.
fn passed(now: DateTime<Utc>, deadline: DateTime<Utc>) -> bool {
    now.timestamp_millis() > deadline.timestamp_millis()
}

fn typed_data_digest(domain_separator: &[u8; 32], struct_hash: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(constants::TYPED_DATA_PREFIX);
    hasher.update(domain_separator);
    hasher.update(struct_hash);
    hasher.finalize().into()
}
