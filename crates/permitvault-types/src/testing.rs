//! Test helpers: key generation, permit signing and dummy permits.
//!
//! Only compiled for tests or with the `test-helpers` feature. **Never use in
//! production.** Real owners sign permits with their own wallets.

use chrono::{Duration, Utc};
use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;

use crate::{Address, Amount, PermitBatch, PermitDetails, PermitDomain, PermitSingle};

/// An owner key that can sign permits.
pub struct PermitSigner {
    signing_key: SigningKey,
}

impl PermitSigner {
    /// Fresh random key.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Deterministic key from a 32-byte seed.
    #[must_use]
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    /// The owner's address (its verifying key).
    #[must_use]
    pub fn address(&self) -> Address {
        Address::from(&self.signing_key.verifying_key())
    }

    #[must_use]
    pub fn sign_single(&self, permit: &PermitSingle, domain: &PermitDomain) -> Vec<u8> {
        self.signing_key
            .sign(&permit.digest(domain))
            .to_bytes()
            .to_vec()
    }

    #[must_use]
    pub fn sign_batch(&self, permit: &PermitBatch, domain: &PermitDomain) -> Vec<u8> {
        self.signing_key
            .sign(&permit.digest(domain))
            .to_bytes()
            .to_vec()
    }
}

impl PermitDetails {
    /// Details with a random nonce, expiring in one hour.
    pub fn dummy(asset: &str, amount: Amount) -> Self {
        Self {
            asset: asset.to_string(),
            amount,
            expiration: Utc::now() + Duration::hours(1),
            nonce: rand::random::<u64>(),
        }
    }
}

impl PermitSingle {
    /// A permit for `spender` with a random nonce, valid for one hour.
    pub fn dummy(asset: &str, amount: Amount, spender: Address) -> Self {
        Self {
            details: PermitDetails::dummy(asset, amount),
            spender,
            sig_deadline: Utc::now() + Duration::hours(1),
        }
    }
}

impl PermitBatch {
    /// A batch permit for `spender`, one random-nonce element per entry.
    pub fn dummy(entries: &[(&str, Amount)], spender: Address) -> Self {
        Self {
            details: entries
                .iter()
                .map(|(asset, amount)| PermitDetails::dummy(asset, *amount))
                .collect(),
            spender,
            sig_deadline: Utc::now() + Duration::hours(1),
        }
    }
}
