//! Unordered single-use nonces.
//!
//! Nonces are tracked per (owner, asset) in 256-bit words: the high bits of
//! a nonce select the word, the low 8 bits select the bit. Owners may pick
//! any unused nonce, so independent permits can be redeemed in any order.
//!
//! Bits only ever go from 0 to 1. Once a nonce is set it can never
//! authorize another pull, whether it was consumed by a redemption or
//! burned through [`NonceBitmap::invalidate`].

use std::collections::HashMap;

use permitvault_types::{Address, Asset, Result, VaultError, constants};

/// A 256-bit word stored as two `u128` halves (low, high).
pub type NonceWord = [u128; 2];

/// Split a nonce into (word index, half, bit within half).
fn position(nonce: u64) -> (u64, usize, u32) {
    let word = nonce / constants::NONCE_WORD_BITS;
    let bit = (nonce % constants::NONCE_WORD_BITS) as u32;
    (word, (bit / 128) as usize, bit % 128)
}

/// Used-nonce bitmap keyed by (owner, asset, word index).
#[derive(Debug, Default)]
pub struct NonceBitmap {
    words: HashMap<(Address, Asset, u64), NonceWord>,
}

impl NonceBitmap {
    /// Create an empty bitmap.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `nonce` is already used for (owner, asset).
    #[must_use]
    pub fn is_used(&self, owner: &Address, asset: &str, nonce: u64) -> bool {
        let (word, half, bit) = position(nonce);
        self.words
            .get(&(*owner, asset.to_string(), word))
            .is_some_and(|w| w[half] & (1u128 << bit) != 0)
    }

    /// Fail with `NonceReused` if `nonce` is already used.
    pub fn check_unused(&self, owner: &Address, asset: &str, nonce: u64) -> Result<()> {
        if self.is_used(owner, asset, nonce) {
            return Err(VaultError::NonceReused {
                owner: *owner,
                asset: asset.to_string(),
                nonce,
            });
        }
        Ok(())
    }

    /// Mark `nonce` used.
    ///
    /// # Errors
    /// Returns `NonceReused` if it already was.
    pub fn consume(&mut self, owner: &Address, asset: &str, nonce: u64) -> Result<()> {
        self.check_unused(owner, asset, nonce)?;
        let (word, half, bit) = position(nonce);
        let entry = self
            .words
            .entry((*owner, asset.to_string(), word))
            .or_insert([0, 0]);
        entry[half] |= 1u128 << bit;
        Ok(())
    }

    /// Burn every nonce whose bit is set in `mask` within `word`.
    pub fn invalidate(&mut self, owner: &Address, asset: &str, word: u64, mask: NonceWord) {
        if mask == [0, 0] {
            return;
        }
        let entry = self
            .words
            .entry((*owner, asset.to_string(), word))
            .or_insert([0, 0]);
        entry[0] |= mask[0];
        entry[1] |= mask[1];
    }
}
