//! System-wide constants for the PermitVault deposit ledger.

use crate::Amount;

/// Default maximum number of elements accepted in one batch deposit.
pub const DEFAULT_MAX_BATCH_LEN: usize = 64;

/// Default typed-data domain name.
pub const DEFAULT_DOMAIN_NAME: &str = "PermitVault";

/// Default chain identifier bound into the typed-data domain.
pub const DEFAULT_CHAIN_ID: u64 = 1;

/// A standing allowance of this size is unlimited and never decremented.
pub const UNLIMITED_ALLOWANCE: Amount = Amount::MAX;

/// Bits per nonce bitmap word.
pub const NONCE_WORD_BITS: u64 = 256;

/// Prefix of every typed-data digest (`0x19 0x01`, as in EIP-712).
pub const TYPED_DATA_PREFIX: [u8; 2] = [0x19, 0x01];

/// Tag hashed into the domain separator.
pub const DOMAIN_TAG: &[u8] = b"permitvault:domain:v1:";

/// Tag hashed into every [`PermitDetails`](crate::PermitDetails) hash.
pub const DETAILS_TAG: &[u8] = b"permitvault:permit_details:v1:";

/// Tag hashed into every [`PermitSingle`](crate::PermitSingle) struct hash.
pub const PERMIT_SINGLE_TAG: &[u8] = b"permitvault:permit_single:v1:";

/// Tag hashed into every [`PermitBatch`](crate::PermitBatch) struct hash.
pub const PERMIT_BATCH_TAG: &[u8] = b"permitvault:permit_batch:v1:";

/// Tag hashed into receipt digests.
pub const RECEIPT_TAG: &[u8] = b"permitvault:receipt:v1:";
