//! # permitvault-authority
//!
//! **Reference Allowance Authority**: the external trust boundary the vault
//! delegates to, implemented in memory so the vault can be exercised
//! end-to-end.
//!
//! ## Architecture
//!
//! 1. **TokenBank**: fungible-token balances, token-level allowances, transfers
//! 2. **NonceBitmap**: unordered single-use nonces per (owner, asset)
//! 3. **StandingAllowances**: signature-free allowances per (owner, asset, spender)
//! 4. **PermitAuthority**: verifies ed25519 permits, burns nonces, pulls funds
//!
//! ## Redemption Flow
//!
//! ```text
//! Vault → PermitAuthority.permit_redeem_and_pull()
//!     → spender / amount / deadline / expiration checks
//!     → ed25519 verify(owner, typed-data digest)
//!     → NonceBitmap.check_unused() → TokenBank.transfer_from() → NonceBitmap.consume()
//! ```
//!
//! A nonce is burned only once its transfer has succeeded.

pub mod authority;
pub mod nonce_bitmap;
pub mod standing;
pub mod token_bank;

pub use authority::PermitAuthority;
pub use nonce_bitmap::NonceBitmap;
pub use standing::StandingAllowances;
pub use token_bank::TokenBank;
