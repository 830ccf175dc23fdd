//! # permitvault-vault
//!
//! **Vault core**: the deposit/withdraw accounting state machine that sits
//! downstream of an external allowance authority.
//!
//! ## Architecture
//!
//! 1. **Ledger**: per-(depositor, asset) balances, sharded for concurrency
//! 2. **Vault**: single-asset deposits (permit / standing allowance) and withdraw
//! 3. **Batch**: multi-asset deposits, all-or-nothing
//! 4. **CustodyAudit**: flow totals checked against the ledger and real custody
//!
//! ## Deposit Flow
//!
//! ```text
//! caller → Vault.deposit*() → input checks
//!     → AllowanceAuthority pull (funds enter custody)
//!     → Ledger.credit() → CustodyAudit.record_deposit() → Receipt
//! ```
//!
//! The ledger is never credited unless the matching pull fully succeeded,
//! and a failed call leaves ledger and custody exactly as they were.

pub mod audit;
pub mod batch;
pub mod ledger;
pub mod vault;

#[cfg(test)]
mod testing;

pub use audit::CustodyAudit;
pub use ledger::Ledger;
pub use vault::Vault;
