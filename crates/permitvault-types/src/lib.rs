//! # permitvault-types
//!
//! Shared types, errors, and configuration for the **PermitVault** deposit
//! ledger.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`Address`], [`ReceiptId`]
//! - **Balance model**: [`Asset`], [`Amount`]
//! - **Permit model**: [`PermitDetails`], [`PermitSingle`], [`PermitBatch`], [`PermitDomain`]
//! - **Receipt model**: [`Receipt`], [`ReceiptKind`], [`FundingPath`]
//! - **Configuration**: [`VaultConfig`], [`AuthorityConfig`]
//! - **Errors**: [`VaultError`] with `PV_ERR_` prefix codes, grouped by [`ErrorCategory`]
//! - **Interfaces**: [`AllowanceAuthority`], [`AssetCustody`]
//! - **Constants**: system-wide limits and digest tags

pub mod authority;
pub mod balance;
pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod permit;
pub mod receipt;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

// Re-export all primary types at crate root for ergonomic imports:
//   use permitvault_types::{Address, PermitSingle, VaultError, ...};

pub use authority::*;
pub use balance::*;
pub use config::*;
pub use error::*;
pub use ids::*;
pub use permit::*;
pub use receipt::*;

// Constants are accessed via `permitvault_types::constants::FOO`
// (not re-exported to avoid name collisions).
