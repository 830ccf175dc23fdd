//! Error types for the PermitVault deposit ledger.
//!
//! All errors use the `PV_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by category:
//! - 1xx: Authorization errors (signature, spender, nonce, expiry)
//! - 2xx: Allowance errors
//! - 3xx: Ledger balance errors
//! - 4xx: Asset transfer errors
//! - 5xx: Arithmetic errors
//! - 6xx: Input validation errors
//! - 8xx: Invariant errors
//! - 9xx: General / internal errors
//!
//! The allowance authority and the vault share this one enum, so an
//! authority failure reaches the vault's caller unchanged.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{Address, Amount, Asset};

/// Central error enum for all PermitVault operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    // =================================================================
    // Authorization Errors (1xx)
    // =================================================================
    /// The permit signature does not verify for the claimed owner.
    #[error("PV_ERR_100: Invalid permit signature for owner {owner}")]
    InvalidSignature { owner: Address },

    /// The permit names a different spender than the redeeming party.
    #[error("PV_ERR_101: Wrong spender: permit names {actual}, redeemer is {expected}")]
    WrongSpender { expected: Address, actual: Address },

    /// The (owner, asset, nonce) triple was already consumed or invalidated.
    #[error("PV_ERR_102: Nonce {nonce} already used for owner {owner} asset {asset}")]
    NonceReused {
        owner: Address,
        asset: Asset,
        nonce: u64,
    },

    /// The permit's allowance expiration has passed.
    #[error("PV_ERR_103: Permit expired at {expiration}")]
    PermitExpired { expiration: DateTime<Utc> },

    /// The permit's signature deadline has passed.
    #[error("PV_ERR_104: Permit signature deadline passed at {deadline}")]
    SignatureExpired { deadline: DateTime<Utc> },

    /// The requested amount is larger than the permit authorizes.
    #[error("PV_ERR_105: Requested {requested} exceeds permitted {permitted}")]
    AmountExceedsPermit { requested: Amount, permitted: Amount },

    // =================================================================
    // Allowance Errors (2xx)
    // =================================================================
    /// The standing allowance is below the requested amount.
    #[error("PV_ERR_200: Insufficient allowance for {asset}: need {needed}, have {available}")]
    InsufficientAllowance {
        asset: Asset,
        needed: Amount,
        available: Amount,
    },

    // =================================================================
    // Balance Errors (3xx)
    // =================================================================
    /// The depositor's ledger entry is below the requested amount.
    #[error("PV_ERR_300: Insufficient balance for {asset}: need {needed}, have {available}")]
    InsufficientBalance {
        asset: Asset,
        needed: Amount,
        available: Amount,
    },

    // =================================================================
    // Transfer Errors (4xx)
    // =================================================================
    /// The underlying asset movement failed.
    #[error("PV_ERR_400: Transfer failed: {reason}")]
    TransferFailed { reason: String },

    // =================================================================
    // Arithmetic Errors (5xx)
    // =================================================================
    /// An addition would exceed the representable range.
    #[error("PV_ERR_500: Arithmetic overflow: {current} + {amount}")]
    ArithmeticOverflow { current: Amount, amount: Amount },

    // =================================================================
    // Validation Errors (6xx)
    // =================================================================
    /// Amounts must be strictly positive.
    #[error("PV_ERR_600: Amount must be greater than zero")]
    ZeroAmount,

    /// A batch operation was given no elements.
    #[error("PV_ERR_601: Batch is empty")]
    EmptyBatch,

    /// Permit details and requested amounts have different lengths.
    #[error("PV_ERR_602: Batch length mismatch: {details} permit details, {amounts} amounts")]
    BatchLengthMismatch { details: usize, amounts: usize },

    /// The batch exceeds the configured maximum length.
    #[error("PV_ERR_603: Batch too large: {len} elements, max {max}")]
    BatchTooLarge { len: usize, max: usize },

    // =================================================================
    // Invariant Errors (8xx)
    // =================================================================
    /// Ledger totals disagree with recorded flows or actual custody.
    #[error("PV_ERR_800: Custody invariant violation: {reason}")]
    CustodyInvariantViolation { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Configuration error (invalid JSON, missing fields, bad limits).
    #[error("PV_ERR_900: Configuration error: {0}")]
    Configuration(String),

    /// Serialization / deserialization error.
    #[error("PV_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Unrecoverable internal error.
    #[error("PV_ERR_902: Internal error: {0}")]
    Internal(String),
}

/// Failure taxonomy used by callers that only care about the broad class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Authorization,
    Allowance,
    Balance,
    Transfer,
    Arithmetic,
    Validation,
    Invariant,
    Internal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authorization => write!(f, "AUTHORIZATION"),
            Self::Allowance => write!(f, "ALLOWANCE"),
            Self::Balance => write!(f, "BALANCE"),
            Self::Transfer => write!(f, "TRANSFER"),
            Self::Arithmetic => write!(f, "ARITHMETIC"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Invariant => write!(f, "INVARIANT"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

impl VaultError {
    /// The broad failure class of this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidSignature { .. }
            | Self::WrongSpender { .. }
            | Self::NonceReused { .. }
            | Self::PermitExpired { .. }
            | Self::SignatureExpired { .. }
            | Self::AmountExceedsPermit { .. } => ErrorCategory::Authorization,
            Self::InsufficientAllowance { .. } => ErrorCategory::Allowance,
            Self::InsufficientBalance { .. } => ErrorCategory::Balance,
            Self::TransferFailed { .. } => ErrorCategory::Transfer,
            Self::ArithmeticOverflow { .. } => ErrorCategory::Arithmetic,
            Self::ZeroAmount
            | Self::EmptyBatch
            | Self::BatchLengthMismatch { .. }
            | Self::BatchTooLarge { .. } => ErrorCategory::Validation,
            Self::CustodyInvariantViolation { .. } => ErrorCategory::Invariant,
            Self::Configuration(_) | Self::Serialization(_) | Self::Internal(_) => {
                ErrorCategory::Internal
            }
        }
    }

    /// Shorthand for a [`VaultError::TransferFailed`].
    #[must_use]
    pub fn transfer_failed(reason: impl Into<String>) -> Self {
        Self::TransferFailed {
            reason: reason.into(),
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, VaultError>;

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = VaultError::InvalidSignature {
            owner: Address([1u8; 32]),
        };
        let msg = format!("{err}");
        assert!(msg.starts_with("PV_ERR_100"), "Got: {msg}");
    }

    #[test]
    fn insufficient_balance_display() {
        let err = VaultError::InsufficientBalance {
            asset: "USDC".into(),
            needed: 100,
            available: 50,
        };
        let msg = format!("{err}");
        assert!(msg.contains("PV_ERR_300"));
        assert!(msg.contains("USDC"));
        assert!(msg.contains("100"));
        assert!(msg.contains("50"));
    }

    #[test]
    fn categories_follow_taxonomy() {
        let owner = Address([2u8; 32]);
        let cases = [
            (
                VaultError::NonceReused {
                    owner,
                    asset: "A".into(),
                    nonce: 1,
                },
                ErrorCategory::Authorization,
            ),
            (
                VaultError::PermitExpired {
                    expiration: Utc::now(),
                },
                ErrorCategory::Authorization,
            ),
            (
                VaultError::InsufficientAllowance {
                    asset: "A".into(),
                    needed: 2,
                    available: 1,
                },
                ErrorCategory::Allowance,
            ),
            (
                VaultError::InsufficientBalance {
                    asset: "A".into(),
                    needed: 2,
                    available: 1,
                },
                ErrorCategory::Balance,
            ),
            (VaultError::transfer_failed("x"), ErrorCategory::Transfer),
            (
                VaultError::ArithmeticOverflow {
                    current: 1,
                    amount: 2,
                },
                ErrorCategory::Arithmetic,
            ),
            (VaultError::EmptyBatch, ErrorCategory::Validation),
            (
                VaultError::CustodyInvariantViolation { reason: "x".into() },
                ErrorCategory::Invariant,
            ),
            (VaultError::Internal("x".into()), ErrorCategory::Internal),
        ];
        for (err, expected) in cases {
            assert_eq!(err.category(), expected, "{err}");
        }
    }

    #[test]
    fn all_errors_have_pv_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(VaultError::ZeroAmount),
            Box::new(VaultError::EmptyBatch),
            Box::new(VaultError::SignatureExpired {
                deadline: Utc::now(),
            }),
            Box::new(VaultError::Internal("test".into())),
            Box::new(VaultError::BatchLengthMismatch {
                details: 2,
                amounts: 3,
            }),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("PV_ERR_"),
                "Error missing PV_ERR_ prefix: {msg}"
            );
        }
    }

    #[test]
    fn serde_json_error_converts() {
        let err: VaultError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, VaultError::Serialization(_)));
    }
}
