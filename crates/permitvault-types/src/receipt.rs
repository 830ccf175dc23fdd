//! Receipt types for the vault audit trail.
//!
//! Every successful deposit or withdrawal produces a [`Receipt`]. Batch
//! operations produce one receipt per element, in input order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Address, Amount, Asset, ReceiptId, constants};

/// The direction of the ledger movement this receipt proves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReceiptKind {
    /// Funds entered custody and were credited.
    Deposit,
    /// Funds were debited and left custody.
    Withdraw,
}

impl std::fmt::Display for ReceiptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deposit => write!(f, "DEPOSIT"),
            Self::Withdraw => write!(f, "WITHDRAW"),
        }
    }
}

/// How the funds moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FundingPath {
    /// Pulled by redeeming a signed permit.
    Permit,
    /// Pulled from a standing allowance.
    StandingAllowance,
    /// Paid out of vault custody.
    Custody,
}

impl std::fmt::Display for FundingPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Permit => write!(f, "PERMIT"),
            Self::StandingAllowance => write!(f, "STANDING_ALLOWANCE"),
            Self::Custody => write!(f, "CUSTODY"),
        }
    }
}

/// Proof that a ledger movement happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: ReceiptId,
    pub kind: ReceiptKind,
    pub path: FundingPath,
    /// The depositor whose ledger entry moved.
    pub depositor: Address,
    pub asset: Asset,
    pub amount: Amount,
    pub issued_at: DateTime<Utc>,
}

impl Receipt {
    #[must_use]
    pub fn deposit(path: FundingPath, depositor: Address, asset: &str, amount: Amount) -> Self {
        Self {
            id: ReceiptId::new(),
            kind: ReceiptKind::Deposit,
            path,
            depositor,
            asset: asset.to_string(),
            amount,
            issued_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn withdraw(depositor: Address, asset: &str, amount: Amount) -> Self {
        Self {
            id: ReceiptId::new(),
            kind: ReceiptKind::Withdraw,
            path: FundingPath::Custody,
            depositor,
            asset: asset.to_string(),
            amount,
            issued_at: Utc::now(),
        }
    }

    /// SHA-256 over every field, for external audit logs.
    #[must_use]
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(constants::RECEIPT_TAG);
        hasher.update(self.id.0.as_bytes());
        hasher.update(self.kind.to_string().as_bytes());
        hasher.update(self.path.to_string().as_bytes());
        hasher.update(self.depositor.as_bytes());
        hasher.update((self.asset.len() as u64).to_le_bytes());
        hasher.update(self.asset.as_bytes());
        hasher.update(self.amount.to_le_bytes());
        hasher.update(self.issued_at.timestamp_millis().to_le_bytes());
        hasher.finalize().into()
    }
}
