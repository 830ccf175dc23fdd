//! End-to-end tests against the reference authority and token bank.
//!
//! These tests run the whole deposit path with real ed25519 signatures:
//! Owner signs permit -> Vault -> `PermitAuthority` (verify, nonce, pull)
//! -> `TokenBank` custody -> Ledger credit.
//!
//! They cover the observable guarantees: exact crediting, replay
//! protection, owner binding, standing-allowance limits, batch
//! all-or-nothing, withdraw isolation, and custody conservation.

use std::sync::Arc;

use chrono::{Duration, Utc};
use permitvault_authority::{PermitAuthority, TokenBank};
use permitvault_types::constants::UNLIMITED_ALLOWANCE;
use permitvault_types::testing::PermitSigner;
use permitvault_types::*;
use permitvault_vault::Vault;

const AUTHORITY: Address = Address([0xa0; 32]);
const VAULT: Address = Address([0xb0; 32]);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Helper: bank + authority + vault wired together.
struct VaultPipeline {
    bank: Arc<TokenBank>,
    authority: Arc<PermitAuthority>,
    vault: Vault<Arc<PermitAuthority>, Arc<TokenBank>>,
}

impl VaultPipeline {
    fn new() -> Self {
        init_tracing();
        let bank = Arc::new(TokenBank::new());
        let authority = Arc::new(
            PermitAuthority::new(AuthorityConfig::new(AUTHORITY), Arc::clone(&bank))
                .expect("authority config should be valid"),
        );
        let vault = Vault::new(
            VaultConfig::new(VAULT),
            Arc::clone(&authority),
            Arc::clone(&bank),
        )
        .expect("vault config should be valid");
        Self {
            bank,
            authority,
            vault,
        }
    }

    /// Mint `amount` to the owner and grant the authority max token allowance.
    fn onboard(&self, owner: &PermitSigner, asset: &str, amount: Amount) {
        let addr = owner.address();
        self.bank.mint(&addr, asset, amount).expect("mint should succeed");
        self.bank
            .approve(&addr, &AUTHORITY, asset, UNLIMITED_ALLOWANCE);
    }

    fn sign(&self, owner: &PermitSigner, permit: &PermitSingle) -> Vec<u8> {
        owner.sign_single(permit, self.authority.domain())
    }

    fn sign_batch(&self, owner: &PermitSigner, permit: &PermitBatch) -> Vec<u8> {
        owner.sign_batch(permit, self.authority.domain())
    }

    fn external(&self, owner: &PermitSigner, asset: &str) -> Amount {
        self.bank.balance_of(&owner.address(), asset)
    }
}

// =============================================================================
// Test: Permit deposit then partial withdraw
// =============================================================================
#[test]
fn e2e_permit_deposit_and_withdraw() {
    let p = VaultPipeline::new();
    let alice = PermitSigner::generate();
    p.onboard(&alice, "USDC", 1_000);

    let permit = PermitSingle::dummy("USDC", 1_000, VAULT);
    let sig = p.sign(&alice, &permit);

    let receipt = p
        .vault
        .deposit(&alice.address(), 1_000, &permit, &sig)
        .expect("deposit should succeed");
    assert_eq!(receipt.amount, 1_000);
    assert_eq!(receipt.path, FundingPath::Permit);

    assert_eq!(p.vault.balance_of(&alice.address(), "USDC"), 1_000);
    assert_eq!(p.external(&alice, "USDC"), 0);
    assert_eq!(p.vault.custody_of("USDC"), 1_000);

    let receipt = p
        .vault
        .withdraw(&alice.address(), "USDC", 1)
        .expect("withdraw should succeed");
    assert_eq!(receipt.kind, ReceiptKind::Withdraw);

    assert_eq!(p.vault.balance_of(&alice.address(), "USDC"), 999);
    assert_eq!(p.external(&alice, "USDC"), 1);
    assert_eq!(p.vault.custody_of("USDC"), 999);
    p.vault.audit("USDC").unwrap();
}

// =============================================================================
// Test: Partial redemption credits exactly the requested amount
// =============================================================================
#[test]
fn e2e_partial_redemption() {
    let p = VaultPipeline::new();
    let alice = PermitSigner::generate();
    p.onboard(&alice, "USDC", 1_000);

    let permit = PermitSingle::dummy("USDC", 800, VAULT);
    let sig = p.sign(&alice, &permit);
    p.vault.deposit(&alice.address(), 250, &permit, &sig).unwrap();

    assert_eq!(p.vault.balance_of(&alice.address(), "USDC"), 250);
    assert_eq!(p.external(&alice, "USDC"), 750);
    // The nonce is spent even though the permit allowed more.
    let err = p
        .vault
        .deposit(&alice.address(), 250, &permit, &sig)
        .unwrap_err();
    assert!(matches!(err, VaultError::NonceReused { .. }));
}

// =============================================================================
// Test: Replaying a permit fails and changes nothing
// =============================================================================
#[test]
fn e2e_replay_rejected() {
    let p = VaultPipeline::new();
    let alice = PermitSigner::generate();
    p.onboard(&alice, "USDC", 1_000);

    let permit = PermitSingle::dummy("USDC", 100, VAULT);
    let sig = p.sign(&alice, &permit);
    p.vault.deposit(&alice.address(), 100, &permit, &sig).unwrap();

    let err = p
        .vault
        .deposit(&alice.address(), 100, &permit, &sig)
        .unwrap_err();
    assert_eq!(
        err,
        VaultError::NonceReused {
            owner: alice.address(),
            asset: "USDC".into(),
            nonce: permit.details.nonce,
        }
    );
    assert_eq!(p.vault.balance_of(&alice.address(), "USDC"), 100);
    assert_eq!(p.external(&alice, "USDC"), 900);
}

// =============================================================================
// Test: A permit signed by X cannot be redeemed as Y
// =============================================================================
#[test]
fn e2e_foreign_signature_rejected() {
    let p = VaultPipeline::new();
    let alice = PermitSigner::generate();
    let mallory = PermitSigner::generate();
    p.onboard(&alice, "USDC", 1_000);
    p.onboard(&mallory, "USDC", 1_000);

    let permit = PermitSingle::dummy("USDC", 500, VAULT);
    let sig = p.sign(&alice, &permit);

    let err = p
        .vault
        .deposit(&mallory.address(), 500, &permit, &sig)
        .unwrap_err();
    assert_eq!(
        err,
        VaultError::InvalidSignature {
            owner: mallory.address()
        }
    );
    assert_eq!(p.external(&mallory, "USDC"), 1_000);
    assert_eq!(p.external(&alice, "USDC"), 1_000);
    assert_eq!(p.vault.custody_of("USDC"), 0);
}

// =============================================================================
// Test: Expired permits and deadlines
// =============================================================================
#[test]
fn e2e_expired_permit_rejected() {
    let p = VaultPipeline::new();
    let alice = PermitSigner::generate();
    p.onboard(&alice, "USDC", 1_000);

    let mut permit = PermitSingle::dummy("USDC", 100, VAULT);
    permit.details.expiration = Utc::now() - Duration::minutes(1);
    let sig = p.sign(&alice, &permit);
    let err = p
        .vault
        .deposit(&alice.address(), 100, &permit, &sig)
        .unwrap_err();
    assert!(matches!(err, VaultError::PermitExpired { .. }));

    let mut permit = PermitSingle::dummy("USDC", 100, VAULT);
    permit.sig_deadline = Utc::now() - Duration::minutes(1);
    let sig = p.sign(&alice, &permit);
    let err = p
        .vault
        .deposit(&alice.address(), 100, &permit, &sig)
        .unwrap_err();
    assert!(matches!(err, VaultError::SignatureExpired { .. }));

    assert_eq!(p.external(&alice, "USDC"), 1_000);
}

// =============================================================================
// Test: Missing token allowance to the authority surfaces as a transfer error
// =============================================================================
#[test]
fn e2e_missing_token_allowance() {
    let p = VaultPipeline::new();
    let alice = PermitSigner::generate();
    p.bank.mint(&alice.address(), "USDC", 1_000).unwrap();

    let permit = PermitSingle::dummy("USDC", 100, VAULT);
    let sig = p.sign(&alice, &permit);
    let err = p
        .vault
        .deposit(&alice.address(), 100, &permit, &sig)
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Transfer);
    assert!(!p
        .authority
        .is_nonce_used(&alice.address(), "USDC", permit.details.nonce));
}

// =============================================================================
// Test: Standing allowance deposits
// =============================================================================
#[test]
fn e2e_standing_allowance_limits() {
    let p = VaultPipeline::new();
    let alice = PermitSigner::generate();
    p.onboard(&alice, "USDC", 1_000);
    p.authority.approve(&alice.address(), "USDC", &VAULT, 300);

    p.vault.deposit_allowed(&alice.address(), 200, "USDC").unwrap();
    assert_eq!(p.vault.balance_of(&alice.address(), "USDC"), 200);

    let err = p
        .vault
        .deposit_allowed(&alice.address(), 101, "USDC")
        .unwrap_err();
    assert_eq!(
        err,
        VaultError::InsufficientAllowance {
            asset: "USDC".into(),
            needed: 101,
            available: 100,
        }
    );

    p.vault.deposit_allowed(&alice.address(), 100, "USDC").unwrap();
    assert_eq!(p.vault.balance_of(&alice.address(), "USDC"), 300);
    assert_eq!(p.external(&alice, "USDC"), 700);
    assert_eq!(p.authority.allowance(&alice.address(), "USDC", &VAULT), 0);
}

#[test]
fn e2e_unlimited_standing_allowance() {
    let p = VaultPipeline::new();
    let alice = PermitSigner::generate();
    p.onboard(&alice, "USDC", 1_000);
    p.authority
        .approve(&alice.address(), "USDC", &VAULT, UNLIMITED_ALLOWANCE);

    for _ in 0..4 {
        p.vault.deposit_allowed(&alice.address(), 250, "USDC").unwrap();
    }
    assert_eq!(p.vault.balance_of(&alice.address(), "USDC"), 1_000);
    assert_eq!(
        p.authority.allowance(&alice.address(), "USDC", &VAULT),
        UNLIMITED_ALLOWANCE
    );
}

// =============================================================================
// Test: Batch permit is all-or-nothing
// =============================================================================
#[test]
fn e2e_batch_permit_all_or_nothing() {
    let p = VaultPipeline::new();
    let alice = PermitSigner::generate();
    p.onboard(&alice, "USDC", 1_000);
    p.onboard(&alice, "WETH", 10);

    // Asset #2 asks for more WETH than Alice holds.
    let bad = PermitBatch::dummy(&[("USDC", 500), ("WETH", 50)], VAULT);
    let sig = p.sign_batch(&alice, &bad);
    let err = p
        .vault
        .deposit_batch(&alice.address(), &[500, 50], &bad, &sig)
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Transfer);
    assert_eq!(p.vault.balance_of(&alice.address(), "USDC"), 0);
    assert_eq!(p.external(&alice, "USDC"), 1_000);
    for d in &bad.details {
        assert!(!p.authority.is_nonce_used(&alice.address(), &d.asset, d.nonce));
    }

    let good = PermitBatch::dummy(&[("USDC", 500), ("WETH", 10)], VAULT);
    let sig = p.sign_batch(&alice, &good);
    let receipts = p
        .vault
        .deposit_batch(&alice.address(), &[400, 10], &good, &sig)
        .unwrap();
    assert_eq!(receipts.len(), 2);
    assert_eq!(p.vault.balance_of(&alice.address(), "USDC"), 400);
    assert_eq!(p.vault.balance_of(&alice.address(), "WETH"), 10);
    assert_eq!(p.external(&alice, "WETH"), 0);
    p.vault.audit_all().unwrap();
}

// =============================================================================
// Test: Batch standing-allowance deposits are all-or-nothing
// =============================================================================
#[test]
fn e2e_batch_allowed_preflight() {
    let p = VaultPipeline::new();
    let alice = PermitSigner::generate();
    p.onboard(&alice, "USDC", 1_000);
    p.onboard(&alice, "WETH", 1_000);
    p.authority.approve(&alice.address(), "USDC", &VAULT, 500);
    p.authority.approve(&alice.address(), "WETH", &VAULT, 50);

    let err = p
        .vault
        .deposit_batch_allowed(&alice.address(), 100, &["USDC", "WETH"])
        .unwrap_err();
    assert!(matches!(err, VaultError::InsufficientAllowance { .. }));
    assert_eq!(p.vault.balance_of(&alice.address(), "USDC"), 0);
    assert_eq!(p.authority.allowance(&alice.address(), "USDC", &VAULT), 500);

    p.vault
        .deposit_batch_allowed(&alice.address(), 50, &["USDC", "WETH"])
        .unwrap();
    assert_eq!(p.vault.balance_of(&alice.address(), "USDC"), 50);
    assert_eq!(p.vault.balance_of(&alice.address(), "WETH"), 50);
}

#[test]
fn e2e_batch_allowed_mid_batch_transfer_failure() {
    let p = VaultPipeline::new();
    let alice = PermitSigner::generate();
    p.onboard(&alice, "USDC", 1_000);
    // Allowance covers WETH but the token balance does not.
    p.onboard(&alice, "WETH", 10);
    p.authority.approve(&alice.address(), "USDC", &VAULT, 500);
    p.authority.approve(&alice.address(), "WETH", &VAULT, 500);

    let err = p
        .vault
        .deposit_batch_allowed(&alice.address(), 100, &["USDC", "WETH"])
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Transfer);
    assert_eq!(p.vault.balance_of(&alice.address(), "USDC"), 0);
    assert_eq!(p.external(&alice, "USDC"), 1_000);
    assert_eq!(p.vault.custody_of("USDC"), 0);
    p.vault.audit_all().unwrap();
}

// =============================================================================
// Test: Withdraw bounds and isolation
// =============================================================================
#[test]
fn e2e_withdraw_isolation() {
    let p = VaultPipeline::new();
    let alice = PermitSigner::generate();
    let bob = PermitSigner::generate();
    p.onboard(&alice, "USDC", 1_000);
    p.onboard(&bob, "USDC", 1_000);
    p.authority.approve(&alice.address(), "USDC", &VAULT, 600);
    p.authority.approve(&bob.address(), "USDC", &VAULT, 400);
    p.vault.deposit_allowed(&alice.address(), 600, "USDC").unwrap();
    p.vault.deposit_allowed(&bob.address(), 400, "USDC").unwrap();

    let err = p
        .vault
        .withdraw(&bob.address(), "USDC", 401)
        .unwrap_err();
    assert!(matches!(
        err,
        VaultError::InsufficientBalance {
            needed: 401,
            available: 400,
            ..
        }
    ));

    p.vault.withdraw(&bob.address(), "USDC", 400).unwrap();
    assert_eq!(p.vault.balance_of(&bob.address(), "USDC"), 0);
    assert_eq!(p.external(&bob, "USDC"), 1_000);
    assert_eq!(p.vault.balance_of(&alice.address(), "USDC"), 600);
    assert_eq!(p.external(&alice, "USDC"), 400);
    assert_eq!(p.vault.custody_of("USDC"), 600);
}

// =============================================================================
// Test: Custody conservation over a mixed sequence
// =============================================================================
#[test]
fn e2e_custody_conservation() {
    let p = VaultPipeline::new();
    let users: Vec<PermitSigner> = (0..4).map(|_| PermitSigner::generate()).collect();
    for u in &users {
        p.onboard(u, "USDC", 10_000);
        p.onboard(u, "WETH", 100);
        p.authority
            .approve(&u.address(), "WETH", &VAULT, UNLIMITED_ALLOWANCE);
    }

    for (i, u) in users.iter().enumerate() {
        let amount = 1_000 * (i as Amount + 1);
        let permit = PermitSingle::dummy("USDC", amount, VAULT);
        let sig = p.sign(u, &permit);
        p.vault.deposit(&u.address(), amount, &permit, &sig).unwrap();
        p.vault.deposit_allowed(&u.address(), 10, "WETH").unwrap();
        p.vault.withdraw(&u.address(), "USDC", 500).unwrap();
    }

    assert_eq!(p.vault.custody_of("USDC"), 10_000 - 2_000);
    assert_eq!(p.vault.custody_of("WETH"), 40);
    p.vault.audit_all().unwrap();

    // Tokens only ever move between owners and custody.
    let held: Amount = users.iter().map(|u| p.external(u, "USDC")).sum();
    assert_eq!(held + p.vault.custody_of("USDC"), p.bank.total_supply("USDC"));
    assert_eq!(p.vault.ledger().total("USDC"), p.vault.custody_of("USDC"));
}
