//! Configuration types for vaults and allowance authorities.

use serde::{Deserialize, Serialize};

use crate::{Address, PermitDomain, Result, VaultError, constants};

/// Configuration for a single vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// The vault's identity. Permits must name this address as spender.
    pub address: Address,
    /// Maximum number of elements in one batch deposit.
    #[serde(default = "default_max_batch_len")]
    pub max_batch_len: usize,
}

fn default_max_batch_len() -> usize {
    constants::DEFAULT_MAX_BATCH_LEN
}

impl VaultConfig {
    /// Config with default limits for the vault at `address`.
    #[must_use]
    pub fn new(address: Address) -> Self {
        Self {
            address,
            max_batch_len: constants::DEFAULT_MAX_BATCH_LEN,
        }
    }

    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| VaultError::Configuration(format!("invalid vault config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_batch_len == 0 {
            return Err(VaultError::Configuration(
                "max_batch_len must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration for an allowance authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityConfig {
    /// The authority's own identity (token-level spender, domain anchor).
    pub address: Address,
    /// Typed-data domain name.
    #[serde(default = "default_domain_name")]
    pub domain_name: String,
    /// Chain identifier bound into every digest.
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
}

fn default_domain_name() -> String {
    constants::DEFAULT_DOMAIN_NAME.to_string()
}

fn default_chain_id() -> u64 {
    constants::DEFAULT_CHAIN_ID
}

impl AuthorityConfig {
    /// Config with the default domain for the authority at `address`.
    #[must_use]
    pub fn new(address: Address) -> Self {
        Self {
            address,
            domain_name: default_domain_name(),
            chain_id: constants::DEFAULT_CHAIN_ID,
        }
    }

    /// The typed-data domain permits for this authority are signed under.
    #[must_use]
    pub fn domain(&self) -> PermitDomain {
        PermitDomain {
            name: self.domain_name.clone(),
            chain_id: self.chain_id,
            verifying_authority: self.address,
        }
    }

    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| VaultError::Configuration(format!("invalid authority config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.domain_name.trim().is_empty() {
            return Err(VaultError::Configuration(
                "domain_name must not be empty".into(),
            ));
        }
        Ok(())
    }
}
