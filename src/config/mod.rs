//! Configuration for the tourist ID registry client

pub mod rpc;

use crate::{Error, Result};
use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Registry contract address environment variable name
pub const REGISTRY_ADDRESS_ENV: &str = "TOURIST_REGISTRY_ADDRESS";
/// Chain ID environment variable name
pub const CHAIN_ID_ENV: &str = "TOURIST_CHAIN_ID";
/// Confirmation count environment variable name
pub const CONFIRMATIONS_ENV: &str = "TOURIST_REGISTRY_CONFIRMATIONS";

fn default_confirmations() -> u64 {
    1
}

/// Where the registry contract lives and how writes are confirmed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Deployed registry contract address
    pub contract_address: Address,
    /// JSON-RPC endpoint of the chain the registry is deployed on
    pub rpc_url: String,
    /// Chain ID used when signing. Fetched from the node when absent.
    #[serde(default)]
    pub chain_id: Option<u64>,
    /// Blocks a write must be included in before it counts as confirmed
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,
}

impl RegistryConfig {
    pub fn new(contract_address: Address, rpc_url: impl Into<String>) -> Self {
        Self {
            contract_address,
            rpc_url: rpc_url.into(),
            chain_id: None,
            confirmations: default_confirmations(),
        }
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    /// Set the confirmation depth; clamped to at least one block
    pub fn with_confirmations(mut self, confirmations: u64) -> Self {
        self.confirmations = confirmations.max(1);
        self
    }

    /// Reject settings a session cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.confirmations == 0 {
            return Err(Error::Config(
                "confirmations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Load from environment variables
    ///
    /// `TOURIST_REGISTRY_ADDRESS` is required. The RPC URL is resolved by
    /// [`rpc::resolve_rpc_url`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using `lookup` as the variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let address = lookup(REGISTRY_ADDRESS_ENV).ok_or_else(|| {
            Error::Config(format!(
                "Environment variable {} not set. Required to locate the registry contract.",
                REGISTRY_ADDRESS_ENV
            ))
        })?;
        let contract_address = Address::from_str(address.trim())
            .map_err(|e| Error::Config(format!("Invalid {}: {}", REGISTRY_ADDRESS_ENV, e)))?;

        let chain_id = lookup(CHAIN_ID_ENV)
            .map(|v| {
                v.trim()
                    .parse::<u64>()
                    .map_err(|e| Error::Config(format!("Invalid {}: {}", CHAIN_ID_ENV, e)))
            })
            .transpose()?;

        let confirmations = match lookup(CONFIRMATIONS_ENV) {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .map_err(|e| Error::Config(format!("Invalid {}: {}", CONFIRMATIONS_ENV, e)))?,
            None => default_confirmations(),
        };

        let rpc_url = rpc::resolve_rpc_url(&lookup, chain_id);

        let config = Self {
            contract_address,
            rpc_url,
            chain_id,
            confirmations,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}
