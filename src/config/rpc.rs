//! RPC endpoint resolution
//!
//! The registry client talks to a single chain, so resolution produces one URL.
//! Sources are checked in order, following Ethereum ecosystem conventions:
//! 1. `TOURIST_RPC_URL` - explicit endpoint for the registry chain
//! 2. `ETH_RPC_URL` - the conventional Foundry/Hardhat variable
//! 3. Provider API keys (`ALCHEMY_API_KEY`, `INFURA_API_KEY`) - requires a known chain ID
//! 4. A local development node at `http://127.0.0.1:8545`
//!
//! # Examples
//!
//! ```bash
//! # Option 1: Explicit URL (recommended)
//! export TOURIST_RPC_URL="https://polygon-amoy.g.alchemy.com/v2/YOUR_KEY"
//!
//! # Option 2: Provider API key plus chain ID
//! export TOURIST_CHAIN_ID=80002
//! export ALCHEMY_API_KEY="YOUR_KEY"
//!
//! # Option 3: No env vars - uses a local anvil/hardhat node
//! ```

/// Chain ID constants
pub mod chains {
    pub const ETHEREUM: u64 = 1;
    pub const SEPOLIA: u64 = 11155111;
    pub const POLYGON: u64 = 137;
    pub const POLYGON_AMOY: u64 = 80002;
    pub const ARBITRUM: u64 = 42161;
    pub const OPTIMISM: u64 = 10;
    pub const BASE: u64 = 8453;
}

/// Environment variable names
pub(crate) mod env_vars {
    pub const TOURIST_RPC_URL: &str = "TOURIST_RPC_URL";
    pub const ETH_RPC_URL: &str = "ETH_RPC_URL";
    pub const ALCHEMY_API_KEY: &str = "ALCHEMY_API_KEY";
    pub const INFURA_API_KEY: &str = "INFURA_API_KEY";
}

/// Local development node (anvil, hardhat)
pub const LOCAL_RPC_URL: &str = "http://127.0.0.1:8545";

/// Resolve the RPC URL using `lookup` as the variable source
pub fn resolve_rpc_url<F>(lookup: F, chain_id: Option<u64>) -> String
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(env_vars::TOURIST_RPC_URL) {
        tracing::debug!("Using TOURIST_RPC_URL");
        return url;
    }
    if let Some(url) = lookup(env_vars::ETH_RPC_URL) {
        tracing::debug!("Using ETH_RPC_URL");
        return url;
    }

    if let Some(chain_id) = chain_id {
        if let Some(key) = lookup(env_vars::ALCHEMY_API_KEY) {
            if let Some(url) = alchemy_url(chain_id, &key) {
                tracing::info!(chain_id, "Building RPC URL from ALCHEMY_API_KEY");
                return url;
            }
        }
        if let Some(key) = lookup(env_vars::INFURA_API_KEY) {
            if let Some(url) = infura_url(chain_id, &key) {
                tracing::info!(chain_id, "Building RPC URL from INFURA_API_KEY");
                return url;
            }
        }
    }

    tracing::warn!("No RPC configured, using local node at {}", LOCAL_RPC_URL);
    LOCAL_RPC_URL.to_string()
}

fn alchemy_url(chain_id: u64, key: &str) -> Option<String> {
    let network = match chain_id {
        chains::ETHEREUM => "eth-mainnet",
        chains::SEPOLIA => "eth-sepolia",
        chains::POLYGON => "polygon-mainnet",
        chains::POLYGON_AMOY => "polygon-amoy",
        chains::ARBITRUM => "arb-mainnet",
        chains::OPTIMISM => "opt-mainnet",
        chains::BASE => "base-mainnet",
        _ => return None,
    };
    Some(format!("https://{}.g.alchemy.com/v2/{}", network, key))
}

fn infura_url(chain_id: u64, key: &str) -> Option<String> {
    let network = match chain_id {
        chains::ETHEREUM => "mainnet",
        chains::SEPOLIA => "sepolia",
        chains::POLYGON => "polygon-mainnet",
        chains::POLYGON_AMOY => "polygon-amoy",
        chains::ARBITRUM => "arbitrum-mainnet",
        chains::OPTIMISM => "optimism-mainnet",
        // Infura doesn't support Base
        _ => return None,
    };
    Some(format!("https://{}.infura.io/v3/{}", network, key))
}
