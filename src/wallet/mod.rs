//! Wallet providers
//!
//! A wallet provider is injected into the session factory. It is the only source
//! of signing identities; the client never reaches for an ambient wallet.

mod signer;

pub use signer::SecureWallet;

use crate::Result;
use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use async_trait::async_trait;

/// Capability to hand out a signing identity
///
/// Implementations may suspend indefinitely, e.g. while a user approves
/// account access in an external wallet. A refusal should surface as
/// [`crate::Error::Wallet`].
#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn signer(&self) -> Result<SigningIdentity>;
}

/// Signer plus the address it signs for
#[derive(Clone)]
pub struct SigningIdentity {
    address: Address,
    wallet: EthereumWallet,
}

impl SigningIdentity {
    pub fn new(address: Address, wallet: EthereumWallet) -> Self {
        Self { address, wallet }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn wallet(&self) -> &EthereumWallet {
        &self.wallet
    }
}

impl std::fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
