//! Tourist ID registry client
//!
//! One method per registry operation. Each call opens a fresh session through
//! the [`SessionFactory`] (so a browser-style wallet may prompt every time) and
//! forwards to it. Nothing is cached between calls.

use crate::config::RegistryConfig;
use crate::contract::{SimulationResult, TouristInfo, WriteCall};
use crate::session::{RegistrySession, SessionFactory};
use crate::wallet::WalletProvider;
use crate::Result;
use alloy::primitives::{Address, TxHash, B256, U256};
use std::sync::Arc;

/// Stateless client for the tourist ID registry contract
#[derive(Clone)]
pub struct TouristRegistry {
    factory: Arc<SessionFactory>,
}

impl TouristRegistry {
    pub fn new(config: RegistryConfig, wallet: Option<Arc<dyn WalletProvider>>) -> Self {
        Self::from_factory(SessionFactory::new(config, wallet))
    }

    pub fn from_factory(factory: SessionFactory) -> Self {
        Self {
            factory: Arc::new(factory),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        self.factory.config()
    }

    async fn session(&self) -> Result<RegistrySession> {
        self.factory.session().await
    }

    /// Issue an identity for `tourist`; returns the confirmed transaction hash
    #[allow(clippy::too_many_arguments)]
    pub async fn issue_tourist_id(
        &self,
        tourist: Address,
        kyc_hash: B256,
        kyc_cid: &str,
        trip_hash: B256,
        trip_cid: &str,
        emergency_hash: B256,
        emergency_cid: &str,
        valid_until: U256,
    ) -> Result<TxHash> {
        self.session()
            .await?
            .issue_tourist_id(
                tourist,
                kyc_hash,
                kyc_cid,
                trip_hash,
                trip_cid,
                emergency_hash,
                emergency_cid,
                valid_until,
            )
            .await
    }

    pub async fn revoke_tourist_id(&self, tourist: Address) -> Result<TxHash> {
        self.session().await?.revoke_tourist_id(tourist).await
    }

    pub async fn get_tourist_info(&self, tourist: Address) -> Result<TouristInfo> {
        self.session().await?.get_tourist_info(tourist).await
    }

    pub async fn is_valid_id(&self, tourist: Address) -> Result<bool> {
        self.session().await?.is_valid_id(tourist).await
    }

    /// Append a location commitment to `tourist`'s log
    pub async fn log_location(&self, tourist: Address, location_hash: B256) -> Result<TxHash> {
        self.session().await?.log_location(tourist, location_hash).await
    }

    pub async fn raise_panic(&self, tourist: Address, panic_hash: B256) -> Result<TxHash> {
        self.session().await?.raise_panic(tourist, panic_hash).await
    }

    pub async fn get_location_at(&self, tourist: Address, index: u64) -> Result<B256> {
        self.session().await?.get_location_at(tourist, index).await
    }

    pub async fn location_count(&self, tourist: Address) -> Result<u64> {
        self.session().await?.location_count(tourist).await
    }

    /// Dispatch a [`WriteCall`] to the matching write operation
    pub async fn execute(&self, call: &WriteCall) -> Result<TxHash> {
        let session = self.session().await?;
        match call {
            WriteCall::IssueTouristId(req) => {
                session
                    .issue_tourist_id(
                        req.tourist,
                        req.kyc_hash,
                        &req.kyc_cid,
                        req.trip_hash,
                        &req.trip_cid,
                        req.emergency_hash,
                        &req.emergency_cid,
                        req.valid_until,
                    )
                    .await
            }
            WriteCall::RevokeTouristId { tourist } => session.revoke_tourist_id(*tourist).await,
            WriteCall::LogLocation {
                tourist,
                location_hash,
            } => session.log_location(*tourist, *location_hash).await,
            WriteCall::RaisePanic {
                tourist,
                panic_hash,
            } => session.raise_panic(*tourist, *panic_hash).await,
        }
    }

    /// Dry-run a write; see [`RegistrySession::simulate`]
    pub async fn simulate(&self, call: &WriteCall) -> Result<SimulationResult> {
        Ok(self.session().await?.simulate(call).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::{CallState, CancelToken, PendingCall};
    use crate::wallet::SigningIdentity;
    use crate::Error;
    use async_trait::async_trait;

    fn registry_without_wallet() -> TouristRegistry {
        // Unroutable endpoint: any RPC attempt would fail with a transport error
        let config = RegistryConfig::new(Address::repeat_byte(0x01), "http://127.0.0.1:1");
        TouristRegistry::new(config, None)
    }

    /// Wallet whose approval prompt is never answered
    struct UnansweredWallet;

    #[async_trait]
    impl WalletProvider for UnansweredWallet {
        async fn signer(&self) -> Result<SigningIdentity> {
            std::future::pending().await
        }
    }

    /// Wallet whose user declines access
    struct DecliningWallet;

    #[async_trait]
    impl WalletProvider for DecliningWallet {
        async fn signer(&self) -> Result<SigningIdentity> {
            Err(Error::Wallet("User rejected the request".to_string()))
        }
    }

    #[tokio::test]
    async fn writes_without_wallet_are_unavailable() {
        let registry = registry_without_wallet();
        let tourist = Address::repeat_byte(0xaa);
        let hash = B256::repeat_byte(0x11);

        let results = [
            registry
                .issue_tourist_id(
                    tourist,
                    hash,
                    "kyc",
                    hash,
                    "trip",
                    hash,
                    "emergency",
                    U256::from(3600u64),
                )
                .await,
            registry.revoke_tourist_id(tourist).await,
            registry.log_location(tourist, hash).await,
            registry.raise_panic(tourist, hash).await,
            registry
                .execute(&WriteCall::RevokeTouristId { tourist })
                .await,
        ];

        for result in results {
            assert!(matches!(result, Err(Error::WalletUnavailable)));
        }
    }

    #[tokio::test]
    async fn reads_without_wallet_are_unavailable() {
        let registry = registry_without_wallet();
        let tourist = Address::repeat_byte(0xaa);

        assert!(matches!(
            registry.get_tourist_info(tourist).await,
            Err(Error::WalletUnavailable)
        ));
        assert!(matches!(
            registry.is_valid_id(tourist).await,
            Err(Error::WalletUnavailable)
        ));
        assert!(matches!(
            registry.get_location_at(tourist, 0).await,
            Err(Error::WalletUnavailable)
        ));
        assert!(matches!(
            registry.location_count(tourist).await,
            Err(Error::WalletUnavailable)
        ));
        assert!(matches!(
            registry
                .simulate(&WriteCall::RevokeTouristId { tourist })
                .await,
            Err(Error::WalletUnavailable)
        ));
    }

    #[tokio::test]
    async fn declined_wallet_propagates() {
        let config = RegistryConfig::new(Address::repeat_byte(0x01), "http://127.0.0.1:1");
        let registry = TouristRegistry::new(config, Some(Arc::new(DecliningWallet)));

        let err = registry
            .revoke_tourist_id(Address::repeat_byte(0xaa))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Wallet(ref msg) if msg.contains("rejected")));
    }

    #[tokio::test]
    async fn cancel_while_awaiting_wallet_approval() {
        let config = RegistryConfig::new(Address::repeat_byte(0x01), "http://127.0.0.1:1");
        let registry = TouristRegistry::new(config, Some(Arc::new(UnansweredWallet)));
        let token = CancelToken::new();

        let mut call = PendingCall::spawn(token.clone(), async move {
            registry
                .log_location(Address::repeat_byte(0xaa), B256::repeat_byte(0x11))
                .await
        });
        assert_eq!(call.state(), CallState::Pending);

        token.cancel();

        assert_eq!(call.settled().await, CallState::Cancelled);
        assert!(matches!(call.wait().await, Err(Error::Cancelled)));
    }
}
