//! Contract sessions
//!
//! [`SessionFactory`] turns an injected wallet provider plus configuration into a
//! [`RegistrySession`]: a registry contract handle whose writes are signed by the
//! wallet. Sessions hold no state of their own; every call goes to the chain.
//!
//! Writes block until the transaction reaches the configured number of
//! confirmations. A transaction mined with a failed status is an error. There
//! is no timeout and no retry. Every failure (wallet, transport, contract
//! revert) is returned to the caller unchanged.

use crate::config::RegistryConfig;
use crate::contract::{
    revert_reason, to_u64, SimulationResult, TouristIDRegistryV2, TouristInfo, WriteCall,
};
use crate::wallet::WalletProvider;
use crate::{Error, Result};
use alloy::contract::SolCallBuilder;
use alloy::network::{Ethereum, ReceiptResponse};
use alloy::primitives::{Address, TxHash, B256, U256};
use alloy::providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder};
use alloy::sol_types::SolCall;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Registry contract instance over a type-erased provider
pub type RegistryContract = TouristIDRegistryV2::TouristIDRegistryV2Instance<DynProvider>;

/// Builds sessions bound to the caller's wallet
pub struct SessionFactory {
    config: RegistryConfig,
    wallet: Option<Arc<dyn WalletProvider>>,
}

impl SessionFactory {
    /// Create a factory
    ///
    /// `wallet` is `None` when no wallet is present in the environment; every
    /// session request then fails with [`Error::WalletUnavailable`].
    pub fn new(config: RegistryConfig, wallet: Option<Arc<dyn WalletProvider>>) -> Self {
        Self { config, wallet }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn has_wallet(&self) -> bool {
        self.wallet.is_some()
    }

    /// Acquire a signer and attach to the registry contract
    ///
    /// May suspend while the wallet provider waits for user approval.
    pub async fn session(&self) -> Result<RegistrySession> {
        let wallet = self.wallet.as_ref().ok_or(Error::WalletUnavailable)?;
        self.config.validate()?;
        let identity = wallet.signer().await?;

        let url: url::Url = self
            .config
            .rpc_url
            .parse()
            .map_err(|e| Error::Config(format!("Invalid RPC URL: {}", e)))?;

        let builder = ProviderBuilder::new().wallet(identity.wallet().clone());
        let provider = match self.config.chain_id {
            Some(chain_id) => builder.with_chain_id(chain_id).connect_http(url).erased(),
            None => builder.connect_http(url).erased(),
        };

        debug!(
            contract = %self.config.contract_address,
            signer = %identity.address(),
            "Registry session opened"
        );

        Ok(RegistrySession::new(
            self.config.contract_address,
            provider,
            identity.address(),
            self.config.confirmations,
        ))
    }
}

/// A registry contract handle bound to one signer
#[derive(Clone)]
pub struct RegistrySession {
    contract: RegistryContract,
    signer: Address,
    confirmations: u64,
}

impl RegistrySession {
    /// Attach to `address` through an already-built provider
    ///
    /// The provider must sign for `signer` if writes are going to be sent.
    pub fn new(address: Address, provider: DynProvider, signer: Address, confirmations: u64) -> Self {
        Self {
            contract: TouristIDRegistryV2::new(address, provider),
            signer,
            confirmations,
        }
    }

    /// Registry contract address
    pub fn address(&self) -> Address {
        *self.contract.address()
    }

    /// Address writes are signed by
    pub fn signer(&self) -> Address {
        self.signer
    }

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
        let call = self.contract.issueTouristID(
            tourist,
            kyc_hash,
            kyc_cid.to_string(),
            trip_hash,
            trip_cid.to_string(),
            emergency_hash,
            emergency_cid.to_string(),
            valid_until,
        );
        self.submit("issueTouristID", call).await
    }

    pub async fn revoke_tourist_id(&self, tourist: Address) -> Result<TxHash> {
        let call = self.contract.revokeTouristID(tourist);
        self.submit("revokeTouristID", call).await
    }

    pub async fn log_location(&self, tourist: Address, location_hash: B256) -> Result<TxHash> {
        let call = self.contract.logLocation(tourist, location_hash);
        self.submit("logLocation", call).await
    }

    pub async fn raise_panic(&self, tourist: Address, panic_hash: B256) -> Result<TxHash> {
        let call = self.contract.raisePanic(tourist, panic_hash);
        self.submit("raisePanic", call).await
    }

    pub async fn get_tourist_info(&self, tourist: Address) -> Result<TouristInfo> {
        debug!(%tourist, "getTouristInfo");
        let info = self.contract.getTouristInfo(tourist).call().await?;
        Ok(TouristInfo::from(info))
    }

    /// Whether the registry considers `tourist`'s identity valid
    ///
    /// The predicate is the contract's; the answer is passed through untouched.
    pub async fn is_valid_id(&self, tourist: Address) -> Result<bool> {
        debug!(%tourist, "isValidID");
        Ok(self.contract.isValidID(tourist).call().await?)
    }

    pub async fn get_location_at(&self, tourist: Address, index: u64) -> Result<B256> {
        debug!(%tourist, index, "getLocationAt");
        Ok(self
            .contract
            .getLocationAt(tourist, U256::from(index))
            .call()
            .await?)
    }

    pub async fn location_count(&self, tourist: Address) -> Result<u64> {
        debug!(%tourist, "locationCount");
        let count = self.contract.locationCount(tourist).call().await?;
        Ok(to_u64(count))
    }

    /// Dry-run a write from the signer's address
    ///
    /// Never signs or broadcasts. A revert is reported in the result rather
    /// than as an error.
    pub async fn simulate(&self, call: &WriteCall) -> SimulationResult {
        match call {
            WriteCall::IssueTouristId(req) => {
                self.simulate_call(self.contract.issueTouristID(
                    req.tourist,
                    req.kyc_hash,
                    req.kyc_cid.clone(),
                    req.trip_hash,
                    req.trip_cid.clone(),
                    req.emergency_hash,
                    req.emergency_cid.clone(),
                    req.valid_until,
                ))
                .await
            }
            WriteCall::RevokeTouristId { tourist } => {
                self.simulate_call(self.contract.revokeTouristID(*tourist))
                    .await
            }
            WriteCall::LogLocation {
                tourist,
                location_hash,
            } => {
                self.simulate_call(self.contract.logLocation(*tourist, *location_hash))
                    .await
            }
            WriteCall::RaisePanic {
                tourist,
                panic_hash,
            } => {
                self.simulate_call(self.contract.raisePanic(*tourist, *panic_hash))
                    .await
            }
        }
    }

    /// Send a write and wait for confirmation
    async fn submit<C>(
        &self,
        operation: &'static str,
        call: SolCallBuilder<&DynProvider, C>,
    ) -> Result<TxHash>
    where
        C: SolCall + Send + Sync + Unpin,
    {
        debug!(operation, contract = %self.address(), signer = %self.signer, "Submitting transaction");
        let pending = call.send().await?;
        self.confirm(operation, pending).await
    }

    async fn confirm(
        &self,
        operation: &'static str,
        pending: PendingTransactionBuilder<Ethereum>,
    ) -> Result<TxHash> {
        debug!(
            operation,
            tx_hash = %pending.tx_hash(),
            confirmations = self.confirmations,
            "Awaiting confirmation"
        );
        let receipt = pending
            .with_required_confirmations(self.confirmations)
            .get_receipt()
            .await?;
        let tx_hash = receipt.transaction_hash();
        if !receipt.status() {
            warn!(operation, %tx_hash, "Transaction reverted on-chain");
            return Err(Error::Reverted(tx_hash));
        }
        info!(operation, %tx_hash, "Transaction confirmed");
        Ok(tx_hash)
    }

    async fn simulate_call<C>(
        &self,
        call: SolCallBuilder<&DynProvider, C>,
    ) -> SimulationResult
    where
        C: SolCall + Send + Sync + Unpin,
    {
        let call = call.from(self.signer);
        match call.call().await {
            Ok(_) => SimulationResult::success(call.estimate_gas().await.ok()),
            Err(e) => SimulationResult::failed(revert_reason(&e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::hex;
    use alloy::rpc::json_rpc::ErrorPayload;
    use alloy::sol_types::{Revert, SolError, SolValue};
    use alloy::transports::mock::Asserter;
    use serde_json::json;

    fn tourist() -> Address {
        Address::repeat_byte(0xaa)
    }

    fn mocked_session(asserter: &Asserter) -> RegistrySession {
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .connect_mocked_client(asserter.clone())
            .erased();
        RegistrySession::new(
            Address::repeat_byte(0x01),
            provider,
            Address::repeat_byte(0x02),
            1,
        )
    }

    fn push_return(asserter: &Asserter, data: Vec<u8>) {
        asserter.push_success(&alloy::primitives::Bytes::from(data));
    }

    fn receipt(tx_hash: TxHash, success: bool) -> serde_json::Value {
        json!({
            "type": "0x2",
            "status": if success { "0x1" } else { "0x0" },
            "cumulativeGasUsed": "0xb9e0",
            "logs": [],
            "logsBloom": format!("0x{}", "0".repeat(512)),
            "transactionHash": tx_hash,
            "transactionIndex": "0x0",
            "blockHash": B256::repeat_byte(0xbb),
            "blockNumber": "0x10",
            "gasUsed": "0xb9e0",
            "effectiveGasPrice": "0x3b9aca00",
            "from": Address::repeat_byte(0x02),
            "to": Address::repeat_byte(0x01),
            "contractAddress": null
        })
    }

    /// Queue `eth_sendTransaction` and the receipt lookups that confirm it
    fn push_mined(asserter: &Asserter, tx_hash: TxHash, success: bool) {
        asserter.push_success(&tx_hash);
        // once when registering the watch, once when fetching the receipt
        asserter.push_success(&receipt(tx_hash, success));
        asserter.push_success(&receipt(tx_hash, success));
    }

    #[tokio::test]
    async fn get_tourist_info_maps_tuple_positions() {
        let asserter = Asserter::new();
        let session = mocked_session(&asserter);
        let valid_until = 1_700_003_600u64;
        push_return(
            &asserter,
            (
                B256::repeat_byte(0x11),
                "bafykyc".to_string(),
                B256::repeat_byte(0x22),
                "bafytrip".to_string(),
                B256::repeat_byte(0x33),
                "bafyemergency".to_string(),
                U256::from(valid_until),
                true,
            )
                .abi_encode_params(),
        );

        let info = session.get_tourist_info(tourist()).await.unwrap();

        assert_eq!(info.kyc_hash, B256::repeat_byte(0x11));
        assert_eq!(info.kyc_cid, "bafykyc");
        assert_eq!(info.trip_hash, B256::repeat_byte(0x22));
        assert_eq!(info.trip_cid, "bafytrip");
        assert_eq!(info.emergency_hash, B256::repeat_byte(0x33));
        assert_eq!(info.emergency_cid, "bafyemergency");
        assert_eq!(info.valid_until, valid_until);
        assert!(info.exists);
    }

    #[tokio::test]
    async fn never_issued_address_reads_empty() {
        let asserter = Asserter::new();
        let session = mocked_session(&asserter);
        push_return(
            &asserter,
            (
                B256::ZERO,
                String::new(),
                B256::ZERO,
                String::new(),
                B256::ZERO,
                String::new(),
                U256::ZERO,
                false,
            )
                .abi_encode_params(),
        );
        push_return(&asserter, false.abi_encode());

        let info = session.get_tourist_info(tourist()).await.unwrap();
        assert!(!info.exists);
        assert_eq!(info.valid_until, 0);
        assert!(info.kyc_cid.is_empty());

        assert!(!session.is_valid_id(tourist()).await.unwrap());
    }

    #[tokio::test]
    async fn is_valid_id_passes_contract_answer_through() {
        let asserter = Asserter::new();
        let session = mocked_session(&asserter);
        push_return(&asserter, true.abi_encode());
        push_return(&asserter, false.abi_encode());

        assert!(session.is_valid_id(tourist()).await.unwrap());
        assert!(!session.is_valid_id(tourist()).await.unwrap());
    }

    #[tokio::test]
    async fn location_reads() {
        let asserter = Asserter::new();
        let session = mocked_session(&asserter);
        push_return(&asserter, U256::from(3u64).abi_encode());
        push_return(&asserter, B256::repeat_byte(0x44).abi_encode());

        assert_eq!(session.location_count(tourist()).await.unwrap(), 3);
        assert_eq!(
            session.get_location_at(tourist(), 2).await.unwrap(),
            B256::repeat_byte(0x44)
        );
    }

    #[tokio::test]
    async fn location_count_saturates() {
        let asserter = Asserter::new();
        let session = mocked_session(&asserter);
        push_return(&asserter, U256::MAX.abi_encode());

        assert_eq!(session.location_count(tourist()).await.unwrap(), u64::MAX);
    }

    #[tokio::test]
    async fn read_failure_propagates_unchanged() {
        let asserter = Asserter::new();
        let session = mocked_session(&asserter);
        asserter.push_failure_msg("execution reverted: index out of bounds");

        let err = session.get_location_at(tourist(), 9).await.unwrap_err();

        assert!(matches!(err, Error::Contract(_)));
        assert!(err.to_string().contains("index out of bounds"));
    }

    #[tokio::test]
    async fn simulate_reports_revert() {
        let asserter = Asserter::new();
        let session = mocked_session(&asserter);
        asserter.push_failure_msg("execution reverted: revert: Not authorized\"");

        let result = session
            .simulate(&WriteCall::RevokeTouristId { tourist: tourist() })
            .await;

        assert!(!result.success);
        assert_eq!(result.revert_reason.as_deref(), Some("Not authorized"));
    }

    #[tokio::test]
    async fn simulate_success_estimates_gas() {
        let asserter = Asserter::new();
        let session = mocked_session(&asserter);
        push_return(&asserter, Vec::new());
        asserter.push_success(&U256::from(48_000u64));

        let result = session
            .simulate(&WriteCall::LogLocation {
                tourist: tourist(),
                location_hash: B256::repeat_byte(0x55),
            })
            .await;

        assert!(result.success);
        assert_eq!(result.gas_estimate, Some(48_000));
    }

    #[tokio::test]
    async fn writes_return_confirmed_tx_hash() {
        let asserter = Asserter::new();
        let session = mocked_session(&asserter);
        let hash = B256::repeat_byte(0x11);

        let issued = TxHash::repeat_byte(0x71);
        push_mined(&asserter, issued, true);
        let tx = session
            .issue_tourist_id(
                tourist(),
                hash,
                "bafykyc",
                hash,
                "bafytrip",
                hash,
                "bafyemergency",
                U256::from(1_700_003_600u64),
            )
            .await
            .unwrap();
        assert_eq!(tx, issued);

        let logged = TxHash::repeat_byte(0x72);
        push_mined(&asserter, logged, true);
        assert_eq!(session.log_location(tourist(), hash).await.unwrap(), logged);

        let panicked = TxHash::repeat_byte(0x73);
        push_mined(&asserter, panicked, true);
        assert_eq!(session.raise_panic(tourist(), hash).await.unwrap(), panicked);

        let revoked = TxHash::repeat_byte(0x74);
        push_mined(&asserter, revoked, true);
        assert_eq!(session.revoke_tourist_id(tourist()).await.unwrap(), revoked);
    }

    #[tokio::test]
    async fn reverted_receipt_is_an_error() {
        let asserter = Asserter::new();
        let session = mocked_session(&asserter);
        let tx_hash = TxHash::repeat_byte(0x77);
        push_mined(&asserter, tx_hash, false);

        let err = session.revoke_tourist_id(tourist()).await.unwrap_err();

        assert!(matches!(err, Error::Reverted(h) if h == tx_hash));
    }

    #[tokio::test]
    async fn rejected_send_propagates_unchanged() {
        let asserter = Asserter::new();
        let session = mocked_session(&asserter);
        asserter.push_failure_msg("execution reverted: Tourist ID already exists");

        let err = session
            .log_location(tourist(), B256::repeat_byte(0x11))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Contract(_)));
        assert!(err.to_string().contains("Tourist ID already exists"));
    }

    #[tokio::test]
    async fn simulate_decodes_revert_data_from_error_response() {
        let asserter = Asserter::new();
        let session = mocked_session(&asserter);
        let data = Revert {
            reason: "Tourist ID already exists".to_string(),
        }
        .abi_encode();
        let payload: ErrorPayload = serde_json::from_value(json!({
            "code": 3,
            "message": "execution reverted: Tourist ID already exists",
            "data": hex::encode_prefixed(data)
        }))
        .unwrap();
        asserter.push_failure(payload);

        let result = session
            .simulate(&WriteCall::RevokeTouristId { tourist: tourist() })
            .await;

        assert!(!result.success);
        assert_eq!(
            result.revert_reason.as_deref(),
            Some("Tourist ID already exists")
        );
    }

    #[tokio::test]
    async fn factory_without_wallet_is_unavailable() {
        let config = RegistryConfig::new(Address::repeat_byte(0x01), "http://127.0.0.1:1");
        let factory = SessionFactory::new(config, None);

        assert!(!factory.has_wallet());
        assert!(matches!(
            factory.session().await,
            Err(Error::WalletUnavailable)
        ));
    }

    #[tokio::test]
    async fn factory_rejects_bad_rpc_url() {
        let wallet = crate::wallet::SecureWallet::from_hex(
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        )
        .unwrap();
        let config = RegistryConfig::new(Address::repeat_byte(0x01), "not a url");
        let factory = SessionFactory::new(config, Some(Arc::new(wallet)));

        assert!(matches!(factory.session().await, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn factory_binds_signer_and_contract() {
        let wallet = crate::wallet::SecureWallet::from_hex(
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        )
        .unwrap();
        let expected = wallet.address();
        let config = RegistryConfig::new(Address::repeat_byte(0x01), "http://127.0.0.1:8545")
            .with_chain_id(31337);
        let factory = SessionFactory::new(config, Some(Arc::new(wallet)));

        let session = factory.session().await.unwrap();

        assert_eq!(session.signer(), expected);
        assert_eq!(session.address(), Address::repeat_byte(0x01));
    }
}
