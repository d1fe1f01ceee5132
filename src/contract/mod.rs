//! Registry contract bindings
//!
//! The registry is deployed elsewhere and treated as an opaque service: issuance
//! rules, revocation, validity windows and access control all live on chain.
//! This module only describes its interface and shapes what comes back.

mod simulator;

pub use simulator::{IssueRequest, SimulationResult, WriteCall};
pub(crate) use simulator::revert_reason;

use alloy::primitives::{B256, U256};
use alloy::sol;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

sol! {
    #[sol(rpc)]
    #[derive(Debug)]
    interface TouristIDRegistryV2 {
        function issueTouristID(
            address tourist,
            bytes32 kycHash,
            string kycCID,
            bytes32 tripHash,
            string tripCID,
            bytes32 emergencyHash,
            string emergencyCID,
            uint256 validUntil
        ) external;

        function revokeTouristID(address tourist) external;

        function getTouristInfo(address tourist) external view returns (
            bytes32 kycHash,
            string kycCID,
            bytes32 tripHash,
            string tripCID,
            bytes32 emergencyHash,
            string emergencyCID,
            uint256 validUntil,
            bool exists
        );

        function isValidID(address tourist) external view returns (bool);

        function logLocation(address tourist, bytes32 locationHash) external;

        function raisePanic(address tourist, bytes32 panicHash) external;

        function getLocationAt(address tourist, uint256 index) external view returns (bytes32);

        function locationCount(address tourist) external view returns (uint256);
    }
}

/// Tourist identity record as stored by the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TouristInfo {
    pub kyc_hash: B256,
    #[serde(rename = "kycCID")]
    pub kyc_cid: String,
    pub trip_hash: B256,
    #[serde(rename = "tripCID")]
    pub trip_cid: String,
    pub emergency_hash: B256,
    #[serde(rename = "emergencyCID")]
    pub emergency_cid: String,
    /// Unix timestamp (seconds)
    pub valid_until: u64,
    pub exists: bool,
}

impl TouristInfo {
    /// `valid_until` as a UTC datetime, `None` if out of chrono's range
    pub fn valid_until_utc(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.valid_until)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

impl From<TouristIDRegistryV2::getTouristInfoReturn> for TouristInfo {
    fn from(info: TouristIDRegistryV2::getTouristInfoReturn) -> Self {
        Self {
            kyc_hash: info.kycHash,
            kyc_cid: info.kycCID,
            trip_hash: info.tripHash,
            trip_cid: info.tripCID,
            emergency_hash: info.emergencyHash,
            emergency_cid: info.emergencyCID,
            valid_until: to_u64(info.validUntil),
            exists: info.exists,
        }
    }
}

/// Narrow a `uint256` to `u64`, saturating at `u64::MAX`
pub(crate) fn to_u64(value: U256) -> u64 {
    value.saturating_to::<u64>()
}
