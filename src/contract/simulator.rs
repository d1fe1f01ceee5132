//! Write simulation via `eth_call`
//!
//! Runs a registry write against current chain state without signing or
//! submitting it, so a caller can see whether the contract would reject it.

use alloy::hex;
use alloy::primitives::{Address, B256, U256};
use alloy::sol_types::{decode_revert_reason, Revert, SolError};
use serde::{Deserialize, Serialize};

/// Arguments of `issueTouristID`, in contract order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRequest {
    pub tourist: Address,
    pub kyc_hash: B256,
    pub kyc_cid: String,
    pub trip_hash: B256,
    pub trip_cid: String,
    pub emergency_hash: B256,
    pub emergency_cid: String,
    pub valid_until: U256,
}

/// A state-changing registry call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum WriteCall {
    IssueTouristId(IssueRequest),
    RevokeTouristId { tourist: Address },
    LogLocation { tourist: Address, location_hash: B256 },
    RaisePanic { tourist: Address, panic_hash: B256 },
}

impl WriteCall {
    /// Contract function name
    pub fn name(&self) -> &'static str {
        match self {
            WriteCall::IssueTouristId(_) => "issueTouristID",
            WriteCall::RevokeTouristId { .. } => "revokeTouristID",
            WriteCall::LogLocation { .. } => "logLocation",
            WriteCall::RaisePanic { .. } => "raisePanic",
        }
    }
}

/// Result of simulating a write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Whether the call would succeed
    pub success: bool,
    /// Estimated gas (if successful and estimation worked)
    pub gas_estimate: Option<u64>,
    /// Revert reason (if failed)
    pub revert_reason: Option<String>,
}

impl SimulationResult {
    pub fn success(gas_estimate: Option<u64>) -> Self {
        Self {
            success: true,
            gas_estimate,
            revert_reason: None,
        }
    }

    pub fn failed(reason: String) -> Self {
        Self {
            success: false,
            gas_estimate: None,
            revert_reason: Some(reason),
        }
    }
}

/// Message prefix geth uses for reverts without decoded data
const REVERTED_PREFIX: &str = "execution reverted: ";

/// Revert reason for a failed contract call
///
/// Decodes the revert data carried in the RPC error response when there is
/// some, otherwise falls back to the error message.
pub(crate) fn revert_reason(error: &alloy::contract::Error) -> String {
    error
        .as_revert_data()
        .and_then(|data| decode_reason(&data))
        .unwrap_or_else(|| parse_revert_reason(&error.to_string()))
}

/// Pull a revert reason out of an RPC error message
pub(crate) fn parse_revert_reason(error: &str) -> String {
    if !error.contains("execution reverted") {
        return error.to_string();
    }

    // anvil: `execution reverted: revert: <reason>`
    if let Some(start) = error.find("revert: ") {
        let reason = &error[start + 8..];
        if let Some(end) = reason.find('"') {
            return reason[..end].to_string();
        }
        return reason.to_string();
    }

    let data = revert_data(error);
    if let Some(reason) = data
        .and_then(|d| hex::decode(d).ok())
        .and_then(|bytes| decode_reason(&bytes))
    {
        return reason;
    }

    // geth: `execution reverted: <reason>`
    if let Some(start) = error.find(REVERTED_PREFIX) {
        let tail = &error[start + REVERTED_PREFIX.len()..];
        let reason = tail
            .split(", data:")
            .next()
            .unwrap_or(tail)
            .trim()
            .trim_end_matches('"');
        if !reason.is_empty() {
            return reason.to_string();
        }
    }

    match data {
        Some(data) => format!("Reverted with data: {}", data),
        None => "execution reverted".to_string(),
    }
}

/// Hex revert payload in an error message, preferring the `data: "0x.."` field
fn revert_data(error: &str) -> Option<&str> {
    let start = match error.find("data: \"") {
        Some(i) => i + 7,
        None => error.find("0x")?,
    };
    let hex_data = &error[start..];
    if !hex_data.starts_with("0x") {
        return None;
    }
    let end = hex_data[2..]
        .find(|c: char| !c.is_ascii_hexdigit())
        .map_or(hex_data.len(), |i| i + 2);
    Some(&hex_data[..end])
}

/// `Error(string)` reason, or alloy's rendering of panics and raw string reverts
fn decode_reason(data: &[u8]) -> Option<String> {
    if data.is_empty() {
        return None;
    }
    if let Ok(revert) = Revert::abi_decode(data) {
        return Some(revert.reason);
    }
    decode_revert_reason(data).filter(|reason| !reason.is_empty())
}
