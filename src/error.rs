//! Error types for the tourist ID registry client

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No wallet provider available")]
    WalletUnavailable,

    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Contract call failure, carried unchanged from alloy (reverts, RPC and transport errors)
    #[error(transparent)]
    Contract(#[from] alloy::contract::Error),

    /// Failure while waiting for a submitted transaction to confirm
    #[error(transparent)]
    Confirmation(#[from] alloy::providers::PendingTransactionError),

    /// Transaction was mined but its receipt reports failure
    #[error("Transaction {0} reverted")]
    Reverted(alloy::primitives::TxHash),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Call cancelled")]
    Cancelled,

    #[error("Call task failed: {0}")]
    Task(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
