//! Tourist ID Registry Client
//!
//! A thin client for the `TouristIDRegistryV2` smart contract:
//! - Issue and revoke tourist IDs
//! - Query identity records and validity
//! - Log location commitments and raise panic alerts
//!
//! All identity rules live in the contract. The client holds no state: every
//! operation opens a session bound to an injected wallet, forwards its
//! arguments, and reshapes what comes back.
//!
//! # Security Model
//!
//! - The wallet is passed in explicitly; nothing reads an ambient wallet
//! - Private keys never leave the wallet module
//! - Failures from the wallet, the node, or the contract reach the caller unchanged

pub mod call;
pub mod config;
pub mod contract;
pub mod registry;
pub mod session;
pub mod wallet;

mod error;

// Re-export commonly used types
pub use call::{CallState, CancelToken, PendingCall};
pub use config::RegistryConfig;
pub use contract::{IssueRequest, SimulationResult, TouristInfo, WriteCall};
pub use error::{Error, Result};
pub use registry::TouristRegistry;
pub use session::{RegistrySession, SessionFactory};
pub use wallet::{SecureWallet, SigningIdentity, WalletProvider};
