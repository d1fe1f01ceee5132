//! Tourist ID registry CLI
//!
//! Command-line access to every registry operation.

use alloy::primitives::{Address, B256, U256};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use std::future::Future;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tourist_id_registry::{
    CancelToken, Error, IssueRequest, PendingCall, RegistryConfig, Result, SecureWallet,
    TouristRegistry, WalletProvider, WriteCall,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding the signing key
const PRIVATE_KEY_ENV: &str = "PRIVATE_KEY";

#[derive(Parser)]
#[command(name = "tourist-id")]
#[command(about = "Client for the tourist ID registry contract")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file (JSON). Defaults to environment variables.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Issue a tourist ID
    Issue {
        /// Tourist wallet address
        #[arg(long)]
        tourist: String,

        #[arg(long)]
        kyc_hash: String,

        #[arg(long)]
        kyc_cid: String,

        #[arg(long)]
        trip_hash: String,

        #[arg(long)]
        trip_cid: String,

        #[arg(long)]
        emergency_hash: String,

        #[arg(long)]
        emergency_cid: String,

        /// Expiry as a unix timestamp
        #[arg(long, conflicts_with = "valid_for", required_unless_present = "valid_for")]
        valid_until: Option<u64>,

        /// Expiry as seconds from now
        #[arg(long)]
        valid_for: Option<u64>,

        /// Simulate with eth_call instead of sending
        #[arg(long)]
        dry_run: bool,
    },

    /// Revoke a tourist ID
    Revoke {
        #[arg(long)]
        tourist: String,

        #[arg(long)]
        dry_run: bool,
    },

    /// Show the identity record for a tourist
    Info {
        #[arg(long)]
        tourist: String,
    },

    /// Check whether a tourist ID is valid
    IsValid {
        #[arg(long)]
        tourist: String,
    },

    /// Append a location hash to a tourist's log
    LogLocation {
        #[arg(long)]
        tourist: String,

        #[arg(long)]
        location_hash: String,

        #[arg(long)]
        dry_run: bool,
    },

    /// Raise a panic alert for a tourist
    Panic {
        #[arg(long)]
        tourist: String,

        #[arg(long)]
        panic_hash: String,

        #[arg(long)]
        dry_run: bool,
    },

    /// Read one entry of a tourist's location log
    LocationAt {
        #[arg(long)]
        tourist: String,

        #[arg(long)]
        index: u64,
    },

    /// Number of entries in a tourist's location log
    LocationCount {
        #[arg(long)]
        tourist: String,
    },

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    // Logs go to stderr so command output on stdout stays machine-readable
    let fmt_layer = if cli.log_json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).boxed()
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .init();

    let config = match cli.config {
        Some(path) => RegistryConfig::from_file(&path)?,
        None => RegistryConfig::from_env()?,
    };

    let wallet = load_wallet();
    let signer = wallet.as_ref().map(|w| w.address());
    let registry = TouristRegistry::new(
        config,
        wallet.map(|w| Arc::new(w) as Arc<dyn WalletProvider>),
    );

    let token = CancelToken::new();
    let ctrl_c = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, abandoning pending call");
            ctrl_c.cancel();
        }
    });

    match cli.command {
        Commands::Issue {
            tourist,
            kyc_hash,
            kyc_cid,
            trip_hash,
            trip_cid,
            emergency_hash,
            emergency_cid,
            valid_until,
            valid_for,
            dry_run,
        } => {
            let valid_until = match (valid_until, valid_for) {
                (Some(ts), _) => ts,
                (None, Some(secs)) => now_unix().saturating_add(secs),
                (None, None) => {
                    return Err(Error::InvalidArgument(
                        "One of --valid-until or --valid-for is required".to_string(),
                    ))
                }
            };
            let call = WriteCall::IssueTouristId(IssueRequest {
                tourist: parse_address(&tourist)?,
                kyc_hash: parse_hash("kyc-hash", &kyc_hash)?,
                kyc_cid,
                trip_hash: parse_hash("trip-hash", &trip_hash)?,
                trip_cid,
                emergency_hash: parse_hash("emergency-hash", &emergency_hash)?,
                emergency_cid,
                valid_until: U256::from(valid_until),
            });
            run_write(&registry, &token, call, dry_run).await?;
        }
        Commands::Revoke { tourist, dry_run } => {
            let call = WriteCall::RevokeTouristId {
                tourist: parse_address(&tourist)?,
            };
            run_write(&registry, &token, call, dry_run).await?;
        }
        Commands::LogLocation {
            tourist,
            location_hash,
            dry_run,
        } => {
            let call = WriteCall::LogLocation {
                tourist: parse_address(&tourist)?,
                location_hash: parse_hash("location-hash", &location_hash)?,
            };
            run_write(&registry, &token, call, dry_run).await?;
        }
        Commands::Panic {
            tourist,
            panic_hash,
            dry_run,
        } => {
            let call = WriteCall::RaisePanic {
                tourist: parse_address(&tourist)?,
                panic_hash: parse_hash("panic-hash", &panic_hash)?,
            };
            run_write(&registry, &token, call, dry_run).await?;
        }
        Commands::Info { tourist } => {
            let tourist = parse_address(&tourist)?;
            let registry = registry.clone();
            let info = cancellable(&token, async move {
                registry.get_tourist_info(tourist).await
            })
            .await?;
            print_json(&json!({
                "tourist": tourist,
                "info": info,
                "valid_until_utc": info.valid_until_utc().map(|t| t.to_rfc3339()),
            }))?;
        }
        Commands::IsValid { tourist } => {
            let tourist = parse_address(&tourist)?;
            let registry = registry.clone();
            let valid =
                cancellable(&token, async move { registry.is_valid_id(tourist).await }).await?;
            print_json(&json!({ "tourist": tourist, "valid": valid }))?;
        }
        Commands::LocationAt { tourist, index } => {
            let tourist = parse_address(&tourist)?;
            let registry = registry.clone();
            let location = cancellable(&token, async move {
                registry.get_location_at(tourist, index).await
            })
            .await?;
            print_json(&json!({ "tourist": tourist, "index": index, "location_hash": location }))?;
        }
        Commands::LocationCount { tourist } => {
            let tourist = parse_address(&tourist)?;
            let registry = registry.clone();
            let count =
                cancellable(&token, async move { registry.location_count(tourist).await }).await?;
            print_json(&json!({ "tourist": tourist, "count": count }))?;
        }
        Commands::Config => {
            print_json(&json!({
                "config": registry.config(),
                "signer": signer,
            }))?;
        }
    }

    Ok(())
}

/// Load the signing wallet from `PRIVATE_KEY`, if set
fn load_wallet() -> Option<SecureWallet> {
    if std::env::var(PRIVATE_KEY_ENV).is_err() {
        tracing::warn!("No {} set - registry calls will fail with no wallet", PRIVATE_KEY_ENV);
        return None;
    }
    match SecureWallet::from_env(PRIVATE_KEY_ENV) {
        Ok(wallet) => {
            tracing::info!(address = %wallet.address(), "Loaded wallet from {}", PRIVATE_KEY_ENV);
            Some(wallet)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load wallet from {}", PRIVATE_KEY_ENV);
            None
        }
    }
}

async fn run_write(
    registry: &TouristRegistry,
    token: &CancelToken,
    call: WriteCall,
    dry_run: bool,
) -> Result<()> {
    let operation = call.name();
    let registry = registry.clone();

    if dry_run {
        tracing::info!(operation, "Simulating transaction");
        let result = cancellable(token, async move { registry.simulate(&call).await }).await?;
        if !result.success {
            tracing::warn!(
                operation,
                reason = result.revert_reason.as_deref().unwrap_or("unknown"),
                "Simulation reverted"
            );
        }
        return print_json(&json!({ "operation": operation, "simulation": result }));
    }

    tracing::info!(operation, "Submitting transaction");
    let tx_hash = cancellable(token, async move { registry.execute(&call).await }).await?;
    print_json(&json!({ "operation": operation, "tx_hash": tx_hash }))
}

async fn cancellable<T, F>(token: &CancelToken, call: F) -> Result<T>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    PendingCall::spawn(token.clone(), call).wait().await
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_address(value: &str) -> Result<Address> {
    Address::from_str(value.trim())
        .map_err(|e| Error::InvalidArgument(format!("Invalid address {}: {}", value, e)))
}

fn parse_hash(name: &str, value: &str) -> Result<B256> {
    B256::from_str(value.trim())
        .map_err(|e| Error::InvalidArgument(format!("Invalid {} (expected 32 bytes hex): {}", name, e)))
}

fn now_unix() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or(0)
}
