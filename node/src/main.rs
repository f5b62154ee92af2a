// Copyright (c) 2026 QKC Data Service Developers. MIT License.
// See LICENSE for details.

//! # QKC Data Service
//!
//! Entry point for the `qkc-data-service` binary. Parses CLI arguments,
//! initializes logging and metrics, connects to the ledger and serves the
//! HTTP API.
//!
//! Subcommands:
//!
//! - `run`     starts the service
//! - `encrypt` turns a raw private key into a password-protected blob
//! - `version` prints build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

use qkc_protocol::config::SdkConfig;
use qkc_protocol::crypto::encrypt_private_key;
use qkc_protocol::crypto::keystore::resolve_private_key;
use qkc_protocol::identity::SigningIdentity;
use qkc_protocol::network::{HttpLedgerClient, LedgerRpc, QkcSdk};

use api::AppState;
use cli::{Commands, DataServiceCli};
use logging::LogFormat;
use metrics::ServiceMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DataServiceCli::parse();

    match cli.command {
        Commands::Run(args) => run_service(args).await,
        Commands::Encrypt(args) => encrypt_key(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Connects to the ledger and serves the API until a shutdown signal.
async fn run_service(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(&args.log_level, LogFormat::from_str_lossy(&args.log_format));

    tracing::info!(
        host = %args.host,
        listen = %args.listen,
        full_shard_key = args.full_shard_key,
        "starting qkc-data-service"
    );

    // --- Signing identity ---
    let private_key = resolve_private_key(&args.private_key, args.password.as_deref())
        .context("failed to unlock private key")?;
    let identity = SigningIdentity::from_hex(&private_key, args.full_shard_key)
        .context("invalid private key")?;
    tracing::info!(address = %identity.address(), "signing identity loaded");

    // --- Ledger connection ---
    let ledger: Arc<dyn LedgerRpc> = Arc::new(
        HttpLedgerClient::with_timeout(args.host.clone(), Duration::from_secs(args.rpc_timeout))
            .context("failed to build ledger client")?,
    );
    let sdk = QkcSdk::connect(identity, ledger, SdkConfig::default())
        .await
        .with_context(|| format!("failed to connect to ledger at {}", args.host))?;
    tracing::info!(
        network_id = sdk.network_id(),
        nonce = sdk.current_nonce(),
        "ledger connection ready"
    );

    // --- API server ---
    let state = AppState {
        version: env!("CARGO_PKG_VERSION").to_string(),
        sdk: Arc::new(sdk),
        metrics: Arc::new(ServiceMetrics::new()),
    };
    let router = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("failed to bind API server on {}", args.listen))?;
    tracing::info!("API server listening on {}", args.listen);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server error")?;

    tracing::info!("qkc-data-service stopped");
    Ok(())
}

/// Prints the encrypted key blob on stdout.
fn encrypt_key(args: cli::EncryptArgs) -> Result<()> {
    let blob = encrypt_private_key(args.private_key.trim(), &args.password)
        .context("failed to encrypt private key")?;
    println!("{blob}");
    Ok(())
}

fn print_version() {
    println!("qkc-data-service {}", env!("CARGO_PKG_VERSION"));
    println!("tx version       {}", qkc_protocol::config::TX_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received, draining connections");
}
