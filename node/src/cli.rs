//! # CLI Interface
//!
//! Command-line arguments for `qkc-data-service`, via `clap` derive. Every
//! flag of `run` can also come from a `QKC_*` environment variable.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;

use qkc_protocol::config::{DEFAULT_FULL_SHARD_KEY, DEFAULT_LISTEN_PORT};

/// QKC data service.
///
/// Stores JSON payloads on the ledger as signed data transactions and reads
/// them back by transaction id.
#[derive(Parser, Debug)]
#[command(
    name = "qkc-data-service",
    about = "Store and fetch JSON payloads as QKC data transactions",
    version,
    propagate_version = true
)]
pub struct DataServiceCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP service.
    Run(RunArgs),
    /// Encrypt a private key with a password and print the blob.
    Encrypt(EncryptArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Hex private key, or an encrypted key blob when `--password` is set.
    #[arg(long, env = "QKC_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: String,

    /// Password that unlocks an encrypted `--private-key`.
    #[arg(long, env = "QKC_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// JSON-RPC endpoint of the ledger.
    #[arg(long, env = "QKC_HOST", default_value = "http://127.0.0.1:38391")]
    pub host: String,

    /// Address the HTTP service binds to.
    #[arg(long, env = "QKC_LISTEN", default_value_t = default_listen())]
    pub listen: SocketAddr,

    /// Full shard key used for the signing account and every transaction.
    #[arg(long, env = "QKC_FULL_SHARD_KEY", default_value_t = DEFAULT_FULL_SHARD_KEY)]
    pub full_shard_key: u32,

    /// Ledger RPC timeout in seconds.
    #[arg(long, env = "QKC_RPC_TIMEOUT", default_value_t = 30)]
    pub rpc_timeout: u64,

    /// Log output format: `pretty` or `json`.
    #[arg(long, env = "QKC_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Default log filter when `RUST_LOG` is unset.
    #[arg(long, env = "QKC_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Arguments for the `encrypt` subcommand.
#[derive(Parser, Debug)]
pub struct EncryptArgs {
    /// Hex private key to encrypt.
    #[arg(long, env = "QKC_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: String,

    /// Password to encrypt with.
    #[arg(long, env = "QKC_PASSWORD", hide_env_values = true)]
    pub password: String,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], DEFAULT_LISTEN_PORT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        DataServiceCli::command().debug_assert();
    }

    #[test]
    fn run_defaults() {
        let cli = DataServiceCli::try_parse_from([
            "qkc-data-service",
            "run",
            "--private-key",
            "0x01",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.full_shard_key, 262_145);
        assert_eq!(args.listen.port(), 8080);
        assert!(args.password.is_none());
    }

    #[test]
    fn encrypt_requires_password() {
        assert!(DataServiceCli::try_parse_from([
            "qkc-data-service",
            "encrypt",
            "--private-key",
            "0x01",
        ])
        .is_err()
            || std::env::var("QKC_PASSWORD").is_ok());
    }
}
