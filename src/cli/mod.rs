//! Command-line front end.
//!
//! # Data Flow
//! ```text
//! argv
//!     → Cli (clap derive, env-backed secrets)
//!     → Context (config file + global overrides)
//!     → one handler per subcommand
//!     → library call, results printed to stdout
//! ```
//!
//! # Design Decisions
//! - Handlers own all `println!` output; library modules only log
//! - Every interactive prompt has a flag that answers it

pub mod accounts;
pub mod blob;
pub mod diff;
pub mod logs;
pub mod report;
pub mod repeat;
pub mod transfer;
pub mod tx;
pub mod txpool;
pub mod validator;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::blockchain::wallet::PRIVATE_KEY_ENV_VAR;
use crate::blockchain::{RpcClient, TxSender, Wallet};
use crate::config::{load_or_default, AppConfig};
use crate::console;
use crate::error::{Error, Result};

#[derive(Debug, Parser)]
#[command(name = "chainops")]
#[command(version, about = "Operate and test Ethereum-compatible networks", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// TOML configuration file
    #[arg(long, env = "CHAINOPS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Debug-level console output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write logs (down to DEBUG) to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// JSON-RPC endpoint, overrides `rpc.url`
    #[arg(long, alias = "node-url", global = true)]
    pub rpc_url: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Account generation and address helpers
    #[command(subcommand)]
    Account(accounts::AccountCommand),

    /// Send a plain transaction
    Send(tx::SendArgs),

    /// Decode a raw signed transaction
    Decode(tx::DecodeArgs),

    /// Send an Osaka-compatible blob transaction
    Blob(blob::BlobArgs),

    /// Batch ETH or ERC-20 transfers
    #[command(subcommand)]
    Transfer(transfer::TransferCommand),

    /// Validator consolidation, withdrawal and exit requests
    #[command(subcommand)]
    Validator(validator::ValidatorCommand),

    /// Inspect the transaction pool or an account's nonces
    Txpool(txpool::TxpoolArgs),

    /// Run a command repeatedly
    Repeat(repeat::RepeatArgs),

    /// Compare two YAML configuration files
    ConfigDiff(diff::DiffArgs),

    /// Download logs from Grafana / Loki
    Logs(logs::LogsArgs),

    /// Send CI test results to Slack
    #[command(subcommand)]
    Report(report::ReportCommand),
}

/// Signing key shared by transaction commands.
#[derive(Debug, Clone, Args)]
pub struct KeyArgs {
    /// Sender private key (hex, `0x` optional)
    #[arg(
        long,
        visible_alias = "from-key",
        env = "CHAINOPS_PRIVATE_KEY",
        hide_env_values = true
    )]
    pub private_key: Option<String>,
}

impl KeyArgs {
    pub fn wallet(&self) -> Result<Wallet> {
        let key = self.private_key.as_deref().ok_or_else(|| {
            Error::Usage(format!(
                "--private-key or {} is required",
                PRIVATE_KEY_ENV_VAR
            ))
        })?;
        Ok(Wallet::from_private_key(key)?)
    }
}

/// Loaded configuration with global overrides applied.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: AppConfig,
}

impl Context {
    pub fn from_global(global: &GlobalArgs) -> Result<Self> {
        let mut config = load_or_default(global.config.as_deref())?;
        if let Some(url) = &global.rpc_url {
            config.rpc.url = url.clone();
        }
        if let Some(file) = &global.log_file {
            config.logging.file = Some(file.display().to_string());
        }
        Ok(Self { config })
    }

    pub async fn client(&self) -> Result<RpcClient> {
        Ok(RpcClient::new(self.config.rpc.clone()).await?)
    }

    pub async fn sender(&self, wallet: Wallet) -> Result<TxSender> {
        let client = self.client().await?;
        Ok(TxSender::new(client, wallet, &self.config.transactions))
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.config.transactions.receipt_timeout_secs)
    }
}

/// Prompt closure for library calls; `assume_yes` answers every prompt.
///
/// A prompt that cannot be read counts as a refusal.
pub fn confirmer(assume_yes: bool) -> impl Fn(&str) -> bool {
    move |prompt: &str| match console::confirm(prompt, assume_yes) {
        Ok(answer) => answer,
        Err(e) => {
            tracing::warn!(error = %e, "Could not read answer, treating as no");
            false
        }
    }
}

pub async fn run(cli: Cli, ctx: Context) -> Result<()> {
    match cli.command {
        Command::Account(cmd) => accounts::run(cmd, &ctx).await,
        Command::Send(args) => tx::send(args, &ctx).await,
        Command::Decode(args) => tx::decode(args),
        Command::Blob(args) => blob::run(args, &ctx).await,
        Command::Transfer(cmd) => transfer::run(cmd, &ctx).await,
        Command::Validator(cmd) => validator::run(cmd, &ctx).await,
        Command::Txpool(args) => txpool::run(args, &ctx).await,
        Command::Repeat(args) => repeat::run(args, &ctx).await,
        Command::ConfigDiff(args) => diff::run(args),
        Command::Logs(args) => logs::run(args, &ctx).await,
        Command::Report(cmd) => report::run(cmd, &ctx).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "chainops",
            "txpool",
            "--status",
            "--rpc-url",
            "http://10.0.0.1:8545",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.global.rpc_url.as_deref(), Some("http://10.0.0.1:8545"));
        assert!(cli.global.verbose);
    }

    #[test]
    fn test_node_url_alias() {
        let cli =
            Cli::try_parse_from(["chainops", "txpool", "--pool", "--node-url", "http://n:8545"])
                .unwrap();
        assert_eq!(cli.global.rpc_url.as_deref(), Some("http://n:8545"));
    }

    #[test]
    fn test_missing_key_is_usage_error() {
        let keys = KeyArgs { private_key: None };
        assert!(matches!(keys.wallet(), Err(Error::Usage(_))));
    }
}
