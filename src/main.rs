//! chainops
//!
//! Thin command-line operations for running and testing an
//! Ethereum-compatible network.
//!
//! # Architecture Overview
//!
//! ```text
//!     argv ──▶ cli (clap) ──▶ Context (config file + flag overrides)
//!                                  │
//!          ┌───────────────────────┼────────────────────────────┐
//!          ▼                       ▼                            ▼
//!   ┌──────────────┐      ┌─────────────────┐         ┌──────────────────┐
//!   │ accounts     │      │ transfer / blob │         │ logs (Grafana,   │
//!   │ config_diff  │      │ validator       │         │ Loki)            │
//!   │ repeat       │      │ txpool          │         │ report (Slack)   │
//!   └──────────────┘      └────────┬────────┘         └──────────────────┘
//!                                  ▼
//!                         ┌─────────────────┐
//!                         │   blockchain    │──▶ JSON-RPC node(s)
//!                         │ client / sender │    (failover, timeouts)
//!                         └─────────────────┘
//!
//!   Cross-cutting: config, observability, resilience, lifecycle
//! ```

use clap::Parser;

use chainops::cli::{self, Cli, Context};
use chainops::observability::init_logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let ctx = match Context::from_global(&cli.global) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(&ctx.config.logging, cli.global.verbose) {
        eprintln!("Error: could not open log file: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = cli::run(cli, ctx).await {
        tracing::error!(error = %e, "Command failed");
        std::process::exit(1);
    }
}
