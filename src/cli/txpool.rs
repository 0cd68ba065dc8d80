//! `chainops txpool`

use alloy::primitives::Address;
use clap::{ArgGroup, Args};

use crate::cli::Context;
use crate::error::Result;
use crate::transfer::nonce_report;
use crate::txpool::{pending_by_type, pool_status};

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("mode").required(true).args(["status", "pool", "address"])))]
pub struct TxpoolArgs {
    /// Pending and queued counts from `txpool_status`
    #[arg(long)]
    pub status: bool,

    /// Pending transactions grouped by type
    #[arg(long)]
    pub pool: bool,

    /// Nonce report for one account
    #[arg(long)]
    pub address: Option<Address>,
}

pub async fn run(args: TxpoolArgs, ctx: &Context) -> Result<()> {
    let client = ctx.client().await?;

    if args.status {
        let status = pool_status(&client).await?;
        println!("Pending: {}", status.pending);
        println!("Queued: {}", status.queued);
        println!("Total: {}", status.total());
    } else if args.pool {
        let breakdown = pending_by_type(&client).await?;
        print!("{}", breakdown);
    } else if let Some(address) = args.address {
        let report = nonce_report(&client, address).await?;
        println!("Address: {}", address);
        println!("Latest nonce: {}", report.latest);
        println!("Pending nonce: {}", report.pending);
        if let Some(raw) = report.latest_raw {
            println!("Latest nonce (raw RPC): {}", raw);
        }
        if let Some(raw) = report.pending_raw {
            println!("Pending nonce (raw RPC): {}", raw);
        }
        if report.pending_txs.is_empty() {
            println!("No transactions from this address in the pending block");
        } else {
            println!("Transactions in the pending block: {}", report.pending_txs.len());
            for tx in &report.pending_txs {
                let nonce = tx.nonce.map_or_else(|| "?".to_string(), |n| n.to_string());
                let hash = tx.hash.map_or_else(|| "?".to_string(), |h| h.to_string());
                println!("  nonce {}: {}", nonce, hash);
            }
        }
        println!("Highest nonce: {}", report.max());
    }
    Ok(())
}
