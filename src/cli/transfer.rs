//! `chainops transfer eth|token`

use std::path::PathBuf;

use alloy::primitives::Address;
use clap::{Args, Subcommand};

use crate::blockchain::units::{parse_eth, parse_gwei};
use crate::blockchain::{ReceiptSummary, TxSender};
use crate::cli::{confirmer, Context, KeyArgs};
use crate::error::Result;
use crate::transfer::{self, Recipients, TransferOptions};

#[derive(Debug, Subcommand)]
pub enum TransferCommand {
    /// Send ETH to one or many recipients
    Eth(EthArgs),

    /// Send ERC-20 tokens to one or many recipients
    Token(TokenArgs),
}

/// Options shared by both transfer kinds.
#[derive(Debug, Args)]
pub struct CommonArgs {
    #[command(flatten)]
    pub key: KeyArgs,

    /// Single recipient
    #[arg(long, conflicts_with = "to_file")]
    pub to: Option<String>,

    /// Recipients file (.txt one per line, or .json)
    #[arg(long)]
    pub to_file: Option<PathBuf>,

    /// Gas price in gwei; network price times the multiplier otherwise
    #[arg(long)]
    pub gas_price: Option<String>,

    /// Cancel stuck pending transactions without asking
    #[arg(long)]
    pub cancel_pending: bool,

    /// Answer yes to every other prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Debug, Args)]
pub struct EthArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// ETH per recipient
    #[arg(long)]
    pub amount: String,
}

#[derive(Debug, Args)]
pub struct TokenArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// ERC-20 contract
    #[arg(long)]
    pub token_address: Address,

    /// Tokens per recipient, in whole-token units
    #[arg(long)]
    pub amount: String,
}

struct Prepared {
    sender: TxSender,
    recipients: Vec<Address>,
    options: TransferOptions,
}

async fn prepare(common: &CommonArgs, ctx: &Context) -> Result<Prepared> {
    let recipients = Recipients::from_args(common.to.clone(), common.to_file.clone())?.resolve()?;
    let gas_price = common.gas_price.as_deref().map(parse_gwei).transpose()?;
    let options = TransferOptions::from_config(&ctx.config.transactions, gas_price);
    let sender = ctx.sender(common.key.wallet()?).await?;
    Ok(Prepared {
        sender,
        recipients,
        options,
    })
}

/// Ask about stuck transactions unless `--cancel-pending` already answered.
fn cancel_prompt(cancel_pending: bool) -> impl Fn(u64) -> bool {
    let confirm = confirmer(cancel_pending);
    move |stuck: u64| {
        confirm(&format!(
            "Found {} pending transaction(s). Cancel them before continuing?",
            stuck
        ))
    }
}

fn print_summary(receipts: &[ReceiptSummary]) {
    println!("\nSuccessfully completed {} transfer(s):", receipts.len());
    for receipt in receipts {
        println!(
            "  {} (block {}, gas used {})",
            receipt.hash, receipt.block_number, receipt.gas_used
        );
    }
}

pub async fn run(cmd: TransferCommand, ctx: &Context) -> Result<()> {
    match cmd {
        TransferCommand::Eth(args) => {
            let amount = parse_eth(&args.amount)?;
            let prepared = prepare(&args.common, ctx).await?;
            let should_cancel = cancel_prompt(args.common.cancel_pending);
            let receipts = transfer::transfer_eth(
                &prepared.sender,
                &prepared.recipients,
                amount,
                &prepared.options,
                &should_cancel,
            )
            .await?;
            print_summary(&receipts);
        }
        TransferCommand::Token(args) => {
            let prepared = prepare(&args.common, ctx).await?;
            let should_cancel = cancel_prompt(args.common.cancel_pending);
            let confirm_low_gas = confirmer(args.common.yes);
            let receipts = transfer::transfer_tokens(
                &prepared.sender,
                args.token_address,
                &prepared.recipients,
                &args.amount,
                &prepared.options,
                &should_cancel,
                &confirm_low_gas,
            )
            .await?;
            print_summary(&receipts);
        }
    }
    Ok(())
}
