//! `chainops blob`

use std::path::PathBuf;

use alloy::primitives::{address, Address, U256};
use clap::Args;

use crate::blob::sender::balance_change;
use crate::blob::{send_blob, BlobSidecarBuilder, BlobTxParams, BlobTxType};
use crate::cli::{Context, KeyArgs};
use crate::error::Result;

/// EIP-1559 burn address tracked by default.
pub const DEFAULT_FEE_COLLECTOR: Address = address!("1559000000000000000000000000000000000000");

#[derive(Debug, Args)]
pub struct BlobArgs {
    #[command(flatten)]
    pub key: KeyArgs,

    /// Recipient address
    #[arg(long)]
    pub to: Address,

    /// Blobs to attach (1 to 6)
    #[arg(long, default_value_t = 2)]
    pub number_of_blobs: usize,

    /// Max fee, priority fee and max fee per blob gas, in wei
    #[arg(long, default_value_t = 1_000_000_000_000)]
    pub gas_price: u128,

    /// Gas limit; estimated when omitted
    #[arg(long)]
    pub gas_limit: Option<u64>,

    /// Nonce; pending transaction count when omitted
    #[arg(long)]
    pub nonce: Option<u64>,

    /// 0x3 (blob) or 0x2; only checked with --validate-osaka-params
    #[arg(long, default_value = "0x3")]
    pub tx_type: BlobTxType,

    /// Value in wei (must be 0 under Osaka rules)
    #[arg(long, default_value = "0")]
    pub value: U256,

    /// Enforce Osaka parameter rules before building
    #[arg(long)]
    pub validate_osaka_params: bool,

    /// Address whose balance change is reported
    #[arg(long, default_value_t = DEFAULT_FEE_COLLECTOR)]
    pub fee_collector: Address,

    /// Do not report the fee collector balance
    #[arg(long)]
    pub no_fee_collector: bool,

    /// KZG trusted setup file; the embedded Ethereum setup otherwise
    #[arg(long)]
    pub trusted_setup: Option<PathBuf>,
}

pub async fn run(args: BlobArgs, ctx: &Context) -> Result<()> {
    let builder = match &args.trusted_setup {
        Some(path) => BlobSidecarBuilder::from_trusted_setup(path)?,
        None => BlobSidecarBuilder::new(),
    };
    let sender = ctx.sender(args.key.wallet()?).await?;
    let client = sender.client();

    let fee_collector = (!args.no_fee_collector).then_some(args.fee_collector);
    let before = match fee_collector {
        Some(collector) => Some(client.balance(collector).await?),
        None => None,
    };
    if let Some(balance) = before {
        println!("Fee collector balance before: {} wei", balance);
    }

    let params = BlobTxParams {
        to: args.to,
        value: args.value,
        number_of_blobs: args.number_of_blobs,
        gas_price: args.gas_price,
        gas_limit: args.gas_limit,
        nonce: args.nonce,
        tx_type: args.tx_type,
        validate_osaka: args.validate_osaka_params,
        receipt_timeout: ctx.receipt_timeout(),
    };
    let receipt = send_blob(&sender, &builder, &params).await?;
    println!("Transaction hash: {}", receipt.hash);
    println!(
        "Transaction included in block {}, status: {}",
        receipt.block_number,
        receipt.status_code()
    );

    if let (Some(collector), Some(before)) = (fee_collector, before) {
        let after = client.balance(collector).await?;
        println!("Fee collector balance after: {} wei", after);
        println!("Fee collector balance change: {} wei", balance_change(before, after));
    }
    Ok(())
}
