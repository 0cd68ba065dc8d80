//! `chainops send` and `chainops decode`.

use std::path::PathBuf;

use alloy::primitives::{hex, Address, Bytes, U256};
use clap::Args;

use crate::blockchain::decode::decode_raw_transaction;
use crate::blockchain::send::{send_transaction, FeeMode, SendParams, TxKind};
use crate::blockchain::units::WEI_PER_GWEI;
use crate::blockchain::BlockchainError;
use crate::cli::{Context, KeyArgs};
use crate::error::{Error, Result};

#[derive(Debug, Args)]
pub struct SendArgs {
    #[command(flatten)]
    pub key: KeyArgs,

    /// Recipient address
    #[arg(long)]
    pub to: Address,

    /// Value in wei
    #[arg(long, default_value = "0")]
    pub value: U256,

    /// Calldata in hex
    #[arg(long, default_value = "")]
    pub data: String,

    /// 0x1 (legacy gasPrice) or 0x2 (EIP-1559)
    #[arg(long, default_value = "0x2")]
    pub tx_type: TxKind,

    /// Legacy gas price in wei
    #[arg(long, default_value_t = WEI_PER_GWEI)]
    pub gas_price: u128,

    /// EIP-1559 max fee per gas in wei
    #[arg(long, default_value_t = WEI_PER_GWEI)]
    pub max_fee: u128,

    /// EIP-1559 max priority fee per gas in wei
    #[arg(long, default_value_t = WEI_PER_GWEI)]
    pub max_priority_fee: u128,

    /// Gas limit; estimated when omitted
    #[arg(long)]
    pub gas_limit: Option<u64>,
}

#[derive(Debug, Args)]
pub struct DecodeArgs {
    /// File holding the hex-encoded signed transaction
    #[arg(short = 'f', long)]
    pub transaction_file: PathBuf,
}

fn parse_data(data: &str) -> Result<Bytes> {
    if data.is_empty() || data == "0x" {
        return Ok(Bytes::new());
    }
    hex::decode(data)
        .map(Bytes::from)
        .map_err(|e| BlockchainError::InvalidInput(format!("Invalid --data: {}", e)).into())
}

pub async fn send(args: SendArgs, ctx: &Context) -> Result<()> {
    let sender = ctx.sender(args.key.wallet()?).await?;
    let fees = match args.tx_type {
        TxKind::Legacy => FeeMode::Legacy {
            gas_price: args.gas_price,
        },
        TxKind::Eip1559 => FeeMode::Eip1559 {
            max_fee: args.max_fee,
            max_priority_fee: args.max_priority_fee,
        },
    };
    let params = SendParams {
        to: args.to,
        value: args.value,
        data: parse_data(&args.data)?,
        fees,
        gas_limit: args.gas_limit,
    };

    let receipt = send_transaction(&sender, &params, ctx.receipt_timeout()).await?;
    println!("Transaction hash: {}", receipt.hash);
    println!(
        "Transaction included in block {}, status: {}",
        receipt.block_number,
        receipt.status_code()
    );
    Ok(())
}

pub fn decode(args: DecodeArgs) -> Result<()> {
    let raw = std::fs::read_to_string(&args.transaction_file).map_err(Error::Io)?;
    let decoded = decode_raw_transaction(&raw)?;
    let rendered = serde_json::to_string_pretty(&decoded.to_json()?)
        .map_err(|e| BlockchainError::InvalidInput(e.to_string()))?;
    println!("{}", rendered);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_data() {
        assert!(parse_data("").unwrap().is_empty());
        assert!(parse_data("0x").unwrap().is_empty());
        assert_eq!(parse_data("0xdeadbeef").unwrap().len(), 4);
        assert!(parse_data("0xzz").is_err());
    }
}
