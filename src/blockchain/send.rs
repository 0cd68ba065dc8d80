//! Plain value / calldata transactions.

use std::str::FromStr;
use std::time::Duration;

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::TransactionRequest;

use crate::blockchain::types::{BlockTag, BlockchainError, BlockchainResult, ReceiptSummary};
use crate::blockchain::transaction::TxSender;

/// Gas limit used when estimation fails.
pub const FALLBACK_GAS_LIMIT: u64 = 21_000;

/// Fee fields of an outgoing transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeMode {
    Legacy { gas_price: u128 },
    Eip1559 { max_fee: u128, max_priority_fee: u128 },
}

/// Transaction type selector accepted on the command line.
///
/// `0x1` selects a legacy `gasPrice` transaction for compatibility with
/// existing test scripts; `0x2` selects EIP-1559.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxKind {
    Legacy,
    Eip1559,
}

impl FromStr for TxKind {
    type Err = BlockchainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "0x0" | "0x1" | "legacy" => Ok(TxKind::Legacy),
            "0x2" | "eip1559" => Ok(TxKind::Eip1559),
            other => Err(BlockchainError::InvalidInput(format!(
                "Unsupported transaction type '{}', expected 0x1 or 0x2",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SendParams {
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    pub fees: FeeMode,
    /// Explicit gas limit; estimated when `None`.
    pub gas_limit: Option<u64>,
}

/// Build the unsigned request for `params` using the sender's latest nonce.
pub async fn build_request(
    sender: &TxSender,
    params: &SendParams,
) -> BlockchainResult<TransactionRequest> {
    let client = sender.client();
    let chain_id = client.chain_id().await?.0;
    let nonce = client.nonce(sender.address(), BlockTag::Latest).await?;

    let mut tx = TransactionRequest::default()
        .with_from(sender.address())
        .with_to(params.to)
        .with_value(params.value)
        .with_nonce(nonce)
        .with_chain_id(chain_id);
    if !params.data.is_empty() {
        tx = tx.with_input(params.data.clone());
    }
    tx = match params.fees {
        FeeMode::Legacy { gas_price } => tx.with_gas_price(gas_price),
        FeeMode::Eip1559 {
            max_fee,
            max_priority_fee,
        } => tx
            .with_max_fee_per_gas(max_fee)
            .with_max_priority_fee_per_gas(max_priority_fee),
    };

    let gas_limit = match params.gas_limit {
        Some(gas) => gas,
        None => match client.estimate_gas(&tx).await {
            Ok(gas) => {
                tracing::info!(gas = gas, "Estimated gas");
                gas
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    fallback = FALLBACK_GAS_LIMIT,
                    "Gas estimation failed, using default gas limit"
                );
                FALLBACK_GAS_LIMIT
            }
        },
    };

    Ok(tx.with_gas_limit(gas_limit))
}

/// Send a transaction and wait for it to be mined.
pub async fn send_transaction(
    sender: &TxSender,
    params: &SendParams,
    wait: Duration,
) -> BlockchainResult<ReceiptSummary> {
    let tx = build_request(sender, params).await?;
    tracing::debug!(tx = ?tx, "Transaction details");

    let hash = sender.sign_and_send(tx).await?;
    tracing::info!(tx_hash = %hash, "Transaction sent");

    sender.wait_for_receipt(hash, wait).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_kind_parse() {
        assert_eq!("0x1".parse::<TxKind>().unwrap(), TxKind::Legacy);
        assert_eq!("0X2".parse::<TxKind>().unwrap(), TxKind::Eip1559);
        assert!("0x3".parse::<TxKind>().is_err());
    }
}
