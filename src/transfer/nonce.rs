//! Pending-nonce detection, cancellation and reporting.

use std::time::Duration;

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use serde_json::{json, Value};

use crate::blockchain::client::parse_quantity;
use crate::blockchain::{BlockTag, BlockchainResult, RpcClient, TxSender};

/// Wait per cancellation receipt.
const CANCEL_RECEIPT_TIMEOUT: Duration = Duration::from_secs(30);
/// Pause after cancelling so replacements propagate.
const CANCEL_SETTLE: Duration = Duration::from_secs(5);
const CANCEL_GAS_LIMIT: u64 = 21_000;

/// Outcome of cancelling a range of stuck nonces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CancelReport {
    pub cancelled: Vec<u64>,
    pub failed: Vec<u64>,
}

/// Replace every nonce in `start..=end` with a 0-value self transfer.
///
/// Each replacement is priced at `gas_price * multiplier`. Errors on one nonce
/// do not stop the others.
pub async fn cancel_pending(
    sender: &TxSender,
    start: u64,
    end: u64,
    multiplier: u64,
) -> BlockchainResult<CancelReport> {
    let client = sender.client();
    let address = sender.address();
    let chain_id = client.chain_id().await?.0;
    let gas_price = client.gas_price().await?.saturating_mul(u128::from(multiplier));

    tracing::info!(start = start, end = end, "Attempting to cancel pending transactions");
    let mut report = CancelReport::default();

    for nonce in start..=end {
        let tx = TransactionRequest::default()
            .with_to(address)
            .with_value(U256::ZERO)
            .with_nonce(nonce)
            .with_gas_limit(CANCEL_GAS_LIMIT)
            .with_gas_price(gas_price)
            .with_chain_id(chain_id);

        match sender.send_and_wait(tx, CANCEL_RECEIPT_TIMEOUT).await {
            Ok(receipt) if receipt.status => {
                tracing::info!(nonce = nonce, tx_hash = %receipt.hash, "Cancelled transaction");
                report.cancelled.push(nonce);
            }
            Ok(receipt) => {
                tracing::warn!(nonce = nonce, tx_hash = %receipt.hash, "Cancellation failed");
                report.failed.push(nonce);
            }
            Err(e) => {
                tracing::warn!(nonce = nonce, error = %e, "Error cancelling nonce");
                report.failed.push(nonce);
            }
        }
    }

    tracing::info!(
        cancelled = report.cancelled.len(),
        failed = report.failed.len(),
        "Cancellation attempts completed"
    );
    tokio::time::sleep(CANCEL_SETTLE).await;
    Ok(report)
}

/// Pick the nonce the next transfer starts from.
///
/// When the pending nonce is ahead of the latest one, `should_cancel` is asked
/// with the number of stuck transactions. Cancelling restarts from the fresh
/// latest nonce; declining queues behind the pending ones.
pub async fn resolve_start_nonce(
    sender: &TxSender,
    cancel_multiplier: u64,
    should_cancel: &dyn Fn(u64) -> bool,
) -> BlockchainResult<u64> {
    let client = sender.client();
    let address = sender.address();
    let latest = client.nonce(address, BlockTag::Latest).await?;
    let pending = client.nonce(address, BlockTag::Pending).await?;

    let nonce = if pending > latest {
        let stuck = pending - latest;
        tracing::warn!(pending = stuck, "Detected pending transactions");
        if should_cancel(stuck) {
            cancel_pending(sender, latest, pending - 1, cancel_multiplier).await?;
            client.nonce(address, BlockTag::Latest).await?
        } else {
            pending
        }
    } else {
        latest
    };

    tracing::info!(nonce = nonce, "Starting with nonce");
    Ok(nonce)
}

/// Pending transaction seen in the pending block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTx {
    pub nonce: Option<u64>,
    pub hash: Option<TxHash>,
}

/// Nonce views of one account from several sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonceReport {
    pub latest: u64,
    pub pending: u64,
    pub latest_raw: Option<u64>,
    pub pending_raw: Option<u64>,
    pub pending_txs: Vec<PendingTx>,
}

impl NonceReport {
    /// Highest nonce any source reported.
    pub fn max(&self) -> u64 {
        [Some(self.latest), Some(self.pending), self.latest_raw, self.pending_raw]
            .into_iter()
            .flatten()
            .max()
            .unwrap_or_default()
    }
}

/// Collect typed and raw `eth_getTransactionCount` results plus pending block
/// transactions sent from `address`.
pub async fn nonce_report(client: &RpcClient, address: Address) -> BlockchainResult<NonceReport> {
    let latest = client.nonce(address, BlockTag::Latest).await?;
    let pending = client.nonce(address, BlockTag::Pending).await?;

    let latest_raw = raw_count(client, address, BlockTag::Latest).await;
    let pending_raw = raw_count(client, address, BlockTag::Pending).await;

    let pending_txs = match client
        .raw_request("eth_getBlockByNumber", json!(["pending", true]))
        .await
    {
        Ok(block) => pending_from(&block, address),
        Err(e) => {
            tracing::warn!(error = %e, "Could not get pending block");
            Vec::new()
        }
    };

    Ok(NonceReport {
        latest,
        pending,
        latest_raw,
        pending_raw,
        pending_txs,
    })
}

async fn raw_count(client: &RpcClient, address: Address, tag: BlockTag) -> Option<u64> {
    match client
        .raw_request("eth_getTransactionCount", json!([address, tag.as_str()]))
        .await
    {
        Ok(value) => parse_quantity(&value).and_then(|n| u64::try_from(n).ok()),
        Err(e) => {
            tracing::debug!(error = %e, tag = tag.as_str(), "Raw transaction count failed");
            None
        }
    }
}

fn pending_from(block: &Value, address: Address) -> Vec<PendingTx> {
    let Some(transactions) = block.get("transactions").and_then(Value::as_array) else {
        return Vec::new();
    };
    transactions
        .iter()
        .filter(|tx| {
            tx.get("from")
                .and_then(Value::as_str)
                .and_then(|from| from.parse::<Address>().ok())
                == Some(address)
        })
        .map(|tx| PendingTx {
            nonce: tx
                .get("nonce")
                .and_then(parse_quantity)
                .and_then(|n| u64::try_from(n).ok()),
            hash: tx
                .get("hash")
                .and_then(Value::as_str)
                .and_then(|h| h.parse().ok()),
        })
        .collect()
}
