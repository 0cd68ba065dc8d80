//! Transaction signing, broadcast and confirmation monitoring.
//!
//! # Responsibilities
//! - Sign and broadcast fully populated transactions
//! - Derive EIP-1559 fee caps from the latest base fee
//! - Poll for receipts with a deadline and optional confirmation depth

use std::time::Duration;

use alloy::primitives::{Address, TxHash};
use alloy::rpc::types::TransactionRequest;
use tokio::time::{interval, timeout};

use crate::blockchain::client::RpcClient;
use crate::blockchain::types::{BlockchainError, BlockchainResult, ReceiptSummary};
use crate::blockchain::units::WEI_PER_GWEI;
use crate::blockchain::wallet::{SignedTx, Wallet};
use crate::config::TransactionConfig;

/// Priority fee used when the caller does not supply one.
pub const DEFAULT_PRIORITY_FEE: u128 = 2 * WEI_PER_GWEI;

/// Signs, submits and tracks transactions for one account.
#[derive(Debug, Clone)]
pub struct TxSender {
    client: RpcClient,
    wallet: Wallet,
    poll_interval: Duration,
    confirmation_blocks: u32,
}

impl TxSender {
    pub fn new(client: RpcClient, wallet: Wallet, config: &TransactionConfig) -> Self {
        Self {
            client,
            wallet,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            confirmation_blocks: config.confirmation_blocks,
        }
    }

    /// Sign `tx` and broadcast it. Returns the hash the node reported.
    pub async fn sign_and_send(&self, tx: TransactionRequest) -> BlockchainResult<TxHash> {
        let signed = self.wallet.sign_request(tx).await?;
        self.send_signed(&signed).await
    }

    /// Broadcast an already signed transaction.
    pub async fn send_signed(&self, signed: &SignedTx) -> BlockchainResult<TxHash> {
        let hash = self.client.send_raw(&signed.raw).await?;
        if hash != signed.hash {
            tracing::warn!(local = %signed.hash, remote = %hash, "Node reported a different hash");
        }
        tracing::debug!(tx_hash = %hash, "Transaction submitted");
        Ok(hash)
    }

    /// Sign, send, and wait for the receipt.
    pub async fn send_and_wait(
        &self,
        tx: TransactionRequest,
        wait: Duration,
    ) -> BlockchainResult<ReceiptSummary> {
        let hash = self.sign_and_send(tx).await?;
        self.wait_for_receipt(hash, wait).await
    }

    /// Wait until `tx_hash` is mined and buried under the configured depth.
    ///
    /// A reverted transaction is returned as a summary with `status == false`;
    /// callers decide whether that is an error. RPC errors while polling are
    /// logged and retried until the deadline.
    pub async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        wait: Duration,
    ) -> BlockchainResult<ReceiptSummary> {
        let required_confirmations = u64::from(self.confirmation_blocks);

        let result = timeout(wait, async {
            let mut ticker = interval(self.poll_interval);

            loop {
                ticker.tick().await;

                let receipt = match self.client.receipt(tx_hash).await {
                    Ok(Some(r)) => r,
                    Ok(None) => {
                        tracing::debug!(tx_hash = %tx_hash, "Transaction pending");
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!(tx_hash = %tx_hash, error = %e, "Error checking receipt");
                        continue;
                    }
                };
                let summary = ReceiptSummary::from(&receipt);

                if required_confirmations == 0 || !summary.status {
                    return summary;
                }

                let current_block = match self.client.block_number().await {
                    Ok(block) => block,
                    Err(e) => {
                        tracing::warn!(tx_hash = %tx_hash, error = %e, "Error reading block number");
                        continue;
                    }
                };
                let confirmations = current_block.saturating_sub(summary.block_number);
                if confirmations >= required_confirmations {
                    return summary;
                }

                tracing::debug!(
                    tx_hash = %tx_hash,
                    confirmations = confirmations,
                    required = required_confirmations,
                    "Waiting for confirmations"
                );
            }
        })
        .await;

        result.map_err(|_| BlockchainError::ConfirmationTimeout {
            hash: tx_hash,
            secs: wait.as_secs(),
        })
    }

    /// EIP-1559 fee caps: `(base_fee * 2 + priority, priority)`.
    pub async fn eip1559_fees(&self, priority: Option<u128>) -> BlockchainResult<(u128, u128)> {
        let base_fee = self.client.base_fee().await?;
        let priority = priority.unwrap_or(DEFAULT_PRIORITY_FEE);
        Ok((eip1559_max_fee(base_fee, priority), priority))
    }

    pub fn client(&self) -> &RpcClient {
        &self.client
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    /// Get the wallet address.
    pub fn address(&self) -> Address {
        self.wallet.address()
    }
}

/// Max fee per gas that survives a doubling of the base fee.
pub fn eip1559_max_fee(base_fee: u128, priority: u128) -> u128 {
    base_fee.saturating_mul(2).saturating_add(priority)
}
