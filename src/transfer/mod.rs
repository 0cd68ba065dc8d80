//! ETH and ERC-20 batch transfers with nonce management.
//!
//! # Data Flow
//! ```text
//! --to / --to-file
//!     → accounts::addresses (load + validate every recipient up front)
//!     → balance check (amount * recipients, exact wei)
//!     → per recipient:
//!         nonce.rs (pending detection, optional cancellation, start nonce)
//!         → attempt (eth.rs legacy tx / token.rs legacy then EIP-1559)
//!         → retry loop (nonce too low → refresh, already known → wait)
//!     → stop at the first recipient that still fails
//! ```

pub mod eth;
pub mod nonce;
pub mod token;

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use alloy::primitives::{Address, TxHash};
use alloy::rpc::types::TransactionRequest;
use thiserror::Error;

use crate::accounts::{self, AccountsError};
use crate::blockchain::{BlockTag, BlockchainError, ReceiptSummary, TxSender};
use crate::config::TransactionConfig;
use crate::resilience::{calculate_backoff, classify_error, RetryClass};

pub use eth::transfer_eth;
pub use nonce::{nonce_report, resolve_start_nonce, NonceReport};
pub use token::{transfer_tokens, TokenInfo};

/// How long each transfer waits for its receipt.
pub const RECEIPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from batch transfers.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Either --to or --to-file must be specified")]
    NoRecipients,

    #[error("Cannot specify both --to and --to-file")]
    ConflictingRecipients,

    #[error("Insufficient balance. Need {needed} but only have {available}")]
    InsufficientBalance { needed: String, available: String },

    #[error("Transfer to {recipient} failed after {attempts} attempts: {last_error}")]
    Failed {
        recipient: Address,
        attempts: u32,
        last_error: String,
    },

    #[error("Transfer aborted: {0}")]
    Aborted(String),

    #[error(transparent)]
    Accounts(#[from] AccountsError),

    #[error(transparent)]
    Blockchain(#[from] BlockchainError),
}

pub type TransferResult<T> = Result<T, TransferError>;

/// Where recipients come from.
#[derive(Debug, Clone)]
pub enum Recipients {
    Single(String),
    File(PathBuf),
}

impl Recipients {
    /// Exactly one of `to` / `to_file` must be given.
    pub fn from_args(to: Option<String>, to_file: Option<PathBuf>) -> TransferResult<Self> {
        match (to, to_file) {
            (Some(_), Some(_)) => Err(TransferError::ConflictingRecipients),
            (Some(address), None) => Ok(Recipients::Single(address)),
            (None, Some(path)) => Ok(Recipients::File(path)),
            (None, None) => Err(TransferError::NoRecipients),
        }
    }

    /// Load and validate every address.
    pub fn resolve(&self) -> TransferResult<Vec<Address>> {
        let raw = match self {
            Recipients::Single(address) => vec![address.clone()],
            Recipients::File(path) => accounts::load_addresses(path)?,
        };
        Ok(accounts::parse_addresses(&raw)?)
    }
}

/// Retry and pricing knobs shared by ETH and token transfers.
#[derive(Debug, Clone)]
pub struct TransferOptions {
    /// Explicit gas price in wei; `None` uses `eth_gasPrice * gas_price_multiplier`.
    pub gas_price: Option<u128>,
    pub gas_price_multiplier: f64,
    pub cancel_gas_price_multiplier: u64,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub receipt_timeout: Duration,
}

impl TransferOptions {
    pub fn from_config(config: &TransactionConfig, gas_price: Option<u128>) -> Self {
        Self {
            gas_price,
            gas_price_multiplier: config.gas_price_multiplier,
            cancel_gas_price_multiplier: config.cancel_gas_price_multiplier,
            max_retries: config.max_retries,
            retry_delay: Duration::from_secs(config.retry_delay_secs),
            receipt_timeout: RECEIPT_TIMEOUT,
        }
    }

    /// Legacy gas price for the next attempt.
    pub(crate) async fn legacy_gas_price(&self, sender: &TxSender) -> Result<u128, BlockchainError> {
        match self.gas_price {
            Some(price) => Ok(price),
            None => Ok(apply_multiplier(
                sender.client().gas_price().await?,
                self.gas_price_multiplier,
            )),
        }
    }
}

/// Scale a gas price by a float multiplier, rounding down.
pub fn apply_multiplier(price: u128, multiplier: f64) -> u128 {
    (price as f64 * multiplier) as u128
}

/// Why one attempt failed, and the hash it managed to broadcast, if any.
#[derive(Debug)]
pub(crate) struct AttemptFailure {
    pub error: BlockchainError,
    pub sent: Option<TxHash>,
}

impl AttemptFailure {
    fn unsent(error: BlockchainError) -> Self {
        Self { error, sent: None }
    }
}

/// Sign and send `tx`, then require a successful receipt.
pub(crate) async fn submit_and_wait(
    sender: &TxSender,
    tx: TransactionRequest,
    wait: Duration,
) -> Result<ReceiptSummary, AttemptFailure> {
    let hash = sender
        .sign_and_send(tx)
        .await
        .map_err(AttemptFailure::unsent)?;
    tracing::info!(tx_hash = %hash, "Transaction sent");

    let receipt = sender
        .wait_for_receipt(hash, wait)
        .await
        .map_err(|error| AttemptFailure {
            error,
            sent: Some(hash),
        })?;
    if !receipt.status {
        return Err(AttemptFailure {
            error: BlockchainError::Reverted(format!("{} failed with status 0", hash)),
            sent: Some(hash),
        });
    }
    Ok(receipt)
}

/// Run `attempt` with nonce recovery until it succeeds or attempts run out.
pub(crate) async fn send_with_retry<F, Fut>(
    sender: &TxSender,
    recipient: Address,
    options: &TransferOptions,
    start_nonce: u64,
    attempt: F,
) -> TransferResult<ReceiptSummary>
where
    F: Fn(u64) -> Fut,
    Fut: Future<Output = Result<ReceiptSummary, AttemptFailure>>,
{
    let client = sender.client();
    let mut nonce = start_nonce;
    let mut last_hash = None;
    let mut last_error = String::new();
    let max_delay = options.retry_delay.saturating_mul(4);

    for n in 0..options.max_retries {
        let failure = match attempt(nonce).await {
            Ok(receipt) => return Ok(receipt),
            Err(failure) => failure,
        };
        if failure.sent.is_some() {
            last_hash = failure.sent;
        }
        let message = failure.error.to_string();
        tracing::warn!(attempt = n + 1, nonce = nonce, error = %message, "Transfer attempt failed");

        match classify_error(&message) {
            RetryClass::NonceTooLow => {
                nonce = client.nonce(sender.address(), BlockTag::Latest).await?;
                tracing::info!(nonce = nonce, "Got new nonce");
                last_error = message;
                continue;
            }
            RetryClass::AlreadyKnown => {
                if let Some(hash) = last_hash {
                    tracing::info!(tx_hash = %hash, "Transaction already in mempool, waiting for confirmation");
                    match sender.wait_for_receipt(hash, options.receipt_timeout).await {
                        Ok(receipt) if receipt.status => return Ok(receipt),
                        Ok(_) => tracing::warn!(tx_hash = %hash, "Known transaction failed"),
                        Err(e) => tracing::warn!(error = %e, "Error waiting for receipt"),
                    }
                }
            }
            RetryClass::Other => {}
        }
        last_error = message;

        if n + 1 < options.max_retries {
            let delay = calculate_backoff(n + 1, options.retry_delay, max_delay);
            tracing::info!(delay_ms = delay.as_millis() as u64, "Waiting before retry");
            tokio::time::sleep(delay).await;
            nonce = client.nonce(sender.address(), BlockTag::Latest).await?;
        }
    }

    Err(TransferError::Failed {
        recipient,
        attempts: options.max_retries,
        last_error,
    })
}
