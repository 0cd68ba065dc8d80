//! EIP-7002 partial withdrawals and full exits.

use std::time::Duration;

use alloy::network::TransactionBuilder;
use alloy::primitives::{address, Address, Bytes, U256};
use alloy::rpc::types::TransactionRequest;

use crate::blockchain::units::{format_eth, parse_eth, wei_to_gwei};
use crate::blockchain::{BlockTag, BlockchainError, ReceiptSummary, TxSender};
use crate::validator::fee::withdrawal_fee;
use crate::validator::{ensure_funds, Pubkey, ValidatorError, ValidatorResult};

/// EIP-7002 withdrawal request predeploy.
pub const WITHDRAWAL_CONTRACT: Address = address!("00000961Ef480Eb55e80D19ad83579A64c007002");

/// Withdrawals at or above this many ETH are confirmed before sending.
pub const FULL_STAKE_ETH: u64 = 32;

/// One request against the withdrawal contract.
#[derive(Debug, Clone)]
pub struct WithdrawalRequest {
    pub pubkey: Pubkey,
    /// Amount in gwei; zero requests a full exit.
    pub amount_gwei: u64,
}

impl WithdrawalRequest {
    /// Build a request from a decimal ETH amount (`"0"` = full exit).
    pub fn from_eth(pubkey: Pubkey, amount_eth: &str) -> ValidatorResult<Self> {
        let wei = parse_eth(amount_eth)?;
        let amount_gwei = wei_to_gwei(wei)?;
        Ok(Self {
            pubkey,
            amount_gwei,
        })
    }

    pub fn is_exit(&self) -> bool {
        self.amount_gwei == 0
    }

    pub fn needs_confirmation(&self) -> bool {
        self.is_exit() || self.amount_gwei >= FULL_STAKE_ETH * 1_000_000_000
    }

    /// `pubkey || amount_gwei` (u64 big-endian), 56 bytes.
    pub fn calldata(&self) -> Bytes {
        let mut data = Vec::with_capacity(56);
        data.extend_from_slice(self.pubkey.0.as_slice());
        data.extend_from_slice(&self.amount_gwei.to_be_bytes());
        Bytes::from(data)
    }
}

/// Send a withdrawal or exit request and wait for its receipt.
///
/// `confirm` is consulted for exits and withdrawals of 32 ETH or more.
pub async fn send_withdrawal(
    sender: &TxSender,
    contract: Address,
    request: &WithdrawalRequest,
    confirm: &dyn Fn(&str) -> bool,
    wait: Duration,
) -> ValidatorResult<ReceiptSummary> {
    let client = sender.client();
    let balance = client.balance(sender.address()).await?;
    tracing::info!(
        account = %sender.address(),
        balance_eth = %format_eth(balance),
        pubkey = %request.pubkey,
        amount_gwei = request.amount_gwei,
        exit = request.is_exit(),
        "Preparing withdrawal request"
    );

    if request.is_exit() {
        if !confirm("Voluntary exit is IRREVERSIBLE. Are you ABSOLUTELY SURE you want to exit this validator?") {
            return Err(ValidatorError::Cancelled("Voluntary exit"));
        }
    } else if request.needs_confirmation()
        && !confirm("Attempting to withdraw 32 ETH or more. This may be a full withdrawal. Continue?")
    {
        return Err(ValidatorError::Cancelled("Withdrawal"));
    }

    let excess = client.storage_at(contract, U256::ZERO).await?;
    let fee = withdrawal_fee(excess)?;
    tracing::info!(excess = %excess, fee_wei = %fee, "Withdrawal request fee");
    ensure_funds(sender.address(), balance, fee)?;

    let (max_fee, priority) = sender.eip1559_fees(None).await?;
    let nonce = client.nonce(sender.address(), BlockTag::Latest).await?;
    let chain_id = client.chain_id().await?.0;
    let mut tx = TransactionRequest::default()
        .with_from(sender.address())
        .with_to(contract)
        .with_value(fee)
        .with_input(request.calldata())
        .with_nonce(nonce)
        .with_chain_id(chain_id)
        .with_max_fee_per_gas(max_fee)
        .with_max_priority_fee_per_gas(priority);
    let gas = client.estimate_gas(&tx).await?;
    tx = tx.with_gas_limit(gas);

    let hash = sender.sign_and_send(tx).await?;
    tracing::info!(tx_hash = %hash, "Transaction sent");

    let receipt = sender.wait_for_receipt(hash, wait).await?;
    if !receipt.status {
        return Err(BlockchainError::Reverted(format!("{} failed with status 0", hash)).into());
    }
    Ok(receipt)
}
