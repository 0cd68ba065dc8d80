//! Voluntary exit messages for the legacy exit contract.

use std::time::Duration;

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::TransactionRequest;

use crate::blockchain::units::{format_eth, format_gwei};
use crate::blockchain::{BlockTag, BlockchainError, ReceiptSummary, TxSender};
use crate::validator::{ensure_funds, Pubkey, ValidatorError, ValidatorResult};

pub const EXIT_GAS: u64 = 100_000;

#[derive(Debug, Clone)]
pub struct VoluntaryExit {
    pub pubkey: Pubkey,
    pub validator_index: u32,
}

impl VoluntaryExit {
    /// `pubkey || validator_index` (u32 big-endian), 52 bytes.
    pub fn calldata(&self) -> Bytes {
        let mut data = Vec::with_capacity(52);
        data.extend_from_slice(self.pubkey.0.as_slice());
        data.extend_from_slice(&self.validator_index.to_be_bytes());
        Bytes::from(data)
    }
}

/// Submit a voluntary exit to `contract` after the caller confirms.
pub async fn send_voluntary_exit(
    sender: &TxSender,
    contract: Address,
    exit: &VoluntaryExit,
    confirm: &dyn Fn(&str) -> bool,
    wait: Duration,
) -> ValidatorResult<ReceiptSummary> {
    let client = sender.client();
    let balance = client.balance(sender.address()).await?;
    tracing::info!(
        account = %sender.address(),
        balance_eth = %format_eth(balance),
        pubkey = %exit.pubkey,
        validator_index = exit.validator_index,
        "Preparing voluntary exit"
    );

    let prompt = format!(
        "Voluntary exit is IRREVERSIBLE. Are you ABSOLUTELY SURE you want to exit validator {}?",
        exit.validator_index
    );
    if !confirm(&prompt) {
        return Err(ValidatorError::Cancelled("Voluntary exit"));
    }

    let gas_price = client.gas_price().await?;
    let estimated_fee = U256::from(gas_price).saturating_mul(U256::from(EXIT_GAS));
    tracing::info!(
        gas_price_gwei = %format_gwei(gas_price),
        estimated_fee_eth = %format_eth(estimated_fee),
        "Estimated transaction fee"
    );
    ensure_funds(sender.address(), balance, estimated_fee)?;

    let nonce = client.nonce(sender.address(), BlockTag::Latest).await?;
    let chain_id = client.chain_id().await?.0;
    let tx = TransactionRequest::default()
        .with_from(sender.address())
        .with_to(contract)
        .with_input(exit.calldata())
        .with_gas_limit(EXIT_GAS)
        .with_gas_price(gas_price)
        .with_nonce(nonce)
        .with_chain_id(chain_id);

    let hash = sender.sign_and_send(tx).await?;
    tracing::info!(tx_hash = %hash, "Transaction sent");

    let receipt = sender.wait_for_receipt(hash, wait).await?;
    if !receipt.status {
        return Err(BlockchainError::Reverted(format!("{} failed with status 0", hash)).into());
    }
    Ok(receipt)
}
