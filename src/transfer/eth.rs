//! Native ETH transfers.

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, U256};
use alloy::rpc::types::TransactionRequest;

use crate::blockchain::units::{format_eth, format_gwei};
use crate::blockchain::{ReceiptSummary, TxSender};
use crate::transfer::nonce::resolve_start_nonce;
use crate::transfer::{
    send_with_retry, submit_and_wait, AttemptFailure, TransferError, TransferOptions,
    TransferResult,
};

const ETH_TRANSFER_GAS: u64 = 21_000;

/// Send `amount` wei to every recipient in order.
///
/// Stops at the first recipient whose retries are exhausted.
pub async fn transfer_eth(
    sender: &TxSender,
    recipients: &[Address],
    amount: U256,
    options: &TransferOptions,
    should_cancel: &dyn Fn(u64) -> bool,
) -> TransferResult<Vec<ReceiptSummary>> {
    let client = sender.client();
    let balance = client.balance(sender.address()).await?;
    let needed = amount.saturating_mul(U256::from(recipients.len()));

    tracing::info!(
        sender = %sender.address(),
        balance_eth = %format_eth(balance),
        needed_eth = %format_eth(needed),
        recipients = recipients.len(),
        "Checked sender balance"
    );
    if balance < needed {
        return Err(TransferError::InsufficientBalance {
            needed: format!("{} ETH", format_eth(needed)),
            available: format!("{} ETH", format_eth(balance)),
        });
    }

    let chain_id = client.chain_id().await?.0;
    let mut receipts = Vec::with_capacity(recipients.len());

    for (i, &recipient) in recipients.iter().enumerate() {
        tracing::info!(
            index = i + 1,
            total = recipients.len(),
            to = %recipient,
            "Starting transfer"
        );
        let start = resolve_start_nonce(sender, options.cancel_gas_price_multiplier, should_cancel)
            .await?;

        let receipt = send_with_retry(sender, recipient, options, start, move |nonce| async move {
            let gas_price = options
                .legacy_gas_price(sender)
                .await
                .map_err(|error| AttemptFailure { error, sent: None })?;
            tracing::info!(
                from = %sender.address(),
                to = %recipient,
                value_eth = %format_eth(amount),
                gas_price_gwei = %format_gwei(gas_price),
                nonce = nonce,
                "Transaction details"
            );
            let tx = TransactionRequest::default()
                .with_to(recipient)
                .with_value(amount)
                .with_nonce(nonce)
                .with_gas_limit(ETH_TRANSFER_GAS)
                .with_gas_price(gas_price)
                .with_chain_id(chain_id);
            submit_and_wait(sender, tx, options.receipt_timeout).await
        })
        .await?;

        tracing::info!(tx_hash = %receipt.hash, "Transfer succeeded");
        receipts.push(receipt);
    }

    Ok(receipts)
}
