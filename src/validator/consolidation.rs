//! EIP-7251 consolidation requests.

use std::time::Duration;

use alloy::eips::BlockId;
use alloy::network::TransactionBuilder;
use alloy::primitives::{address, Address, Bytes, U256};
use alloy::rpc::types::TransactionRequest;
use serde_json::json;

use crate::blockchain::units::format_eth;
use crate::blockchain::{BlockTag, BlockchainError, ReceiptSummary, RpcClient, TxSender};
use crate::validator::{Pubkey, ValidatorError, ValidatorResult};

/// EIP-7251 consolidation request predeploy.
pub const CONSOLIDATION_CONTRACT: Address = address!("0000BBdDc7CE488642fb579F8B00f3a590007251");

pub const CONSOLIDATION_GAS: u64 = 200_000;

/// Result of the requests sent for one consolidation.
#[derive(Debug, Clone)]
pub struct ConsolidationOutcome {
    pub fee: U256,
    /// Target → target request, absent with `skip_switch`.
    pub switch: Option<ReceiptSummary>,
    pub consolidation: ReceiptSummary,
}

/// `source || target`, 96 bytes.
pub fn consolidation_calldata(source: &Pubkey, target: &Pubkey) -> Bytes {
    let mut data = Vec::with_capacity(96);
    data.extend_from_slice(source.0.as_slice());
    data.extend_from_slice(target.0.as_slice());
    Bytes::from(data)
}

/// Current request fee read with an empty `eth_call`. Zero or a failed call
/// falls back to 1 wei.
pub async fn consolidation_fee(client: &RpcClient, contract: Address) -> U256 {
    let request = TransactionRequest::default()
        .with_to(contract)
        .with_input(Bytes::new());
    match client.call(&request, BlockId::latest()).await {
        Ok(output) => {
            let fee = U256::try_from_be_slice(&output).unwrap_or(U256::ZERO);
            if fee.is_zero() {
                tracing::warn!("Consolidation fee is 0, using 1 wei as minimum value");
                U256::from(1)
            } else {
                tracing::info!(fee_wei = %fee, "Current consolidation fee");
                fee
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to retrieve the current consolidation fee");
            tracing::warn!("Using 1 wei as minimum value");
            U256::from(1)
        }
    }
}

/// Request consolidating `source` into `target`.
///
/// Unless `skip_switch` is set, a target → target request (switch to
/// compounding credentials) is sent and confirmed first.
pub async fn send_consolidation(
    sender: &TxSender,
    source: &Pubkey,
    target: &Pubkey,
    skip_switch: bool,
    wait: Duration,
) -> ValidatorResult<ConsolidationOutcome> {
    let client = sender.client();
    let code = client.code_at(CONSOLIDATION_CONTRACT).await?;
    if code.is_empty() {
        return Err(ValidatorError::MissingContract(CONSOLIDATION_CONTRACT));
    }
    tracing::debug!(code_len = code.len(), "Consolidation contract code found");

    let balance = client.balance(sender.address()).await?;
    tracing::info!(account = %sender.address(), balance_eth = %format_eth(balance), "Signing account");

    let fee = consolidation_fee(client, CONSOLIDATION_CONTRACT).await;

    let switch = if skip_switch {
        None
    } else {
        tracing::info!(target = %target, "Sending switch to compounding request");
        Some(send_request(sender, target, target, fee, wait).await?)
    };

    tracing::info!(source = %source, target = %target, "Sending consolidation request");
    let consolidation = send_request(sender, source, target, fee, wait).await?;

    Ok(ConsolidationOutcome {
        fee,
        switch,
        consolidation,
    })
}

async fn send_request(
    sender: &TxSender,
    source: &Pubkey,
    target: &Pubkey,
    fee: U256,
    wait: Duration,
) -> ValidatorResult<ReceiptSummary> {
    let client = sender.client();
    let data = consolidation_calldata(source, target);
    let chain_id = client.chain_id().await?.0;
    let nonce = client.nonce(sender.address(), BlockTag::Latest).await?;
    let gas_price = client.gas_price().await?;

    let tx = TransactionRequest::default()
        .with_from(sender.address())
        .with_to(CONSOLIDATION_CONTRACT)
        .with_value(fee)
        .with_gas_limit(CONSOLIDATION_GAS)
        .with_gas_price(gas_price)
        .with_nonce(nonce)
        .with_chain_id(chain_id)
        .with_input(data.clone());
    tracing::info!(
        nonce = nonce,
        gas_price = gas_price,
        value_wei = %fee,
        data = %data,
        "Transaction details"
    );

    let signed = sender.wallet().sign_request(tx).await?;
    tracing::debug!(raw = %signed.raw, "Transaction signed");

    let hash = match sender.send_signed(&signed).await {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!(error = %e, "Failed to send transaction");
            tracing::debug!(
                "Equivalent curl command: {}",
                curl_command(client.url(), "eth_sendRawTransaction", json!([signed.raw]))
            );
            return Err(e.into());
        }
    };
    tracing::info!(tx_hash = %hash, "Transaction sent");

    let receipt = sender.wait_for_receipt(hash, wait).await?;
    tracing::info!(
        status = receipt.status_code(),
        block = receipt.block_number,
        gas_used = receipt.gas_used,
        "Transaction receipt"
    );
    if !receipt.status {
        let reason = revert_reason(client, sender.address(), data, receipt.block_number).await;
        return Err(ValidatorError::Reverted {
            hash: hash.to_string(),
            reason,
        });
    }
    Ok(receipt)
}

/// Replay the request at the inclusion block to recover the revert reason.
async fn revert_reason(client: &RpcClient, from: Address, data: Bytes, block: u64) -> String {
    let call = TransactionRequest::default()
        .with_from(from)
        .with_to(CONSOLIDATION_CONTRACT)
        .with_value(U256::ZERO)
        .with_gas_limit(CONSOLIDATION_GAS)
        .with_input(data);
    match client.call(&call, BlockId::number(block)).await {
        Err(BlockchainError::Rejected(message)) => message,
        Err(e) => e.to_string(),
        Ok(output) => format!("call succeeded on replay (output {})", output),
    }
}

/// `curl` invocation reproducing a JSON-RPC request.
pub fn curl_command(url: &str, method: &str, params: serde_json::Value) -> String {
    let body = json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": 1,
    });
    format!(
        "curl -X POST -H 'Content-Type: application/json' --data '{}' {}",
        body, url
    )
}
