//! Type-3 transaction construction and submission.

use std::time::Duration;

use alloy::consensus::{TxEip4844, TxEip4844WithSidecar};
use alloy::eips::eip7594::BlobTransactionSidecarVariant;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::TransactionRequest;

use crate::blob::osaka::{
    cap_gas_limit, prepare_blobs, validate_blob_data, validate_osaka_params, BlobTxType,
    BLOB_RESERVE_PRICE,
};
use crate::blob::sidecar::BlobSidecarBuilder;
use crate::blob::{BlobError, BlobResult};
use crate::blockchain::{BlockTag, BlockchainError, ReceiptSummary, TxSender};

/// Gas limit used when estimation fails.
pub const FALLBACK_GAS_LIMIT: u64 = 1_000_000;

/// Inputs of one blob transaction.
#[derive(Debug, Clone)]
pub struct BlobTxParams {
    pub to: Address,
    pub value: U256,
    pub number_of_blobs: usize,
    /// Used for max fee, priority fee and max fee per blob gas.
    pub gas_price: u128,
    pub gas_limit: Option<u64>,
    pub nonce: Option<u64>,
    pub tx_type: BlobTxType,
    /// Enforce [`validate_osaka_params`] before building anything.
    pub validate_osaka: bool,
    pub receipt_timeout: Duration,
}

/// Build, sign and submit a blob transaction, then wait for its receipt.
pub async fn send_blob(
    sender: &TxSender,
    builder: &BlobSidecarBuilder,
    params: &BlobTxParams,
) -> BlobResult<ReceiptSummary> {
    if params.validate_osaka {
        validate_osaka_params(
            params.tx_type,
            params.value,
            params.number_of_blobs,
            params.gas_limit,
        )?;
    }
    if params.gas_price < BLOB_RESERVE_PRICE {
        tracing::warn!(
            gas_price = params.gas_price,
            reserve_price = BLOB_RESERVE_PRICE,
            "Max fee per blob gas is below the blob reserve price"
        );
    }

    let blobs = prepare_blobs(params.number_of_blobs);
    validate_blob_data(&blobs)?;
    let bundle = builder.build(&blobs)?;
    for (i, hash) in bundle.versioned_hashes.iter().enumerate() {
        tracing::debug!(index = i, versioned_hash = %hash, "Computed versioned hash");
    }

    let client = sender.client();
    let chain_id = client.chain_id().await?.0;
    let nonce = match params.nonce {
        Some(nonce) => nonce,
        None => client.nonce(sender.address(), BlockTag::Pending).await?,
    };

    let gas_limit = match params.gas_limit {
        Some(gas) => gas,
        None => {
            let mut request = TransactionRequest::default()
                .with_from(sender.address())
                .with_to(params.to)
                .with_value(params.value)
                .with_nonce(nonce)
                .with_chain_id(chain_id)
                .with_max_fee_per_gas(params.gas_price)
                .with_max_priority_fee_per_gas(params.gas_price);
            request.transaction_type = Some(3);
            request.max_fee_per_blob_gas = Some(params.gas_price);
            request.blob_versioned_hashes = Some(bundle.versioned_hashes.clone());

            match client.estimate_gas(&request).await {
                Ok(gas) => {
                    tracing::info!(gas = gas, "Estimated gas");
                    gas
                }
                Err(e) => {
                    tracing::warn!(error = %e, fallback = FALLBACK_GAS_LIMIT, "Gas estimation failed, using default");
                    FALLBACK_GAS_LIMIT
                }
            }
        }
    };
    let gas_limit = cap_gas_limit(gas_limit);

    tracing::info!(
        blobs = params.number_of_blobs,
        nonce = nonce,
        gas_limit = gas_limit,
        max_fee_per_blob_gas = params.gas_price,
        "Sending blob transaction"
    );

    let tx = TxEip4844 {
        chain_id,
        nonce,
        gas_limit,
        max_fee_per_gas: params.gas_price,
        max_priority_fee_per_gas: params.gas_price,
        to: params.to,
        value: params.value,
        access_list: Default::default(),
        blob_versioned_hashes: bundle.versioned_hashes.clone(),
        max_fee_per_blob_gas: params.gas_price,
        input: Bytes::new(),
    };
    let signed = sender
        .wallet()
        .sign_blob(TxEip4844WithSidecar::from_tx_and_sidecar(
            tx,
            BlobTransactionSidecarVariant::Eip4844(bundle.sidecar),
        ))
        .map_err(wrap_signing_error)?;
    tracing::debug!(raw_len = signed.raw.len(), "Transaction signed with blobs");

    let hash = sender.send_signed(&signed).await.map_err(wrap_submission_error)?;
    tracing::info!(tx_hash = %hash, "Transaction submitted");

    let receipt = sender.wait_for_receipt(hash, params.receipt_timeout).await?;
    if receipt.status {
        tracing::info!(block = receipt.block_number, "Transaction successful");
    } else {
        tracing::warn!(block = receipt.block_number, "Transaction failed");
    }
    Ok(receipt)
}

fn wrap_signing_error(error: BlockchainError) -> BlobError {
    let message = error.to_string();
    let lower = message.to_lowercase();
    if lower.contains("blob") || lower.contains("kzg") {
        BlobError::Signing(message)
    } else {
        BlobError::Blockchain(error)
    }
}

fn wrap_submission_error(error: BlockchainError) -> BlobError {
    let message = error.to_string();
    let lower = message.to_lowercase();
    if lower.contains("blob") || lower.contains("version") {
        BlobError::Rejected(message)
    } else {
        BlobError::Blockchain(error)
    }
}

/// Signed difference `after - before`, rendered in wei.
pub fn balance_change(before: U256, after: U256) -> String {
    if after >= before {
        (after - before).to_string()
    } else {
        format!("-{}", before - after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_errors_get_osaka_hint() {
        let err = wrap_submission_error(BlockchainError::Rejected(
            "invalid blob versioned hash".into(),
        ));
        assert!(matches!(err, BlobError::Rejected(_)));
        assert!(err.to_string().contains("Osaka blob format rejected"));

        let err = wrap_submission_error(BlockchainError::Rejected("nonce too low".into()));
        assert!(matches!(err, BlobError::Blockchain(_)));
    }

    #[test]
    fn test_signing_errors_get_osaka_hint() {
        let err = wrap_signing_error(BlockchainError::Wallet("bad kzg proof".into()));
        assert!(matches!(err, BlobError::Signing(_)));
    }

    #[test]
    fn test_balance_change() {
        assert_eq!(balance_change(U256::from(10), U256::from(25)), "15");
        assert_eq!(balance_change(U256::from(25), U256::from(10)), "-15");
    }
}
