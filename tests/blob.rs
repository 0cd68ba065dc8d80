//! Blob transactions against a mock node, decoded from the raw bytes the
//! node received.

use std::time::Duration;

use alloy::consensus::TxEnvelope;
use alloy::primitives::{Address, U256};
use serde_json::json;

use chainops::blob::osaka::GAS_LIMIT_CAP;
use chainops::blob::sender::FALLBACK_GAS_LIMIT;
use chainops::blob::{send_blob, BlobSidecarBuilder, BlobTxParams, BlobTxType};
use chainops::blockchain::{RpcClient, TxSender, Wallet};
use chainops::config::TransactionConfig;

mod common;
use common::{ok, receipt, rejected, tx_hash, MockNode, Reply, DEV_KEY};

const MAX_FEE: u128 = 1_000_000_000_000;

fn params(number_of_blobs: usize) -> BlobTxParams {
    BlobTxParams {
        to: Address::repeat_byte(0x42),
        value: U256::ZERO,
        number_of_blobs,
        gas_price: MAX_FEE,
        gas_limit: None,
        nonce: None,
        tx_type: BlobTxType::Blob,
        validate_osaka: true,
        receipt_timeout: Duration::from_secs(5),
    }
}

fn node_replies(estimate: Reply) -> Vec<(&'static str, Reply)> {
    vec![
        ("eth_chainId", ok(json!("0x1"))),
        ("eth_getTransactionCount", ok(json!("0x5"))),
        ("eth_estimateGas", estimate),
        ("eth_sendRawTransaction", ok(tx_hash(0x0b))),
        ("eth_getTransactionReceipt", ok(receipt(true))),
    ]
}

async fn sender(node: &MockNode) -> TxSender {
    let client = RpcClient::new(node.rpc_config()).await.unwrap();
    let wallet = Wallet::from_private_key(DEV_KEY).unwrap();
    TxSender::new(client, wallet, &TransactionConfig::default())
}

/// The single blob transaction the node received, with its sidecar.
fn sent_blob_tx(node: &MockNode) -> (alloy::consensus::TxEip4844, usize) {
    let sent = node.sent_transactions();
    assert_eq!(sent.len(), 1);
    let TxEnvelope::Eip4844(signed) = &sent[0] else {
        panic!("expected a type-3 transaction, got {:?}", sent[0]);
    };
    let variant = signed.tx();
    let sidecar = variant.sidecar().expect("network form carries the sidecar");
    (variant.tx().clone(), sidecar.blobs().len())
}

#[tokio::test]
async fn test_blob_tx_carries_sidecar() {
    let node = MockNode::start(node_replies(ok(json!("0x186a0")))).await;
    let sender = sender(&node).await;

    let summary = send_blob(&sender, &BlobSidecarBuilder::new(), &params(2))
        .await
        .unwrap();
    assert!(summary.status);

    let (tx, blobs) = sent_blob_tx(&node);
    assert_eq!(blobs, 2);
    assert_eq!(tx.blob_versioned_hashes.len(), blobs);
    assert!(tx.blob_versioned_hashes.iter().all(|hash| hash[0] == 0x01));
    assert_eq!(tx.nonce, 5);
    assert_eq!(tx.gas_limit, 100_000);
    assert_eq!(tx.max_fee_per_blob_gas, MAX_FEE);
    assert_eq!(tx.max_fee_per_gas, MAX_FEE);
}

#[tokio::test]
async fn test_estimated_gas_is_capped() {
    let node = MockNode::start(node_replies(ok(json!("0x2000000")))).await;
    let sender = sender(&node).await;

    send_blob(&sender, &BlobSidecarBuilder::new(), &params(1))
        .await
        .unwrap();
    let (tx, _) = sent_blob_tx(&node);
    assert_eq!(tx.gas_limit, GAS_LIMIT_CAP);
}

#[tokio::test]
async fn test_failed_estimate_uses_fallback_gas() {
    let node = MockNode::start(node_replies(rejected("execution reverted"))).await;
    let sender = sender(&node).await;

    send_blob(&sender, &BlobSidecarBuilder::new(), &params(1))
        .await
        .unwrap();
    let (tx, blobs) = sent_blob_tx(&node);
    assert_eq!(tx.gas_limit, FALLBACK_GAS_LIMIT);
    assert_eq!(blobs, 1);
}

#[tokio::test]
async fn test_explicit_nonce_and_gas_skip_lookups() {
    let node = MockNode::start(node_replies(ok(json!("0x186a0")))).await;
    let sender = sender(&node).await;
    let params = BlobTxParams {
        nonce: Some(12),
        gas_limit: Some(50_000),
        ..params(1)
    };

    send_blob(&sender, &BlobSidecarBuilder::new(), &params)
        .await
        .unwrap();
    let (tx, _) = sent_blob_tx(&node);
    assert_eq!(tx.nonce, 12);
    assert_eq!(tx.gas_limit, 50_000);
    let calls = node.calls();
    assert!(!calls.iter().any(|m| m == "eth_estimateGas"));
    assert!(!calls.iter().any(|m| m == "eth_getTransactionCount"));
}
