//! RPC client, txpool and nonce inspection against a mock node.

use alloy::primitives::{Address, U256};
use serde_json::json;

use chainops::blockchain::{BlockTag, BlockchainError, RpcClient};
use chainops::config::RpcConfig;
use chainops::transfer::nonce_report;
use chainops::txpool::{pending_by_type, pool_status};

mod common;
use common::{ok, MockNode, Reply, DEV_ADDRESS};

fn dev_address() -> Address {
    DEV_ADDRESS.parse().unwrap()
}

#[tokio::test]
async fn test_basic_reads() {
    let node = MockNode::start(vec![
        ("eth_blockNumber", ok(json!("0x2a"))),
        ("eth_getBalance", ok(json!("0xde0b6b3a7640000"))),
        ("eth_getTransactionCount", ok(json!("0x7"))),
    ])
    .await;
    let client = RpcClient::new(node.rpc_config()).await.unwrap();

    assert_eq!(client.block_number().await.unwrap(), 42);
    assert_eq!(
        client.balance(dev_address()).await.unwrap(),
        U256::from(1_000_000_000_000_000_000u64)
    );
    assert_eq!(client.nonce(dev_address(), BlockTag::Pending).await.unwrap(), 7);
}

#[tokio::test]
async fn test_node_error_is_rejected_without_failover() {
    let node = MockNode::start(vec![(
        "eth_sendRawTransaction",
        Reply::Error(-32000, "nonce too low".into()),
    )])
    .await;
    let backup = MockNode::start(vec![]).await;
    let client = RpcClient::connect(RpcConfig {
        failover_urls: vec![backup.url()],
        ..node.rpc_config()
    })
    .unwrap();

    let err = client.send_raw(&[0x02, 0xc0]).await.unwrap_err();
    match err {
        BlockchainError::Rejected(message) => assert!(message.contains("nonce too low")),
        other => panic!("expected Rejected, got {:?}", other),
    }
    assert!(backup.calls().is_empty());
}

#[tokio::test]
async fn test_transport_failure_moves_to_next_url() {
    let node = MockNode::start(vec![("eth_blockNumber", ok(json!("0x10")))]).await;
    let client = RpcClient::connect(RpcConfig {
        url: "http://127.0.0.1:1".to_string(),
        failover_urls: vec![node.url()],
        timeout_secs: 5,
        chain_id: None,
    })
    .unwrap();

    assert_eq!(client.block_number().await.unwrap(), 16);
    assert_eq!(node.calls(), vec!["eth_blockNumber"]);
}

#[tokio::test]
async fn test_txpool_views() {
    let node = MockNode::start(vec![
        ("txpool_status", ok(json!({"pending": "0x3", "queued": "0x1"}))),
        (
            "eth_pendingTransactions",
            ok(json!([{"type": "0x2"}, {"type": "0x3"}, {"type": "0x2"}, {}])),
        ),
    ])
    .await;
    let client = RpcClient::new(node.rpc_config()).await.unwrap();

    let status = pool_status(&client).await.unwrap();
    assert_eq!((status.pending, status.queued, status.total()), (3, 1, 4));

    let breakdown = pending_by_type(&client).await.unwrap();
    assert_eq!(breakdown.total(), 4);
    assert_eq!(breakdown.counts.get("0x2"), Some(&2));
    let text = breakdown.to_string();
    assert!(text.starts_with("Total pending transactions: 4"));
    assert!(text.contains("EIP-1559: 2 (50.0%)"));
}

#[tokio::test]
async fn test_nonce_report_includes_pending_block() {
    let node = MockNode::start(vec![
        ("eth_getTransactionCount", ok(json!("0x5"))),
        (
            "eth_getBlockByNumber",
            ok(json!({
                "number": null,
                "transactions": [
                    {"from": DEV_ADDRESS.to_lowercase(), "nonce": "0x5", "hash": format!("0x{}", "ab".repeat(32))},
                    {"from": "0x70997970c51812dc3a010c7d01b50e0d17dc79c8", "nonce": "0x9"}
                ]
            })),
        ),
    ])
    .await;
    let client = RpcClient::new(node.rpc_config()).await.unwrap();

    let report = nonce_report(&client, dev_address()).await.unwrap();
    assert_eq!(report.latest, 5);
    assert_eq!(report.pending_raw, Some(5));
    assert_eq!(report.pending_txs.len(), 1);
    assert_eq!(report.pending_txs[0].nonce, Some(5));
    assert_eq!(report.max(), 5);
}
