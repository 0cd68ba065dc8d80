//! ETH and token transfers against a mock node: nonce recovery, retry
//! exhaustion, pending-nonce handling and the EIP-1559 fallback.

use std::cell::Cell;
use std::time::Duration;

use alloy::consensus::Transaction;
use alloy::primitives::{Address, U256};
use serde_json::json;

use chainops::blockchain::{RpcClient, TxSender, Wallet};
use chainops::config::TransactionConfig;
use chainops::transfer::{
    resolve_start_nonce, transfer_eth, transfer_tokens, TransferError, TransferOptions,
};

mod common;
use common::{ok, receipt, rejected, tx_hash, word, MockNode, Reply, DEV_ADDRESS, DEV_KEY};

const RECIPIENT: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";
const GAS_PRICE: u128 = 2_000_000_000;

fn recipient() -> Address {
    RECIPIENT.parse().unwrap()
}

fn options() -> TransferOptions {
    TransferOptions {
        gas_price: Some(GAS_PRICE),
        gas_price_multiplier: 2.0,
        cancel_gas_price_multiplier: 5,
        max_retries: 3,
        retry_delay: Duration::from_millis(10),
        receipt_timeout: Duration::from_millis(200),
    }
}

async fn sender(node: &MockNode, poll_interval_ms: u64) -> TxSender {
    let client = RpcClient::new(node.rpc_config()).await.unwrap();
    let wallet = Wallet::from_private_key(DEV_KEY).unwrap();
    let config = TransactionConfig {
        poll_interval_ms,
        ..Default::default()
    };
    TxSender::new(client, wallet, &config)
}

fn never_cancel(_: u64) -> bool {
    false
}

#[tokio::test]
async fn test_eth_transfer_is_legacy_with_fixed_gas() {
    let node = MockNode::start(vec![
        ("eth_getBalance", ok(json!("0xde0b6b3a7640000"))),
        ("eth_chainId", ok(json!("0x1"))),
        ("eth_getTransactionCount", ok(json!("0x5"))),
        ("eth_sendRawTransaction", ok(tx_hash(0x01))),
        ("eth_getTransactionReceipt", ok(receipt(true))),
    ])
    .await;
    let sender = sender(&node, 1000).await;

    let receipts = transfer_eth(&sender, &[recipient()], U256::from(7), &options(), &never_cancel)
        .await
        .unwrap();
    assert_eq!(receipts.len(), 1);

    let sent = node.sent_transactions();
    assert_eq!(sent.len(), 1);
    let tx = &sent[0];
    assert!(tx.is_legacy());
    assert_eq!(tx.nonce(), 5);
    assert_eq!(tx.gas_limit(), 21_000);
    assert_eq!(tx.gas_price(), Some(GAS_PRICE));
    assert_eq!(tx.value(), U256::from(7));
    assert_eq!(tx.to(), Some(recipient()));
}

#[tokio::test]
async fn test_nonce_too_low_refreshes_latest_until_exhausted() {
    let node = MockNode::start(vec![
        ("eth_getBalance", ok(json!("0xde0b6b3a7640000"))),
        ("eth_chainId", ok(json!("0x1"))),
        (
            "eth_getTransactionCount@latest",
            Reply::Sequence(vec![ok(json!("0x5")), ok(json!("0x9"))]),
        ),
        ("eth_getTransactionCount@pending", ok(json!("0x5"))),
        ("eth_sendRawTransaction", rejected("nonce too low")),
    ])
    .await;
    let sender = sender(&node, 1000).await;

    let err = transfer_eth(&sender, &[recipient()], U256::from(7), &options(), &never_cancel)
        .await
        .unwrap_err();
    match err {
        TransferError::Failed {
            recipient: failed,
            attempts,
            last_error,
        } => {
            assert_eq!(failed, recipient());
            assert_eq!(attempts, 3);
            assert!(last_error.contains("nonce too low"));
        }
        other => panic!("expected Failed, got {:?}", other),
    }

    let nonces: Vec<u64> = node.sent_transactions().iter().map(|tx| tx.nonce()).collect();
    assert_eq!(nonces, vec![5, 9, 9]);
}

#[tokio::test]
async fn test_already_known_waits_for_previous_hash() {
    let node = MockNode::start(vec![
        ("eth_getBalance", ok(json!("0xde0b6b3a7640000"))),
        ("eth_chainId", ok(json!("0x1"))),
        ("eth_getTransactionCount", ok(json!("0x5"))),
        (
            "eth_sendRawTransaction",
            Reply::Sequence(vec![ok(tx_hash(0x01)), rejected("already known")]),
        ),
        // The first attempt sees nothing before its deadline; the wait on the
        // known hash then finds it mined.
        (
            "eth_getTransactionReceipt",
            Reply::Sequence(vec![ok(json!(null)), ok(receipt(true))]),
        ),
    ])
    .await;
    let sender = sender(&node, 1000).await;

    let receipts = transfer_eth(&sender, &[recipient()], U256::from(7), &options(), &never_cancel)
        .await
        .unwrap();
    assert!(receipts[0].status);
    assert_eq!(node.sent_transactions().len(), 2);

    let receipt_lookups = node.params("eth_getTransactionReceipt");
    assert_eq!(receipt_lookups.len(), 2);
    assert_eq!(receipt_lookups[1][0], tx_hash(0x01));
}

#[tokio::test]
async fn test_receipt_lookup_errors_are_retried() {
    let node = MockNode::start(vec![
        ("eth_getBalance", ok(json!("0xde0b6b3a7640000"))),
        ("eth_chainId", ok(json!("0x1"))),
        ("eth_getTransactionCount", ok(json!("0x5"))),
        ("eth_sendRawTransaction", ok(tx_hash(0x01))),
        (
            "eth_getTransactionReceipt",
            Reply::Sequence(vec![rejected("header not found"), ok(receipt(true))]),
        ),
    ])
    .await;
    let sender = sender(&node, 20).await;
    let options = TransferOptions {
        receipt_timeout: Duration::from_secs(5),
        ..options()
    };

    transfer_eth(&sender, &[recipient()], U256::from(7), &options, &never_cancel)
        .await
        .unwrap();
    assert_eq!(node.sent_transactions().len(), 1);
    assert_eq!(node.params("eth_getTransactionReceipt").len(), 2);
}

#[tokio::test]
async fn test_declined_cancel_queues_behind_pending() {
    let node = MockNode::start(vec![
        ("eth_getTransactionCount@latest", ok(json!("0x3"))),
        ("eth_getTransactionCount@pending", ok(json!("0x5"))),
    ])
    .await;
    let sender = sender(&node, 1000).await;
    let asked = Cell::new(None);

    let nonce = resolve_start_nonce(&sender, 5, &|stuck| {
        asked.set(Some(stuck));
        false
    })
    .await
    .unwrap();
    assert_eq!(nonce, 5);
    assert_eq!(asked.get(), Some(2));
    assert!(node.sent_transactions().is_empty());
}

#[tokio::test]
async fn test_cancel_replaces_stuck_nonces() {
    let node = MockNode::start(vec![
        (
            "eth_getTransactionCount@latest",
            Reply::Sequence(vec![ok(json!("0x3")), ok(json!("0x5"))]),
        ),
        ("eth_getTransactionCount@pending", ok(json!("0x5"))),
        ("eth_chainId", ok(json!("0x1"))),
        ("eth_gasPrice", ok(json!("0x3b9aca00"))),
        ("eth_sendRawTransaction", ok(tx_hash(0x03))),
        ("eth_getTransactionReceipt", ok(receipt(true))),
    ])
    .await;
    let sender = sender(&node, 1000).await;

    let nonce = resolve_start_nonce(&sender, 5, &|_| true).await.unwrap();
    assert_eq!(nonce, 5);

    let sent = node.sent_transactions();
    let nonces: Vec<u64> = sent.iter().map(|tx| tx.nonce()).collect();
    assert_eq!(nonces, vec![3, 4]);
    let me: Address = DEV_ADDRESS.parse().unwrap();
    for tx in &sent {
        assert_eq!(tx.to(), Some(me));
        assert_eq!(tx.value(), U256::ZERO);
        assert_eq!(tx.gas_price(), Some(5_000_000_000));
    }
}

/// ABI encoding of a single `string` return value.
fn abi_string(value: &str) -> String {
    let mut data = format!("{:064x}{:064x}", 0x20, value.len());
    let mut padded = value.as_bytes().to_vec();
    padded.resize(value.len().div_ceil(32) * 32, 0);
    data.push_str(&alloy::primitives::hex::encode(padded));
    format!("0x{}", data)
}

#[tokio::test]
async fn test_token_transfer_falls_back_to_eip1559() {
    let token: Address = "0x5fbdb2315678afecb367f032d93f642f64180aa3".parse().unwrap();
    let node = MockNode::start(vec![
        (
            "eth_call",
            Reply::Sequence(vec![
                ok(json!(abi_string("TKN"))),
                ok(json!(word(18))),
                ok(json!(word(10_000_000_000_000_000_000))),
            ]),
        ),
        ("eth_getBalance", ok(json!("0xde0b6b3a7640000"))),
        ("eth_gasPrice", ok(json!("0x3b9aca00"))),
        ("eth_chainId", ok(json!("0x1"))),
        ("eth_getTransactionCount", ok(json!("0x2"))),
        (
            "eth_sendRawTransaction",
            Reply::Sequence(vec![rejected("transaction type not supported"), ok(tx_hash(0x04))]),
        ),
        ("eth_getTransactionReceipt", ok(receipt(true))),
    ])
    .await;
    let sender = sender(&node, 1000).await;

    let receipts = transfer_tokens(
        &sender,
        token,
        &[recipient()],
        "2.5",
        &options(),
        &never_cancel,
        &|_| panic!("ETH balance covers gas"),
    )
    .await
    .unwrap();
    assert_eq!(receipts.len(), 1);

    let sent = node.sent_transactions();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].is_legacy());
    assert!(sent[1].is_eip1559());
    assert_eq!(sent[1].nonce(), sent[0].nonce());
    assert_eq!(sent[1].to(), Some(token));
    assert_eq!(sent[1].max_fee_per_gas(), GAS_PRICE);
    assert_eq!(sent[1].max_priority_fee_per_gas(), Some(GAS_PRICE));

    let input = sent[1].input();
    assert_eq!(&input[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
    assert_eq!(&input[16..36], recipient().as_slice());
    assert_eq!(
        U256::from_be_slice(&input[36..68]),
        U256::from(2_500_000_000_000_000_000u128)
    );
}
