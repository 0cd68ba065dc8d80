//! Validator request pre-flight checks against a mock node.

use std::time::Duration;

use alloy::consensus::Transaction;
use alloy::primitives::U256;
use serde_json::json;

use chainops::blockchain::{RpcClient, TxSender, Wallet};
use chainops::config::TransactionConfig;
use chainops::validator::consolidation::consolidation_fee;
use chainops::validator::{
    send_consolidation, send_withdrawal, Pubkey, ValidatorError, WithdrawalRequest,
    CONSOLIDATION_CONTRACT, WITHDRAWAL_CONTRACT,
};

mod common;
use common::{ok, receipt, tx_hash, word, MockNode, Reply, DEV_KEY};

const PUBKEY: &str = "0xa1d1ad0714035353258038e964ae9675dc0252ee22cea896825c01458e1807bfad2f9969338798548d9858a571f7425c";

async fn sender(node: &MockNode) -> TxSender {
    let client = RpcClient::new(node.rpc_config()).await.unwrap();
    let wallet = Wallet::from_private_key(DEV_KEY).unwrap();
    TxSender::new(client, wallet, &TransactionConfig::default())
}

#[tokio::test]
async fn test_consolidation_fee_reads_contract() {
    let node = MockNode::start(vec![("eth_call", ok(json!(word(5))))]).await;
    let client = RpcClient::new(node.rpc_config()).await.unwrap();
    assert_eq!(consolidation_fee(&client, CONSOLIDATION_CONTRACT).await, U256::from(5));
}

#[tokio::test]
async fn test_consolidation_fee_floor() {
    let zero = MockNode::start(vec![("eth_call", ok(json!(word(0))))]).await;
    let client = RpcClient::new(zero.rpc_config()).await.unwrap();
    assert_eq!(consolidation_fee(&client, CONSOLIDATION_CONTRACT).await, U256::from(1));

    let failing = MockNode::start(vec![("eth_call", Reply::Error(3, "execution reverted".into()))]).await;
    let client = RpcClient::new(failing.rpc_config()).await.unwrap();
    assert_eq!(consolidation_fee(&client, CONSOLIDATION_CONTRACT).await, U256::from(1));
}

#[tokio::test]
async fn test_consolidation_needs_contract_code() {
    let node = MockNode::start(vec![("eth_getCode", ok(json!("0x")))]).await;
    let sender = sender(&node).await;
    let pubkey: Pubkey = PUBKEY.parse().unwrap();

    let err = send_consolidation(&sender, &pubkey, &pubkey, true, Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(matches!(err, ValidatorError::MissingContract(a) if a == CONSOLIDATION_CONTRACT));
}

#[tokio::test]
async fn test_exit_declined_sends_nothing() {
    let node = MockNode::start(vec![("eth_getBalance", ok(json!("0x1")))]).await;
    let sender = sender(&node).await;
    let request = WithdrawalRequest::from_eth(PUBKEY.parse().unwrap(), "0").unwrap();

    let err = send_withdrawal(
        &sender,
        WITHDRAWAL_CONTRACT,
        &request,
        &|_| false,
        Duration::from_secs(1),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ValidatorError::Cancelled(_)));
    assert!(!node.calls().iter().any(|m| m == "eth_sendRawTransaction"));
}

#[tokio::test]
async fn test_withdrawal_blocked_by_inhibitor() {
    let node = MockNode::start(vec![
        ("eth_getBalance", ok(json!("0xde0b6b3a7640000"))),
        ("eth_getStorageAt", ok(json!(format!("0x{}", "f".repeat(64))))),
    ])
    .await;
    let sender = sender(&node).await;
    let request = WithdrawalRequest::from_eth(PUBKEY.parse().unwrap(), "1.5").unwrap();

    let err = send_withdrawal(
        &sender,
        WITHDRAWAL_CONTRACT,
        &request,
        &|_| panic!("partial withdrawals below 32 ETH are not confirmed"),
        Duration::from_secs(1),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ValidatorError::ExcessInhibitor));
}

#[tokio::test]
async fn test_withdrawal_needs_fee_funds() {
    let node = MockNode::start(vec![
        ("eth_getBalance", ok(json!("0x0"))),
        ("eth_getStorageAt", ok(json!(word(0)))),
    ])
    .await;
    let sender = sender(&node).await;
    let request = WithdrawalRequest::from_eth(PUBKEY.parse().unwrap(), "1").unwrap();

    let err = send_withdrawal(
        &sender,
        WITHDRAWAL_CONTRACT,
        &request,
        &|_| true,
        Duration::from_secs(1),
    )
    .await
    .unwrap_err();
    match err {
        ValidatorError::InsufficientFunds { needed, available, .. } => {
            assert_eq!(needed, U256::from(1));
            assert_eq!(available, U256::ZERO);
        }
        other => panic!("expected InsufficientFunds, got {:?}", other),
    }
}

#[tokio::test]
async fn test_consolidation_sends_switch_then_request() {
    let node = MockNode::start(vec![
        ("eth_getCode", ok(json!("0x6001600055"))),
        ("eth_getBalance", ok(json!("0xde0b6b3a7640000"))),
        ("eth_call", ok(json!(word(5)))),
        ("eth_chainId", ok(json!("0x1"))),
        (
            "eth_getTransactionCount",
            Reply::Sequence(vec![ok(json!("0x3")), ok(json!("0x4"))]),
        ),
        ("eth_gasPrice", ok(json!("0x3b9aca00"))),
        ("eth_sendRawTransaction", ok(tx_hash(0x01))),
        ("eth_getTransactionReceipt", ok(receipt(true))),
    ])
    .await;
    let sender = sender(&node).await;
    let source: Pubkey = PUBKEY.parse().unwrap();
    let target: Pubkey = format!("0x{}", "b2".repeat(48)).parse().unwrap();

    let outcome = send_consolidation(&sender, &source, &target, false, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(outcome.fee, U256::from(5));
    assert!(outcome.switch.is_some());

    let sent = node.sent_transactions();
    assert_eq!(sent.len(), 2);
    let switch = [target.0.as_slice(), target.0.as_slice()].concat();
    let request = [source.0.as_slice(), target.0.as_slice()].concat();
    assert_eq!(sent[0].input().as_ref(), switch.as_slice());
    assert_eq!(sent[1].input().as_ref(), request.as_slice());
    assert_eq!(sent[0].nonce(), 3);
    assert_eq!(sent[1].nonce(), 4);
    for tx in &sent {
        assert_eq!(tx.to(), Some(CONSOLIDATION_CONTRACT));
        assert_eq!(tx.value(), U256::from(5));
        assert_eq!(tx.gas_limit(), 200_000);
    }
}

#[tokio::test]
async fn test_consolidation_skip_switch_sends_one() {
    let node = MockNode::start(vec![
        ("eth_getCode", ok(json!("0x6001600055"))),
        ("eth_getBalance", ok(json!("0xde0b6b3a7640000"))),
        ("eth_call", ok(json!(word(0)))),
        ("eth_chainId", ok(json!("0x1"))),
        ("eth_getTransactionCount", ok(json!("0x3"))),
        ("eth_gasPrice", ok(json!("0x3b9aca00"))),
        ("eth_sendRawTransaction", ok(tx_hash(0x01))),
        ("eth_getTransactionReceipt", ok(receipt(true))),
    ])
    .await;
    let sender = sender(&node).await;
    let source: Pubkey = PUBKEY.parse().unwrap();
    let target: Pubkey = format!("0x{}", "b2".repeat(48)).parse().unwrap();

    let outcome = send_consolidation(&sender, &source, &target, true, Duration::from_secs(5))
        .await
        .unwrap();
    assert!(outcome.switch.is_none());
    let sent = node.sent_transactions();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].value(), U256::from(1));
}

#[tokio::test]
async fn test_withdrawal_pays_fee_with_packed_calldata() {
    let node = MockNode::start(vec![
        ("eth_getBalance", ok(json!("0xde0b6b3a7640000"))),
        ("eth_getStorageAt", ok(json!(word(0)))),
        ("eth_getBlockByNumber", ok(json!({"number": "0x10", "baseFeePerGas": "0x7"}))),
        ("eth_getTransactionCount", ok(json!("0x9"))),
        ("eth_chainId", ok(json!("0x1"))),
        ("eth_estimateGas", ok(json!("0x1d4c0"))),
        ("eth_sendRawTransaction", ok(tx_hash(0x02))),
        ("eth_getTransactionReceipt", ok(receipt(true))),
    ])
    .await;
    let sender = sender(&node).await;
    let request = WithdrawalRequest::from_eth(PUBKEY.parse().unwrap(), "1.5").unwrap();

    let summary = send_withdrawal(
        &sender,
        WITHDRAWAL_CONTRACT,
        &request,
        &|_| panic!("partial withdrawals below 32 ETH are not confirmed"),
        Duration::from_secs(5),
    )
    .await
    .unwrap();
    assert!(summary.status);

    let sent = node.sent_transactions();
    assert_eq!(sent.len(), 1);
    let tx = &sent[0];
    assert!(tx.is_eip1559());
    assert_eq!(tx.to(), Some(WITHDRAWAL_CONTRACT));
    assert_eq!(tx.value(), U256::from(1));
    assert_eq!(tx.nonce(), 9);
    assert_eq!(tx.gas_limit(), 120_000);

    let input = tx.input();
    assert_eq!(input.len(), 56);
    assert_eq!(&input[..48], request.pubkey.0.as_slice());
    assert_eq!(&input[48..], &1_500_000_000u64.to_be_bytes());
}
