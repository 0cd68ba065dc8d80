//! Transaction pool inspection.
//!
//! # Responsibilities
//! - `txpool_status` pending / queued counts
//! - Pending transactions grouped by EIP-2718 type
//!
//! Address nonce reports live in `transfer::nonce`.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{json, Value};

use crate::blockchain::client::parse_quantity;
use crate::blockchain::{BlockchainError, BlockchainResult, RpcClient};

/// Counts reported by `txpool_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    pub pending: u64,
    pub queued: u64,
}

impl PoolStatus {
    pub fn total(&self) -> u64 {
        self.pending + self.queued
    }

    /// Fields may be hex quantities or plain numbers; missing fields count as 0.
    pub fn from_json(value: &Value) -> BlockchainResult<Self> {
        let field = |name: &str| -> BlockchainResult<u64> {
            match value.get(name) {
                None | Some(Value::Null) => Ok(0),
                Some(v) => parse_quantity(v)
                    .and_then(|n| u64::try_from(n).ok())
                    .ok_or_else(|| {
                        BlockchainError::Rpc(format!("Invalid txpool_status {}: {}", name, v))
                    }),
            }
        };
        Ok(Self {
            pending: field("pending")?,
            queued: field("queued")?,
        })
    }
}

pub async fn pool_status(client: &RpcClient) -> BlockchainResult<PoolStatus> {
    let result = client.raw_request("txpool_status", json!([])).await?;
    PoolStatus::from_json(&result)
}

/// Human name of an EIP-2718 type tag.
pub fn type_name(tx_type: &str) -> String {
    match tx_type {
        "0x0" => "Legacy".to_string(),
        "0x1" => "Access List".to_string(),
        "0x2" => "EIP-1559".to_string(),
        "0x3" => "Blob".to_string(),
        "0x4" => "EIP-7702".to_string(),
        other => format!("Unknown ({})", other),
    }
}

/// Pending transactions counted per type tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeBreakdown {
    /// Keyed by the raw tag (`0x0`, `0x2`, ...), sorted.
    pub counts: BTreeMap<String, u64>,
}

impl TypeBreakdown {
    /// Transactions without a `type` field are legacy.
    pub fn from_transactions(transactions: &[Value]) -> Self {
        let mut counts = BTreeMap::new();
        for tx in transactions {
            let tag = tx.get("type").and_then(Value::as_str).unwrap_or("0x0");
            *counts.entry(tag.to_string()).or_insert(0) += 1;
        }
        Self { counts }
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// `(name, count, percentage)` rows in tag order.
    pub fn rows(&self) -> Vec<(String, u64, f64)> {
        let total = self.total();
        self.counts
            .iter()
            .map(|(tag, &count)| {
                let pct = if total > 0 {
                    count as f64 / total as f64 * 100.0
                } else {
                    0.0
                };
                (type_name(tag), count, pct)
            })
            .collect()
    }
}

impl fmt::Display for TypeBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total pending transactions: {}", self.total())?;
        for (name, count, pct) in self.rows() {
            writeln!(f, "{}: {} ({:.1}%)", name, count, pct)?;
        }
        Ok(())
    }
}

pub async fn pending_by_type(client: &RpcClient) -> BlockchainResult<TypeBreakdown> {
    let result = client
        .raw_request("eth_pendingTransactions", json!([]))
        .await?;
    let transactions = result.as_array().ok_or_else(|| {
        BlockchainError::Rpc("eth_pendingTransactions did not return an array".to_string())
    })?;
    Ok(TypeBreakdown::from_transactions(transactions))
}
