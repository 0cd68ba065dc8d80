//! Decoding of raw signed transactions.

use alloy::consensus::transaction::SignerRecoverable;
use alloy::consensus::TxEnvelope;
use alloy::eips::eip2718::Decodable2718;
use alloy::primitives::{hex, Address};
use serde_json::Value;

use crate::blockchain::types::{BlockchainError, BlockchainResult};

/// A decoded signed transaction with its recovered sender.
#[derive(Debug, Clone)]
pub struct DecodedTransaction {
    pub envelope: TxEnvelope,
    pub from: Address,
}

impl DecodedTransaction {
    /// JSON rendering of the transaction fields plus `hash` and `from`.
    pub fn to_json(&self) -> BlockchainResult<Value> {
        let mut value = serde_json::to_value(&self.envelope)
            .map_err(|e| BlockchainError::InvalidInput(format!("Cannot render transaction: {}", e)))?;
        if let Value::Object(map) = &mut value {
            map.insert("hash".into(), Value::String(self.envelope.tx_hash().to_string()));
            map.insert("from".into(), Value::String(self.from.to_checksum(None)));
        }
        Ok(value)
    }
}

/// Decode a hex-encoded signed transaction (legacy or typed).
///
/// Whitespace and an optional `0x` prefix are ignored.
pub fn decode_raw_transaction(raw_hex: &str) -> BlockchainResult<DecodedTransaction> {
    let cleaned: String = raw_hex.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = hex::decode(&cleaned)
        .map_err(|e| BlockchainError::InvalidInput(format!("Transaction is not valid hex: {}", e)))?;
    if bytes.is_empty() {
        return Err(BlockchainError::InvalidInput("Transaction is empty".to_string()));
    }

    let envelope = TxEnvelope::decode_2718(&mut bytes.as_slice())
        .map_err(|e| BlockchainError::InvalidInput(format!("Cannot decode transaction: {}", e)))?;
    let from = envelope
        .recover_signer()
        .map_err(|e| BlockchainError::InvalidInput(format!("Cannot recover sender: {}", e)))?;

    Ok(DecodedTransaction { envelope, from })
}
