//! Wallet management and transaction signing.
//!
//! # Security
//! - Keys come from flags, environment variables or encrypted keystores
//! - Keys are never logged or serialized

use std::path::Path;

use alloy::consensus::{SignableTransaction, TxEip4844Variant, TxEip4844WithSidecar, TxEnvelope};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;

use crate::blockchain::types::{BlockchainError, BlockchainResult};

/// Environment variable name for the private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "CHAINOPS_PRIVATE_KEY";

/// A signed transaction ready for `eth_sendRawTransaction`.
#[derive(Debug, Clone)]
pub struct SignedTx {
    pub hash: TxHash,
    pub raw: Bytes,
}

/// Wallet for transaction signing.
#[derive(Debug, Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
}

impl Wallet {
    /// Create a wallet from a hex-encoded private key string.
    ///
    /// Accepts the key with or without a `0x` prefix.
    pub fn from_private_key(private_key_hex: &str) -> BlockchainResult<Self> {
        let trimmed = private_key_hex.trim();
        let key_hex = trimmed.strip_prefix("0x").unwrap_or(trimmed);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| BlockchainError::Wallet(format!("Invalid private key format: {}", e)))?;

        tracing::debug!(address = %signer.address(), "Wallet initialized");
        Ok(Self { signer })
    }

    /// Decrypt a JSON keystore file.
    pub fn from_keystore(path: &Path, password: &str) -> BlockchainResult<Self> {
        let signer = PrivateKeySigner::decrypt_keystore(path, password).map_err(|e| {
            BlockchainError::Wallet(format!(
                "Failed to decrypt keystore {}: {}",
                path.display(),
                e
            ))
        })?;

        tracing::debug!(address = %signer.address(), keystore = %path.display(), "Wallet initialized");
        Ok(Self { signer })
    }

    /// Generate a wallet with a fresh random key.
    pub fn random() -> Self {
        Self {
            signer: PrivateKeySigner::random(),
        }
    }

    /// Get the wallet's address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// The underlying signer.
    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }

    /// Sign a fully populated request (nonce, gas, fees, chain id).
    pub async fn sign_request(&self, tx: TransactionRequest) -> BlockchainResult<SignedTx> {
        let wallet = EthereumWallet::from(self.signer.clone());
        let envelope: TxEnvelope = tx
            .build(&wallet)
            .await
            .map_err(|e| BlockchainError::Wallet(format!("Signing failed: {}", e)))?;

        Ok(SignedTx {
            hash: *envelope.tx_hash(),
            raw: envelope.encoded_2718().into(),
        })
    }

    /// Sign a blob transaction and encode it in network form (with sidecar).
    pub fn sign_blob(&self, tx: TxEip4844WithSidecar) -> BlockchainResult<SignedTx> {
        let tx = TxEip4844Variant::TxEip4844WithSidecar(tx);
        let signature = self
            .signer
            .sign_hash_sync(&tx.signature_hash())
            .map_err(|e| BlockchainError::Wallet(format!("Signing failed: {}", e)))?;

        let envelope = TxEnvelope::Eip4844(tx.into_signed(signature));
        Ok(SignedTx {
            hash: *envelope.tx_hash(),
            raw: envelope.encoded_2718().into(),
        })
    }
}
