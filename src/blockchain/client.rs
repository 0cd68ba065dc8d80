//! Blockchain RPC client with timeout and failover.
//!
//! # Responsibilities
//! - Connect to the primary JSON-RPC endpoint and any failovers
//! - Query chain state (nonces, balances, fees, storage, receipts)
//! - Submit signed raw transactions
//! - Pass node error responses through untouched so callers can classify them

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alloy::eips::BlockId;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use alloy::transports::TransportResult;
use serde_json::{json, Value};
use tokio::time::timeout;

use crate::blockchain::types::{BlockTag, BlockchainError, BlockchainResult, ChainId};
use crate::config::RpcConfig;

type DynProvider = Arc<dyn Provider + Send + Sync>;

/// Blockchain RPC client wrapper with failover support.
#[derive(Clone)]
pub struct RpcClient {
    /// List of providers (primary + failovers).
    providers: Vec<DynProvider>,
    /// Configuration.
    config: RpcConfig,
    /// Request timeout duration.
    timeout_duration: Duration,
}

enum Failure {
    Transport(String),
    Timeout,
}

impl RpcClient {
    /// Create a new client.
    ///
    /// Fails only on an unparsable primary URL. When `chain_id` is configured
    /// a mismatch is logged but does not prevent the client from being used.
    pub async fn new(config: RpcConfig) -> BlockchainResult<Self> {
        let client = Self::connect(config)?;

        if let Some(expected) = client.config.chain_id {
            match client.chain_id().await {
                Ok(actual) if actual.0 != expected => {
                    tracing::warn!(
                        error = %BlockchainError::ChainMismatch { expected, actual: actual.0 },
                        "Connected to an unexpected chain"
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Chain verification failed"),
            }
        }

        tracing::debug!(
            rpc_url = %client.config.url,
            failovers = client.providers.len() - 1,
            "RPC client initialized"
        );
        Ok(client)
    }

    /// Create the client without touching the network.
    pub fn connect(config: RpcConfig) -> BlockchainResult<Self> {
        let timeout_duration = Duration::from_secs(config.timeout_secs);
        let mut providers = Vec::new();

        let primary_url: url::Url = config.url.parse().map_err(|e| {
            BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", config.url, e))
        })?;
        providers.push(Arc::new(ProviderBuilder::new().connect_http(primary_url)) as DynProvider);

        for url_str in &config.failover_urls {
            if let Ok(url) = url_str.parse() {
                providers.push(Arc::new(ProviderBuilder::new().connect_http(url)) as DynProvider);
            } else {
                tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL");
            }
        }

        Ok(Self {
            providers,
            config,
            timeout_duration,
        })
    }

    /// Run `call` against each provider in turn.
    ///
    /// Transport errors and timeouts move on to the next provider. An error
    /// response from a node is returned immediately as `Rejected`.
    async fn with_failover<T, F, Fut>(&self, method: &str, call: F) -> BlockchainResult<T>
    where
        F: Fn(DynProvider) -> Fut,
        Fut: Future<Output = TransportResult<T>>,
    {
        let mut last_failure = Failure::Timeout;
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, call(provider.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    if let Some(payload) = e.as_error_resp() {
                        return Err(BlockchainError::Rejected(payload.message.to_string()));
                    }
                    tracing::warn!(provider_idx = i, method, error = %e, "RPC error, trying next provider");
                    last_failure = Failure::Transport(e.to_string());
                }
                Err(_) => {
                    tracing::warn!(provider_idx = i, method, "RPC timeout, trying next provider");
                    last_failure = Failure::Timeout;
                }
            }
        }
        match last_failure {
            Failure::Timeout => Err(BlockchainError::Timeout(self.config.timeout_secs)),
            Failure::Transport(e) => Err(BlockchainError::Rpc(format!(
                "All RPC providers failed for {}: {}",
                method, e
            ))),
        }
    }

    /// Get the chain ID from the RPC.
    pub async fn chain_id(&self) -> BlockchainResult<ChainId> {
        self.with_failover("eth_chainId", |p| async move { p.get_chain_id().await })
            .await
            .map(ChainId)
    }

    /// Get the latest block number.
    pub async fn block_number(&self) -> BlockchainResult<u64> {
        self.with_failover("eth_blockNumber", |p| async move { p.get_block_number().await })
            .await
    }

    /// Get the balance of an address at the latest block.
    pub async fn balance(&self, address: Address) -> BlockchainResult<U256> {
        self.with_failover("eth_getBalance", move |p| async move {
            p.get_balance(address).await
        })
        .await
    }

    /// Get the transaction count (nonce) for an address.
    pub async fn nonce(&self, address: Address, tag: BlockTag) -> BlockchainResult<u64> {
        self.with_failover("eth_getTransactionCount", move |p| async move {
            match tag {
                BlockTag::Latest => p.get_transaction_count(address).latest().await,
                BlockTag::Pending => p.get_transaction_count(address).pending().await,
            }
        })
        .await
    }

    /// Get current gas price in wei.
    pub async fn gas_price(&self) -> BlockchainResult<u128> {
        self.with_failover("eth_gasPrice", |p| async move { p.get_gas_price().await })
            .await
    }

    /// Get the node's suggested priority fee in wei.
    pub async fn max_priority_fee(&self) -> BlockchainResult<u128> {
        self.with_failover("eth_maxPriorityFeePerGas", |p| async move {
            p.get_max_priority_fee_per_gas().await
        })
        .await
    }

    /// Base fee of the latest block in wei.
    pub async fn base_fee(&self) -> BlockchainResult<u128> {
        let block = self
            .raw_request("eth_getBlockByNumber", json!(["latest", false]))
            .await?;
        block
            .get("baseFeePerGas")
            .and_then(parse_quantity)
            .ok_or_else(|| BlockchainError::Rpc("Latest block has no baseFeePerGas".to_string()))
    }

    /// Estimate gas for a transaction request.
    pub async fn estimate_gas(&self, tx: &TransactionRequest) -> BlockchainResult<u64> {
        self.with_failover("eth_estimateGas", |p| {
            let tx = tx.clone();
            async move { p.estimate_gas(tx).await }
        })
        .await
    }

    /// Execute a call without creating a transaction.
    pub async fn call(&self, tx: &TransactionRequest, block: BlockId) -> BlockchainResult<Bytes> {
        self.with_failover("eth_call", |p| {
            let tx = tx.clone();
            async move { p.call(tx).block(block).await }
        })
        .await
    }

    /// Read a storage slot at the latest block.
    pub async fn storage_at(&self, address: Address, slot: U256) -> BlockchainResult<U256> {
        self.with_failover("eth_getStorageAt", move |p| async move {
            p.get_storage_at(address, slot).await
        })
        .await
    }

    /// Get deployed bytecode at an address.
    pub async fn code_at(&self, address: Address) -> BlockchainResult<Bytes> {
        self.with_failover("eth_getCode", move |p| async move {
            p.get_code_at(address).await
        })
        .await
    }

    /// Broadcast an EIP-2718 encoded signed transaction.
    pub async fn send_raw(&self, raw: &[u8]) -> BlockchainResult<TxHash> {
        let raw = Bytes::copy_from_slice(raw);
        self.with_failover("eth_sendRawTransaction", |p| {
            let raw = raw.clone();
            async move {
                p.send_raw_transaction(&raw)
                    .await
                    .map(|pending| *pending.tx_hash())
            }
        })
        .await
    }

    /// Get a transaction receipt by hash.
    pub async fn receipt(&self, tx_hash: TxHash) -> BlockchainResult<Option<TransactionReceipt>> {
        self.with_failover("eth_getTransactionReceipt", move |p| async move {
            p.get_transaction_receipt(tx_hash).await
        })
        .await
    }

    /// Issue an arbitrary JSON-RPC request and return the raw result.
    pub async fn raw_request(&self, method: &str, params: Value) -> BlockchainResult<Value> {
        let params = serde_json::value::to_raw_value(&params)
            .map_err(|e| BlockchainError::InvalidInput(format!("Invalid params: {}", e)))?;
        let raw = self
            .with_failover(method, |p| {
                let params = params.clone();
                let method = method.to_string();
                async move { p.raw_request_dyn(method.into(), &params).await }
            })
            .await?;
        serde_json::from_str(raw.get())
            .map_err(|e| BlockchainError::Rpc(format!("Invalid {} response: {}", method, e)))
    }

    /// Get the configuration.
    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    /// Primary endpoint URL.
    pub fn url(&self) -> &str {
        &self.config.url
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("rpc_url", &self.config.url)
            .field("failovers", &self.config.failover_urls.len())
            .field("timeout_secs", &self.config.timeout_secs)
            .finish()
    }
}

/// Parse a JSON-RPC quantity given either as a hex string or a plain number.
pub fn parse_quantity(value: &Value) -> Option<u128> {
    match value {
        Value::String(s) => match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some("") => Some(0),
            Some(hex) => u128::from_str_radix(hex, 16).ok(),
            None => s.parse().ok(),
        },
        Value::Number(n) => n.as_u64().map(u128::from),
        _ => None,
    }
}
