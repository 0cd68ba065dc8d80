//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for chainops.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration shared by every subcommand.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// JSON-RPC endpoint settings.
    pub rpc: RpcConfig,

    /// Transaction submission and confirmation settings.
    pub transactions: TransactionConfig,

    /// Logging settings.
    pub logging: LoggingConfig,

    /// Grafana connection defaults for log downloads.
    pub grafana: GrafanaConfig,

    /// Slack webhook defaults for CI reports.
    pub slack: SlackConfig,
}

/// JSON-RPC endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RpcConfig {
    /// JSON-RPC endpoint URL.
    pub url: String,

    /// Failover JSON-RPC endpoint URLs, tried in order on transport errors.
    pub failover_urls: Vec<String>,

    /// Expected chain ID. When set, the client warns on mismatch.
    pub chain_id: Option<u64>,

    /// RPC request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8545".to_string(),
            failover_urls: Vec::new(),
            chain_id: None,
            timeout_secs: 10,
        }
    }
}

/// Transaction submission settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransactionConfig {
    /// How long to wait for a receipt before giving up, in seconds.
    pub receipt_timeout_secs: u64,

    /// Receipt polling interval in milliseconds.
    pub poll_interval_ms: u64,

    /// Blocks on top of the inclusion block before a receipt counts as final.
    pub confirmation_blocks: u32,

    /// Attempts per transfer before giving up.
    pub max_retries: u32,

    /// Base delay between transfer attempts in seconds.
    pub retry_delay_secs: u64,

    /// Multiplier applied to `eth_gasPrice` for transfers (2.0 = double).
    pub gas_price_multiplier: f64,

    /// Multiplier applied to `eth_gasPrice` for cancellation transactions.
    pub cancel_gas_price_multiplier: u64,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            receipt_timeout_secs: 120,
            poll_interval_ms: 2000,
            confirmation_blocks: 0,
            max_retries: 3,
            retry_delay_secs: 5,
            gas_price_multiplier: 2.0,
            cancel_gas_price_multiplier: 5,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,

    /// Optional file receiving DEBUG-level output in addition to the console.
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Grafana connection defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GrafanaConfig {
    /// Grafana base URL.
    pub url: Option<String>,

    /// API key (Bearer token).
    pub api_key: Option<String>,

    /// Basic auth user, used when no API key is set.
    pub username: Option<String>,

    /// Basic auth password.
    pub password: Option<String>,

    /// Organization sent as `X-Grafana-Org-Id`.
    pub org_id: u64,

    /// Verify TLS certificates.
    pub verify_ssl: bool,

    /// HTTP timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GrafanaConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            username: None,
            password: None,
            org_id: 1,
            verify_ssl: true,
            timeout_secs: 15,
        }
    }
}

/// Slack notification defaults.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SlackConfig {
    /// Incoming webhook URL.
    pub webhook_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_file() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.rpc.url, "http://127.0.0.1:8545");
        assert_eq!(config.transactions.max_retries, 3);
        assert_eq!(config.transactions.cancel_gas_price_multiplier, 5);
        assert_eq!(config.grafana.org_id, 1);
        assert!(config.grafana.verify_ssl);
    }

    #[test]
    fn test_partial_section() {
        let config: AppConfig = toml::from_str(
            r#"
            [rpc]
            url = "http://node:8545"
            chain_id = 7032118028

            [transactions]
            receipt_timeout_secs = 30
            "#,
        )
        .unwrap();
        assert_eq!(config.rpc.url, "http://node:8545");
        assert_eq!(config.rpc.chain_id, Some(7032118028));
        assert_eq!(config.rpc.timeout_secs, 10);
        assert_eq!(config.transactions.receipt_timeout_secs, 30);
        assert_eq!(config.transactions.poll_interval_ms, 2000);
    }
}
