//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! --private-key / CHAINOPS_PRIVATE_KEY / keystore
//!     → wallet.rs (key loading, signing, EIP-2718 encoding)
//!     → client.rs (JSON-RPC with timeouts and failover)
//!     → transaction.rs (broadcast, receipt polling, fee caps)
//!     → send.rs / decode.rs (plain transactions, raw tx inspection)
//! ```
//!
//! # Security Constraints
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts
//! - Node error responses are surfaced verbatim for retry classification

pub mod client;
pub mod decode;
pub mod send;
pub mod transaction;
pub mod types;
pub mod units;
pub mod wallet;

pub use client::RpcClient;
pub use transaction::TxSender;
pub use types::{BlockTag, BlockchainError, BlockchainResult, ChainId, ReceiptSummary};
pub use wallet::{SignedTx, Wallet};
