//! Ethereum network operations: transactions, blobs, validator requests,
//! nonce inspection, log download and CI reporting.

// Chain access
pub mod blockchain;

// Operations
pub mod accounts;
pub mod blob;
pub mod config_diff;
pub mod logs;
pub mod repeat;
pub mod report;
pub mod transfer;
pub mod txpool;
pub mod validator;

// Front end
pub mod cli;
pub mod console;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use lifecycle::Shutdown;
