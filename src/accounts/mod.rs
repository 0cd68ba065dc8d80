//! Account generation and address handling.
//!
//! # Data Flow
//! ```text
//! generate.rs:  random key → {private_key, public_key} → JSON / TXT files
//! addresses.rs: .txt / .json recipient files → validated addresses
//! setup.rs:     generate → fund via transfer::eth → accounts/current_test_config.json
//! ```

pub mod addresses;
pub mod generate;
pub mod setup;

use std::path::PathBuf;

use thiserror::Error;

use crate::blockchain::BlockchainError;

pub use addresses::{address_of, load_addresses, parse_addresses, validate_addresses};
pub use generate::{generate_account, generate_accounts, Generated, GeneratedAccount, OutputSpec};
pub use setup::{setup_blob_test, BlobTestSetup};

/// Errors from account files and setup.
#[derive(Debug, Error)]
pub enum AccountsError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unsupported file format '{0}'. Use .txt or .json")]
    UnsupportedFormat(String),

    #[error("Invalid Ethereum addresses found: {}", .0.join(", "))]
    InvalidAddresses(Vec<String>),

    #[error(transparent)]
    Blockchain(#[from] BlockchainError),

    #[error("Setup aborted: {0}")]
    Aborted(String),
}

pub type AccountsResult<T> = Result<T, AccountsError>;

impl AccountsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AccountsError::Io {
            path: path.into(),
            source,
        }
    }
}
