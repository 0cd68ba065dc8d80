//! Crate-level error type for the command-line front end.

use thiserror::Error;

use crate::accounts::AccountsError;
use crate::blob::BlobError;
use crate::blockchain::BlockchainError;
use crate::config::ConfigError;
use crate::config_diff::DiffError;
use crate::logs::LogsError;
use crate::repeat::RepeatError;
use crate::report::ReportError;
use crate::transfer::TransferError;
use crate::validator::ValidatorError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Blockchain(#[from] BlockchainError),

    #[error(transparent)]
    Accounts(#[from] AccountsError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Blob(#[from] BlobError),

    #[error(transparent)]
    Validator(#[from] ValidatorError),

    #[error(transparent)]
    Repeat(#[from] RepeatError),

    #[error(transparent)]
    Diff(#[from] DiffError),

    #[error(transparent)]
    Logs(#[from] LogsError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Usage(String),
}

pub type Result<T> = std::result::Result<T, Error>;
