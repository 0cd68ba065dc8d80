//! Validator lifecycle requests sent to system contracts.
//!
//! # Data Flow
//! ```text
//! --private-key | --keystore-path (+ password)
//!     → KeySource::load (Wallet)
//!     → consolidation.rs  EIP-7251: fee via eth_call, source || target
//!     → withdrawal.rs     EIP-7002: slot 0 excess → fee.rs, pubkey || gwei
//!     → exit.rs           legacy exit contract: pubkey || validator index
//!     → TxSender (sign, submit, receipt)
//! ```
//!
//! # Design Decisions
//! - Irreversible requests go through a caller supplied confirmation
//! - Pubkeys are validated to 48 bytes before any RPC traffic

pub mod consolidation;
pub mod exit;
pub mod fee;
pub mod withdrawal;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use alloy::primitives::{hex, Address, FixedBytes, U256};
use thiserror::Error;

use crate::blockchain::{BlockchainError, BlockchainResult, RpcClient, Wallet};

pub use consolidation::{send_consolidation, ConsolidationOutcome, CONSOLIDATION_CONTRACT};
pub use exit::{send_voluntary_exit, VoluntaryExit};
pub use fee::{fake_exponential, withdrawal_fee, EXCESS_INHIBITOR};
pub use withdrawal::{send_withdrawal, WithdrawalRequest, WITHDRAWAL_CONTRACT};

/// Length of a BLS12-381 public key.
pub const PUBKEY_LENGTH: usize = 48;

/// Errors from validator requests.
#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("Invalid pubkey '{value}': {reason}")]
    InvalidPubkey { value: String, reason: String },

    #[error("No contract code at {0}")]
    MissingContract(Address),

    #[error("Excess inhibitor is set, cannot send withdrawal or exit")]
    ExcessInhibitor,

    #[error("Insufficient funds. Need at least {needed} wei but {address} only has {available} wei")]
    InsufficientFunds {
        address: Address,
        needed: U256,
        available: U256,
    },

    #[error("Either --private-key or --keystore-path must be provided")]
    MissingKey,

    #[error("{0} cancelled")]
    Cancelled(&'static str),

    #[error("Transaction {hash} reverted: {reason}")]
    Reverted { hash: String, reason: String },

    #[error(transparent)]
    Blockchain(#[from] BlockchainError),
}

pub type ValidatorResult<T> = Result<T, ValidatorError>;

/// 48-byte validator public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pubkey(pub FixedBytes<PUBKEY_LENGTH>);

impl FromStr for Pubkey {
    type Err = ValidatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = |reason: String| ValidatorError::InvalidPubkey {
            value: trimmed.to_string(),
            reason,
        };
        let bytes = hex::decode(trimmed).map_err(|e| invalid(e.to_string()))?;
        if bytes.len() != PUBKEY_LENGTH {
            return Err(invalid(format!(
                "expected {} bytes, got {}",
                PUBKEY_LENGTH,
                bytes.len()
            )));
        }
        Ok(Pubkey(FixedBytes::from_slice(&bytes)))
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the signing key comes from.
#[derive(Debug, Clone)]
pub enum KeySource {
    PrivateKey(String),
    Keystore { path: PathBuf, password: String },
}

impl KeySource {
    /// A private key wins over a keystore. The password is only needed for
    /// the keystore, so it is resolved lazily by the caller.
    pub fn from_args(
        private_key: Option<String>,
        keystore_path: Option<PathBuf>,
        password: impl FnOnce() -> std::io::Result<String>,
    ) -> ValidatorResult<Self> {
        match (private_key, keystore_path) {
            (Some(key), _) => Ok(KeySource::PrivateKey(key)),
            (None, Some(path)) => {
                let password = password().map_err(|e| {
                    BlockchainError::Wallet(format!("Failed to read keystore password: {}", e))
                })?;
                Ok(KeySource::Keystore { path, password })
            }
            (None, None) => Err(ValidatorError::MissingKey),
        }
    }

    pub fn load(&self) -> BlockchainResult<Wallet> {
        match self {
            KeySource::PrivateKey(key) => Wallet::from_private_key(key),
            KeySource::Keystore { path, password } => Wallet::from_keystore(path, password),
        }
    }
}

/// Address and balance shown by `--fund-account`.
#[derive(Debug, Clone)]
pub struct FundingInfo {
    pub address: Address,
    pub balance: U256,
}

pub async fn funding_info(client: &RpcClient, address: Address) -> BlockchainResult<FundingInfo> {
    let balance = client.balance(address).await?;
    Ok(FundingInfo { address, balance })
}

/// Fail unless `balance` covers `needed`.
pub(crate) fn ensure_funds(address: Address, balance: U256, needed: U256) -> ValidatorResult<()> {
    if balance < needed {
        return Err(ValidatorError::InsufficientFunds {
            address,
            needed,
            available: balance,
        });
    }
    Ok(())
}
