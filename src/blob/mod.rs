//! Osaka-compatible EIP-4844 blob transactions.
//!
//! # Data Flow
//! ```text
//! --number-of-blobs
//!     → osaka.rs (parameter validation, blob payload, size checks)
//!     → sidecar.rs (KZG commitments, proofs, versioned hashes)
//!     → sender.rs (type-3 tx, gas estimate + cap, sign with sidecar, submit)
//!     → receipt + fee collector balance change
//! ```
//!
//! # Design Decisions
//! - KZG math is delegated to c-kzg through alloy's settings wrapper
//! - Trusted setup defaults to the embedded Ethereum ceremony output

pub mod osaka;
pub mod sender;
pub mod sidecar;

use std::path::PathBuf;

use thiserror::Error;

use crate::blockchain::BlockchainError;

pub use osaka::{prepare_blobs, validate_blob_data, validate_osaka_params, BlobTxType};
pub use sender::{send_blob, BlobTxParams};
pub use sidecar::{BlobBundle, BlobSidecarBuilder};

/// Errors from blob preparation and submission.
#[derive(Debug, Error)]
pub enum BlobError {
    /// Transaction parameters violate Osaka rules.
    #[error("Validation error: {0}")]
    InvalidParams(String),

    #[error(
        "Blob {index} size {size} bytes doesn't match Osaka requirement of {expected} bytes (4096 * 32 field elements)",
        expected = osaka::BLOB_SIZE_BYTES
    )]
    InvalidBlobSize { index: usize, size: usize },

    #[error("KZG error: {0}")]
    Kzg(#[from] c_kzg::Error),

    #[error("Failed to load trusted setup {path}: {source}")]
    TrustedSetup {
        path: PathBuf,
        #[source]
        source: c_kzg::Error,
    },

    #[error(
        "Osaka blob signing failed (EIP-7762 compatibility issue): {0}. Verify: 1) Blob count <= 6, \
         2) Versioned hashes computed, 3) Type is 0x3, 4) Blob sizes are 131,072 bytes, \
         5) Blob data contains valid BLS12-381 field elements"
    )]
    Signing(String),

    #[error("Osaka blob format rejected by RPC: {0}. Verify Osaka fork compatibility with network endpoint.")]
    Rejected(String),

    #[error(transparent)]
    Blockchain(#[from] BlockchainError),
}

pub type BlobResult<T> = Result<T, BlobError>;
