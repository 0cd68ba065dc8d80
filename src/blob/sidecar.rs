//! KZG commitments, proofs and versioned hashes for blob payloads.

use std::path::Path;
use std::sync::Arc;

use alloy::consensus::EnvKzgSettings;
use alloy::eips::eip4844::{kzg_to_versioned_hash, Blob, BlobTransactionSidecar, Bytes48};
use alloy::primitives::B256;
use c_kzg::KzgSettings;

use crate::blob::osaka::{validate_blob_data, VERSIONED_HASH_PREFIX};
use crate::blob::{BlobError, BlobResult};

/// A sidecar and the versioned hashes that reference it.
#[derive(Debug, Clone)]
pub struct BlobBundle {
    pub sidecar: BlobTransactionSidecar,
    pub versioned_hashes: Vec<B256>,
}

/// Builds blob sidecars against a KZG trusted setup.
#[derive(Debug, Clone)]
pub struct BlobSidecarBuilder {
    settings: EnvKzgSettings,
}

impl BlobSidecarBuilder {
    /// Use the Ethereum mainnet trusted setup bundled with c-kzg.
    pub fn new() -> Self {
        Self {
            settings: EnvKzgSettings::Default,
        }
    }

    /// Load a trusted setup file in the c-kzg text format.
    pub fn from_trusted_setup(path: &Path) -> BlobResult<Self> {
        let settings =
            KzgSettings::load_trusted_setup_file(path, 0).map_err(|source| BlobError::TrustedSetup {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!(path = %path.display(), "Loaded trusted setup");
        Ok(Self {
            settings: EnvKzgSettings::Custom(Arc::new(settings)),
        })
    }

    /// Commit to each blob and compute its proof and versioned hash.
    pub fn build(&self, blobs: &[Vec<u8>]) -> BlobResult<BlobBundle> {
        validate_blob_data(blobs)?;
        let settings = self.settings.get();

        let mut sidecar_blobs = Vec::with_capacity(blobs.len());
        let mut commitments = Vec::with_capacity(blobs.len());
        let mut proofs = Vec::with_capacity(blobs.len());
        let mut versioned_hashes = Vec::with_capacity(blobs.len());

        for bytes in blobs {
            let blob = c_kzg::Blob::from_bytes(bytes)?;
            let commitment = settings.blob_to_kzg_commitment(&blob)?.to_bytes();
            let proof = settings.compute_blob_kzg_proof(&blob, &commitment)?.to_bytes();

            let commitment = Bytes48::from(commitment.into_inner());
            let versioned_hash = kzg_to_versioned_hash(commitment.as_slice());
            debug_assert_eq!(versioned_hash[0], VERSIONED_HASH_PREFIX);

            sidecar_blobs.push(Blob::from_slice(bytes));
            commitments.push(commitment);
            proofs.push(Bytes48::from(proof.into_inner()));
            versioned_hashes.push(versioned_hash);
        }

        Ok(BlobBundle {
            sidecar: BlobTransactionSidecar::new(sidecar_blobs, commitments, proofs),
            versioned_hashes,
        })
    }
}

impl Default for BlobSidecarBuilder {
    fn default() -> Self {
        Self::new()
    }
}
