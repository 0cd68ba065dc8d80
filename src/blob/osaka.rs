//! Osaka fork (EIP-7762) blob constants and validation.

use std::str::FromStr;

use alloy::primitives::U256;

use crate::blob::{BlobError, BlobResult};

pub const MAX_BLOBS_PER_TX: usize = 6;
pub const FIELD_ELEMENTS_PER_BLOB: usize = 4096;
pub const BYTES_PER_FIELD_ELEMENT: usize = 32;
pub const BLOB_SIZE_BYTES: usize = FIELD_ELEMENTS_PER_BLOB * BYTES_PER_FIELD_ELEMENT;
/// Blob wrapper version carried in the first byte of a versioned hash.
pub const VERSIONED_HASH_PREFIX: u8 = 0x01;
pub const GAS_LIMIT_CAP: u64 = 1 << 24;
pub const BLOB_RESERVE_PRICE: u128 = 1 << 13;

/// Big-endian field element below the BLS12-381 modulus.
pub const FIELD_ELEMENT: [u8; BYTES_PER_FIELD_ELEMENT] = [
    0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef, 0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef,
    0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef, 0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef,
];

/// Requested transaction type for `--tx-type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobTxType {
    Eip1559,
    Blob,
}

impl BlobTxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlobTxType::Eip1559 => "0x2",
            BlobTxType::Blob => "0x3",
        }
    }
}

impl FromStr for BlobTxType {
    type Err = BlobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "0x2" => Ok(BlobTxType::Eip1559),
            "0x3" => Ok(BlobTxType::Blob),
            other => Err(BlobError::InvalidParams(format!(
                "Unsupported transaction type '{}', expected 0x2 or 0x3",
                other
            ))),
        }
    }
}

/// Check transaction parameters against Osaka rules.
pub fn validate_osaka_params(
    tx_type: BlobTxType,
    value: U256,
    number_of_blobs: usize,
    gas_limit: Option<u64>,
) -> BlobResult<()> {
    if number_of_blobs > 0 && tx_type != BlobTxType::Blob {
        return Err(BlobError::InvalidParams(format!(
            "Blob transactions require type 0x3, got {}. Use --tx-type 0x3 for blob transactions.",
            tx_type.as_str()
        )));
    }
    if number_of_blobs > 0 && !value.is_zero() {
        return Err(BlobError::InvalidParams(format!(
            "Blob transactions must have value=0 (Osaka fork), got {}. \
             Blob data is stored separately, value must be 0.",
            value
        )));
    }
    if number_of_blobs > MAX_BLOBS_PER_TX {
        return Err(BlobError::InvalidParams(format!(
            "Osaka fork allows max {} blobs per transaction, got {}",
            MAX_BLOBS_PER_TX, number_of_blobs
        )));
    }
    if number_of_blobs < 1 {
        return Err(BlobError::InvalidParams(format!(
            "Must include at least 1 blob for blob transactions, got {}",
            number_of_blobs
        )));
    }
    if let Some(gas_limit) = gas_limit {
        if gas_limit > GAS_LIMIT_CAP {
            return Err(BlobError::InvalidParams(format!(
                "Gas limit {} exceeds Osaka fork cap of 2^24 ({})",
                gas_limit, GAS_LIMIT_CAP
            )));
        }
    }
    Ok(())
}

/// Build `count` identical blobs of [`FIELD_ELEMENT`] repeated 4096 times.
pub fn prepare_blobs(count: usize) -> Vec<Vec<u8>> {
    let blob = FIELD_ELEMENT.repeat(FIELD_ELEMENTS_PER_BLOB);
    vec![blob; count]
}

/// Every blob must be exactly [`BLOB_SIZE_BYTES`] long.
pub fn validate_blob_data(blobs: &[Vec<u8>]) -> BlobResult<()> {
    for (index, blob) in blobs.iter().enumerate() {
        if blob.len() != BLOB_SIZE_BYTES {
            return Err(BlobError::InvalidBlobSize {
                index,
                size: blob.len(),
            });
        }
    }
    Ok(())
}

/// Clamp a gas limit to the Osaka cap.
pub fn cap_gas_limit(gas_limit: u64) -> u64 {
    if gas_limit > GAS_LIMIT_CAP {
        tracing::info!(cap = GAS_LIMIT_CAP, requested = gas_limit, "Gas capped to Osaka limit");
        GAS_LIMIT_CAP
    } else {
        gas_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(BLOB_SIZE_BYTES, 131_072);
        assert_eq!(GAS_LIMIT_CAP, 16_777_216);
        assert_eq!(BLOB_RESERVE_PRICE, 8_192);
    }

    #[test]
    fn test_prepare_blobs() {
        let blobs = prepare_blobs(2);
        assert_eq!(blobs.len(), 2);
        assert_eq!(blobs[0].len(), BLOB_SIZE_BYTES);
        assert_eq!(&blobs[0][..32], &FIELD_ELEMENT);
        assert_eq!(&blobs[0][BLOB_SIZE_BYTES - 32..], &FIELD_ELEMENT);
        assert!(validate_blob_data(&blobs).is_ok());
    }

    #[test]
    fn test_validate_blob_data_reports_index() {
        let mut blobs = prepare_blobs(2);
        blobs[1].pop();
        match validate_blob_data(&blobs).unwrap_err() {
            BlobError::InvalidBlobSize { index, size } => {
                assert_eq!(index, 1);
                assert_eq!(size, BLOB_SIZE_BYTES - 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_validate_osaka_params() {
        let ok = validate_osaka_params(BlobTxType::Blob, U256::ZERO, 6, Some(GAS_LIMIT_CAP));
        assert!(ok.is_ok());

        let wrong_type = validate_osaka_params(BlobTxType::Eip1559, U256::ZERO, 1, None);
        assert!(wrong_type.unwrap_err().to_string().contains("require type 0x3"));

        let value = validate_osaka_params(BlobTxType::Blob, U256::from(1), 1, None);
        assert!(value.unwrap_err().to_string().contains("value=0"));

        let too_many = validate_osaka_params(BlobTxType::Blob, U256::ZERO, 7, None);
        assert!(too_many.unwrap_err().to_string().contains("max 6"));

        let none = validate_osaka_params(BlobTxType::Blob, U256::ZERO, 0, None);
        assert!(none.unwrap_err().to_string().contains("at least 1 blob"));

        let gas = validate_osaka_params(BlobTxType::Blob, U256::ZERO, 1, Some(GAS_LIMIT_CAP + 1));
        assert!(gas.unwrap_err().to_string().contains("2^24"));
    }

    #[test]
    fn test_cap_gas_limit() {
        assert_eq!(cap_gas_limit(21_000), 21_000);
        assert_eq!(cap_gas_limit(u64::MAX), GAS_LIMIT_CAP);
    }

    #[test]
    fn test_tx_type_parse() {
        assert_eq!("0x3".parse::<BlobTxType>().unwrap(), BlobTxType::Blob);
        assert!("0x1".parse::<BlobTxType>().is_err());
    }
}
