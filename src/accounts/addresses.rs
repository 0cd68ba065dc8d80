//! Address derivation, loading and validation.

use std::fs;
use std::path::Path;

use alloy::primitives::Address;
use serde_json::Value;

use crate::accounts::{AccountsError, AccountsResult};
use crate::blockchain::{BlockchainResult, Wallet};

/// Derive the address for a private key (`0x` optional).
pub fn address_of(private_key: &str) -> BlockchainResult<Address> {
    Wallet::from_private_key(private_key).map(|wallet| wallet.address())
}

/// Load recipient addresses from a `.txt` or `.json` file.
///
/// Text files hold one address per line; blank lines are skipped. JSON files
/// hold an array of strings or of objects with a `public_key` field.
pub fn load_addresses(path: &Path) -> AccountsResult<Vec<String>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_lowercase();

    match extension.as_str() {
        "txt" => {
            let content = fs::read_to_string(path).map_err(|e| AccountsError::io(path, e))?;
            Ok(content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect())
        }
        "json" => {
            let content = fs::read_to_string(path).map_err(|e| AccountsError::io(path, e))?;
            let data: Value = serde_json::from_str(&content).map_err(|e| AccountsError::Json {
                path: path.to_path_buf(),
                source: e,
            })?;
            let items = data.as_array().map(Vec::as_slice).unwrap_or_default();
            Ok(items
                .iter()
                .filter_map(|item| match item {
                    Value::String(address) => Some(address.clone()),
                    Value::Object(map) => map
                        .get("public_key")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    _ => None,
                })
                .collect())
        }
        other => Err(AccountsError::UnsupportedFormat(other.to_string())),
    }
}

/// Parse one address.
///
/// Accepts all-lowercase or all-uppercase hex, or mixed case with a valid
/// EIP-55 checksum.
pub fn parse_address(candidate: &str) -> Option<Address> {
    let trimmed = candidate.trim();
    let hex = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let has_lower = hex.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = hex.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        Address::parse_checksummed(format!("0x{}", hex), None).ok()
    } else {
        hex.parse().ok()
    }
}

/// Return the entries that are not valid addresses.
pub fn validate_addresses(candidates: &[String]) -> Vec<String> {
    candidates
        .iter()
        .filter(|candidate| parse_address(candidate).is_none())
        .cloned()
        .collect()
}

/// Parse every entry, failing with the full list of invalid ones.
pub fn parse_addresses(candidates: &[String]) -> AccountsResult<Vec<Address>> {
    let invalid = validate_addresses(candidates);
    if !invalid.is_empty() {
        return Err(AccountsError::InvalidAddresses(invalid));
    }
    Ok(candidates.iter().filter_map(|c| parse_address(c)).collect())
}
