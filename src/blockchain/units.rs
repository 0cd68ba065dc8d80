//! Wei / gwei / ether conversions.
//!
//! Amounts are parsed from decimal strings with exact integer arithmetic.
//! No floating point is involved anywhere between the command line and the
//! transaction value.

use alloy::primitives::utils::{format_units, parse_units};
use alloy::primitives::U256;

use crate::blockchain::types::{BlockchainError, BlockchainResult};

pub const WEI_PER_GWEI: u128 = 1_000_000_000;

fn parse_decimal(amount: &str, decimals: u8, what: &str) -> BlockchainResult<U256> {
    let amount = amount.trim();
    if amount.starts_with('-') {
        return Err(BlockchainError::InvalidInput(format!(
            "{} amount must not be negative: {}",
            what, amount
        )));
    }
    parse_units(amount, decimals)
        .map(|parsed| parsed.get_absolute())
        .map_err(|e| BlockchainError::InvalidInput(format!("Invalid {} amount '{}': {}", what, amount, e)))
}

/// Parse an ETH amount such as `0.5` into wei.
pub fn parse_eth(amount: &str) -> BlockchainResult<U256> {
    parse_decimal(amount, 18, "ETH")
}

/// Parse a gwei amount such as `1.5` into wei.
pub fn parse_gwei(amount: &str) -> BlockchainResult<u128> {
    let wei = parse_decimal(amount, 9, "gwei")?;
    u128::try_from(wei)
        .map_err(|_| BlockchainError::InvalidInput(format!("Gas price too large: {}", amount)))
}

/// Parse a token amount using the token's decimals.
pub fn parse_token_amount(amount: &str, decimals: u8) -> BlockchainResult<U256> {
    parse_decimal(amount, decimals, "token")
}

/// Convert wei to whole gwei, rounding down.
pub fn wei_to_gwei(wei: U256) -> BlockchainResult<u64> {
    let gwei = wei / U256::from(WEI_PER_GWEI);
    u64::try_from(gwei)
        .map_err(|_| BlockchainError::InvalidInput(format!("Amount too large: {} wei", wei)))
}

/// Format wei as ETH, e.g. `1.5`.
pub fn format_eth(wei: U256) -> String {
    format_token(wei, 18)
}

/// Format wei as gwei, e.g. `2.5`.
pub fn format_gwei(wei: u128) -> String {
    format_token(U256::from(wei), 9)
}

/// Format a raw token amount with the given decimals.
pub fn format_token(amount: U256, decimals: u8) -> String {
    match format_units(amount, decimals) {
        Ok(formatted) => trim_fraction(&formatted),
        Err(_) => amount.to_string(),
    }
}

fn trim_fraction(value: &str) -> String {
    match value.split_once('.') {
        Some((whole, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            if fraction.is_empty() {
                format!("{}.0", whole)
            } else {
                format!("{}.{}", whole, fraction)
            }
        }
        None => value.to_string(),
    }
}
