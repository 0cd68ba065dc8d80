//! EIP-7002 request fee.

use alloy::primitives::U256;

use crate::validator::{ValidatorError, ValidatorResult};

/// Slot 0 value before the withdrawal request contract is activated.
pub const EXCESS_INHIBITOR: U256 = U256::MAX;

/// Minimum fee in wei.
pub const MIN_WITHDRAWAL_REQUEST_FEE: u64 = 1;

/// Update fraction of the fee curve.
pub const WITHDRAWAL_REQUEST_FEE_UPDATE_FRACTION: u64 = 17;

/// Integer approximation of `factor * e ** (numerator / denominator)`.
pub fn fake_exponential(factor: U256, numerator: U256, denominator: U256) -> U256 {
    let mut i = U256::from(1);
    let mut output = U256::ZERO;
    let mut accum = factor.saturating_mul(denominator);
    while !accum.is_zero() {
        output = output.saturating_add(accum);
        accum = accum.saturating_mul(numerator) / denominator.saturating_mul(i);
        i += U256::from(1);
    }
    output / denominator
}

/// Fee for the next request given the excess stored in slot 0.
pub fn withdrawal_fee(excess: U256) -> ValidatorResult<U256> {
    if excess == EXCESS_INHIBITOR {
        return Err(ValidatorError::ExcessInhibitor);
    }
    Ok(fake_exponential(
        U256::from(MIN_WITHDRAWAL_REQUEST_FEE),
        excess,
        U256::from(WITHDRAWAL_REQUEST_FEE_UPDATE_FRACTION),
    ))
}
