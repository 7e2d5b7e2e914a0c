//! Parent-relative gas rules: the default `ParentValidator`.
//! Mirrors the go-ethereum limits (min 5000, 1/1024 bound divisor).

use alloy_consensus::Header;

use crate::consensus::clique::{
    error::{CliqueError, CliqueResult},
    provider::ParentValidator,
};

/// Minimum allowed gas-limit (same as `params.MinGasLimit`).
pub const MIN_GAS_LIMIT: u64 = 5_000;

/// Gas-limit bound divisor: the limit may move by strictly less than
/// `parent / 1024` per block.
pub const GAS_LIMIT_BOUND_DIVISOR: u64 = 1024;

/// Computes the allowed delta for the next block.
#[inline]
pub const fn allowed_delta(parent_gas_limit: u64) -> u64 {
    parent_gas_limit / GAS_LIMIT_BOUND_DIVISOR
}

/// Validate the `gas_limit` of a block against its parent.
pub fn validate_gas_limit(parent_gas_limit: u64, gas_limit: u64) -> CliqueResult<()> {
    if gas_limit < MIN_GAS_LIMIT {
        return Err(CliqueError::InvalidGas(format!(
            "gas limit {gas_limit} below minimum {MIN_GAS_LIMIT}"
        )));
    }

    let diff = parent_gas_limit.abs_diff(gas_limit);
    let delta = allowed_delta(parent_gas_limit);
    if diff >= delta {
        return Err(CliqueError::InvalidGas(format!(
            "gas limit {gas_limit} out of bounds, parent {parent_gas_limit} allows +-{delta}"
        )));
    }
    Ok(())
}

/// Default parent-relative validator: gas accounting only, no base-fee
/// rules.
#[derive(Debug, Clone, Default)]
pub struct GasLimitValidator;

impl ParentValidator for GasLimitValidator {
    fn validate(&self, parent: &Header, header: &Header) -> CliqueResult<()> {
        if header.gas_used > header.gas_limit {
            return Err(CliqueError::InvalidGas(format!(
                "gas used {} exceeds gas limit {}",
                header.gas_used, header.gas_limit
            )));
        }
        validate_gas_limit(parent.gas_limit, header.gas_limit)
    }
}
