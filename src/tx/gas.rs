//! Gas price and gas limit resolution

use ethers::types::U256;

/// Fixed-point denominator for multiplier scaling
const SCALE: u64 = 1_000_000;

/// Scale a suggested gas price by a float multiplier, truncating to an
/// integer. Non-positive multipliers leave the price untouched.
pub fn apply_multiplier(price: U256, multiplier: f64) -> U256 {
    if multiplier <= 0.0 {
        return price;
    }
    let factor = (multiplier * SCALE as f64) as u128;
    price * U256::from(factor) / U256::from(SCALE)
}

/// Resolve the gas limit a transaction may carry: the configured per-chain
/// maximum when one is set, the requested limit otherwise. Callers reject
/// the send when the result is below the requested limit.
pub fn gas_ceiling(configured_max: Option<u64>, requested: u64) -> u64 {
    configured_max.unwrap_or(requested)
}
