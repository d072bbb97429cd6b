//! WAD fixed-point arithmetic for U256.
//!
//! A WAD is `1e18`: the fixed-point value `x` represents `x / 1e18`.
//! Slash percentages and loss-scaling factors are expressed in WAD so that
//! `1.0` (no loss, or 100% for a percentage) is `WAD`.
//!
//! Every helper comes in a rounding-down and a rounding-up flavour. Callers
//! choose the direction that favours the remaining pool holders.

use super::U256;
use crate::error::MathError;

/// Fixed-point one: `1e18`.
pub const WAD: U256 = U256([1_000_000_000_000_000_000, 0, 0, 0]);

/// Result type for fixed-point operations.
pub type MathResult<T> = Result<T, MathError>;

/// Compute `floor(a * b / denominator)`.
pub fn mul_div_down(a: U256, b: U256, denominator: U256) -> MathResult<U256> {
    if denominator.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let product = a.checked_mul(b).ok_or(MathError::Overflow)?;
    Ok(product / denominator)
}

/// Compute `ceil(a * b / denominator)`.
pub fn mul_div_up(a: U256, b: U256, denominator: U256) -> MathResult<U256> {
    if denominator.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let product = a.checked_mul(b).ok_or(MathError::Overflow)?;
    let (quotient, remainder) = product.div_mod(denominator);
    if remainder.is_zero() {
        Ok(quotient)
    } else {
        // quotient < product <= U256::MAX, so the increment cannot wrap.
        Ok(quotient + U256::one())
    }
}

/// Fixed-point multiplication rounding down: `floor(a * b / WAD)`.
#[inline]
pub fn mul_wad_down(a: U256, b: U256) -> MathResult<U256> {
    mul_div_down(a, b, WAD)
}

/// Fixed-point multiplication rounding up: `ceil(a * b / WAD)`.
#[inline]
pub fn mul_wad_up(a: U256, b: U256) -> MathResult<U256> {
    mul_div_up(a, b, WAD)
}

/// Fixed-point division rounding down: `floor(a * WAD / b)`.
#[inline]
pub fn div_wad_down(a: U256, b: U256) -> MathResult<U256> {
    mul_div_down(a, WAD, b)
}

/// Fixed-point division rounding up: `ceil(a * WAD / b)`.
#[inline]
pub fn div_wad_up(a: U256, b: U256) -> MathResult<U256> {
    mul_div_up(a, WAD, b)
}
