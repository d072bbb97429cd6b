//! Conversions between pool shares and underlying assets.
//!
//! Both directions round down, so neither a mint nor a redemption can take
//! more than its proportional claim from the remaining holders.

use bulwark_core::fixed_point::mul_div_down;
use bulwark_core::U256;

use crate::error::StateResult;

/// Shares minted for `assets` against a component holding `pool_amount`.
///
/// The first deposit into an empty share supply mints one share per asset.
pub fn shares_for_assets(assets: U256, share_supply: U256, pool_amount: U256) -> StateResult<U256> {
    if share_supply.is_zero() {
        return Ok(assets);
    }
    let denominator = pool_amount.max(U256::one());
    Ok(mul_div_down(assets, share_supply, denominator)?)
}

/// Assets owed for `shares` out of a component holding `pool_amount`.
pub fn assets_for_shares(shares: U256, share_supply: U256, pool_amount: U256) -> StateResult<U256> {
    if share_supply.is_zero() {
        return Ok(U256::zero());
    }
    Ok(mul_div_down(shares, pool_amount, share_supply)?)
}
