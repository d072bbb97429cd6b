//! Deposits and stakes.

use bulwark_core::{Address, ModuleState, PoolId, ReceiptKind, U256};

use super::pool_ledger::{credit, require_pool, verify_balance_delta};
use crate::error::{StateError, StateResult};
use crate::exchange::shares_for_assets;
use crate::external::{AssetVault, ReceiptTokens};
use crate::state::{StateReader, StateWriter};

/// Credit `amount` of assets to a pool component and mint shares for it.
///
/// With `from` set, `caller` pulls the assets from that account first,
/// spending its asset allowance unless it is the caller's own; otherwise
/// the assets must already sit in module custody. Either way the vault
/// must hold at least `amount` more than the module accounts for.
///
/// Shares are priced against the un-pending component balance, so queued
/// redemptions keep their claim.
pub fn deposit_assets<S, V, T>(
    state: &mut S,
    vault: &mut V,
    tokens: &mut T,
    caller: &Address,
    pool_id: PoolId,
    kind: ReceiptKind,
    amount: U256,
    receiver: &Address,
    from: Option<&Address>,
) -> StateResult<U256>
where
    S: StateWriter,
    V: AssetVault,
    T: ReceiptTokens,
{
    let module_state = state.module_state();
    if module_state == ModuleState::Paused {
        return Err(StateError::InvalidState {
            state: module_state,
        });
    }

    let pool = require_pool(state, pool_id)?;
    let token = pool.token(kind);
    let shares = shares_for_assets(
        amount,
        tokens.total_supply(&token),
        pool.unpending_amount(kind),
    )?;
    if shares.is_zero() {
        return Err(StateError::RoundsToZero);
    }

    if let Some(from) = from {
        vault.pull(&pool.asset, caller, from, amount)?;
    }
    let accounted = state.asset_total(&pool.asset);
    verify_balance_delta(vault.balance_of(&pool.asset), accounted, amount)?;

    credit(state, pool_id, kind, amount)?;
    tokens.mint(&token, receiver, shares)?;

    Ok(shares)
}

/// Shares a deposit of `assets` would mint right now.
pub fn preview_deposit<S, T>(
    state: &mut S,
    tokens: &T,
    pool_id: PoolId,
    kind: ReceiptKind,
    assets: U256,
) -> StateResult<U256>
where
    S: StateReader,
    T: ReceiptTokens,
{
    let pool = require_pool(state, pool_id)?;
    shares_for_assets(
        assets,
        tokens.total_supply(&pool.token(kind)),
        pool.unpending_amount(kind),
    )
}
