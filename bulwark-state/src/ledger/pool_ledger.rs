//! Pool balance bookkeeping.
//!
//! Every change to a pool component goes through here so the pool and the
//! module-wide asset total move together.

use bulwark_core::{MathError, Pool, PoolId, ReceiptKind, U256};

use crate::error::{StateError, StateResult};
use crate::state::{StateReader, StateWriter};

/// Load a copy of a pool, failing if it is not configured.
pub fn require_pool<S: StateReader>(state: &mut S, pool_id: PoolId) -> StateResult<Pool> {
    state
        .get_pool(pool_id)
        .cloned()
        .ok_or(StateError::PoolNotFound { pool_id })
}

/// Add assets to a pool component and to the asset total.
pub fn credit<S: StateWriter>(
    state: &mut S,
    pool_id: PoolId,
    kind: ReceiptKind,
    amount: U256,
) -> StateResult<()> {
    let pool = state
        .pool_mut(pool_id)
        .ok_or(StateError::PoolNotFound { pool_id })?;
    let (component, _) = pool.component_mut(kind);
    *component = component.checked_add(amount).ok_or(MathError::Overflow)?;
    let asset = pool.asset;

    let asset_pool = state.get_or_create_asset_pool(&asset);
    asset_pool.amount = asset_pool
        .amount
        .checked_add(amount)
        .ok_or(MathError::Overflow)?;
    Ok(())
}

/// Remove assets from a pool component and from the asset total.
pub fn debit<S: StateWriter>(
    state: &mut S,
    pool_id: PoolId,
    kind: ReceiptKind,
    amount: U256,
) -> StateResult<()> {
    let pool = state
        .pool_mut(pool_id)
        .ok_or(StateError::PoolNotFound { pool_id })?;
    let (component, _) = pool.component_mut(kind);
    if *component < amount {
        return Err(StateError::InsufficientPoolAssets {
            pool_id,
            available: *component,
            requested: amount,
        });
    }
    *component = *component - amount;
    let asset = pool.asset;

    let asset_pool = state.get_or_create_asset_pool(&asset);
    asset_pool.amount = asset_pool.amount.saturating_sub(amount);
    Ok(())
}

/// Mark part of a component as owed to queued redemptions.
pub fn earmark<S: StateWriter>(
    state: &mut S,
    pool_id: PoolId,
    kind: ReceiptKind,
    amount: U256,
) -> StateResult<()> {
    let pool = state
        .pool_mut(pool_id)
        .ok_or(StateError::PoolNotFound { pool_id })?;
    let (component, pending) = pool.component_mut(kind);
    let earmarked = pending.checked_add(amount).ok_or(MathError::Overflow)?;
    if earmarked > *component {
        return Err(StateError::InsufficientPoolAssets {
            pool_id,
            available: *component,
            requested: earmarked,
        });
    }
    *pending = earmarked;
    Ok(())
}

/// Release an earmark after a redemption completes.
///
/// Saturates: slash rounding can leave the pending amount a few units below
/// the sum of the requests it covers.
pub fn release<S: StateWriter>(
    state: &mut S,
    pool_id: PoolId,
    kind: ReceiptKind,
    amount: U256,
) -> StateResult<()> {
    let pool = state
        .pool_mut(pool_id)
        .ok_or(StateError::PoolNotFound { pool_id })?;
    let (_, pending) = pool.component_mut(kind);
    *pending = pending.saturating_sub(amount);
    Ok(())
}

/// Check that the module holds at least `amount` more of an asset than it
/// accounts for.
pub fn verify_balance_delta(held: U256, accounted: U256, amount: U256) -> StateResult<()> {
    let received = held.saturating_sub(accounted);
    if received < amount {
        return Err(StateError::InvalidDeposit {
            expected: amount,
            received,
        });
    }
    Ok(())
}
