//! Slash execution.
//!
//! A payout handler that is owed a slash removes assets from any set of
//! pools in one batch. Each pool's loss is split pro rata between its
//! deposit and stake components; each component's accumulator records the
//! loss so requests already queued against it pay proportionally less.

use bulwark_core::fixed_point::{div_wad_up, mul_div_down, mul_wad_up};
use bulwark_core::{Address, ModuleState, PoolId, ReceiptKind, SlashInstruction, U256};

use crate::error::{StateError, StateResult};
use crate::external::AssetVault;
use crate::ledger::{debit, require_pool};
use crate::state::{StateReader, StateWriter};
use crate::trigger::{discharge_slash, require_pending_slash};

/// Pools already slashed in the current batch.
#[derive(Clone, Debug)]
pub struct SlashGuard {
    seen: Vec<bool>,
}

impl SlashGuard {
    /// Guard sized for `pool_count` pools.
    pub fn new(pool_count: usize) -> Self {
        Self {
            seen: vec![false; pool_count],
        }
    }

    /// Mark a pool, failing if it is unknown or was already marked.
    pub fn mark(&mut self, pool_id: PoolId) -> StateResult<()> {
        let seen = self
            .seen
            .get_mut(usize::from(pool_id))
            .ok_or(StateError::PoolNotFound { pool_id })?;
        if *seen {
            return Err(StateError::DuplicatePoolInSlashBatch { pool_id });
        }
        *seen = true;
        Ok(())
    }
}

/// Loss applied to one pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolSlash {
    /// Pool slashed.
    pub pool_id: PoolId,
    /// Assets removed in total.
    pub amount: U256,
    /// Part taken from the deposit component.
    pub deposit_part: U256,
    /// Part taken from the stake component.
    pub stake_part: U256,
}

/// Result of a slash batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashReport {
    /// Non-empty slashes, in instruction order.
    pub slashes: Vec<PoolSlash>,
    /// State change when this batch discharged the last outstanding slash.
    pub state_change: Option<(ModuleState, ModuleState)>,
}

/// Execute one slash for `handler`, sending the removed assets to `receiver`.
///
/// Checks, in order: the module is triggered, the handler is owed a slash,
/// and per instruction that the pool is known and not repeated, the amount
/// fits the pool, and the fraction removed stays within the pool's maximum.
/// Every instruction is checked before any pool is touched.
pub fn execute_slash<S, V>(
    state: &mut S,
    vault: &mut V,
    handler: &Address,
    instructions: &[SlashInstruction],
    receiver: &Address,
) -> StateResult<SlashReport>
where
    S: StateWriter,
    V: AssetVault,
{
    let module_state = state.module_state();
    if module_state != ModuleState::Triggered {
        return Err(StateError::InvalidState {
            state: module_state,
        });
    }
    require_pending_slash(state, handler)?;

    let mut guard = SlashGuard::new(state.pool_count());
    let mut slashes = Vec::with_capacity(instructions.len());
    for instruction in instructions {
        guard.mark(instruction.pool_id)?;
        if instruction.amount.is_zero() {
            continue;
        }
        slashes.push(plan_slash(state, instruction.pool_id, instruction.amount)?);
    }

    for slash in &slashes {
        slash_component(state, slash.pool_id, ReceiptKind::Deposit, slash.deposit_part)?;
        slash_component(state, slash.pool_id, ReceiptKind::Stake, slash.stake_part)?;
        let asset = require_pool(state, slash.pool_id)?.asset;
        vault.push(&asset, receiver, slash.amount)?;
    }

    let state_change = discharge_slash(state, handler)?;

    Ok(SlashReport {
        slashes,
        state_change,
    })
}

/// Check a slash of `amount` against a pool and split it across its
/// components. Changes nothing.
///
/// The maximum applies to the pool's combined deposit and stake.
fn plan_slash<S: StateReader>(state: &mut S, pool_id: PoolId, amount: U256) -> StateResult<PoolSlash> {
    let pool = require_pool(state, pool_id)?;
    let total = pool.total_amount();

    if amount > total {
        return Err(StateError::InsufficientPoolAssets {
            pool_id,
            available: total,
            requested: amount,
        });
    }
    let percentage = div_wad_up(amount, total)?;
    if percentage > pool.max_slash_percentage {
        return Err(StateError::ExceedsMaxSlashPercentage {
            pool_id,
            percentage,
            max: pool.max_slash_percentage,
        });
    }

    let deposit_part = mul_div_down(amount, pool.deposit_amount, total)?;
    Ok(PoolSlash {
        pool_id,
        amount,
        deposit_part,
        stake_part: amount - deposit_part,
    })
}

/// Apply a loss to one component: accumulator first, then balances.
fn slash_component<S: StateWriter>(
    state: &mut S,
    pool_id: PoolId,
    kind: ReceiptKind,
    amount: U256,
) -> StateResult<()> {
    if amount.is_zero() {
        return Ok(());
    }
    let before = require_pool(state, pool_id)?.amount(kind);

    let factor = state
        .accumulator_mut(pool_id, kind)
        .ok_or(StateError::PoolNotFound { pool_id })?
        .record_slash(amount, before)?;

    let pool = state
        .pool_mut(pool_id)
        .ok_or(StateError::PoolNotFound { pool_id })?;
    let (_, pending) = pool.component_mut(kind);
    *pending = mul_wad_up(*pending, factor)?.min(before.saturating_sub(amount));

    debit(state, pool_id, kind, amount)
}
