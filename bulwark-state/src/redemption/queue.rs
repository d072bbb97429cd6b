//! Delayed redemption queue.
//!
//! Queueing burns shares and earmarks the assets they are worth; completion
//! pays the earmarked amount scaled by every slash since the request was
//! queued. While paused every delay is zero, so requests complete in the
//! call that queues them.

use bulwark_core::{
    Address, ModuleState, PoolId, QueuedRedemptionPreview, RedemptionId, RedemptionKind,
    RedemptionRequest, U256,
};

use crate::error::{StateError, StateResult};
use crate::exchange::assets_for_shares;
use crate::external::{AssetVault, ReceiptTokens};
use crate::ledger::{debit, earmark, release, require_pool};
use crate::state::{StateReader, StateWriter};

/// What happened to a freshly queued redemption.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueueOutcome {
    /// Stored until its delay elapses.
    Pending(RedemptionRequest),
    /// Completed in the same call.
    Completed {
        /// The request as it would have been stored.
        request: RedemptionRequest,
        /// Assets transferred to the receiver.
        paid: U256,
    },
}

impl QueueOutcome {
    /// The request.
    pub fn request(&self) -> &RedemptionRequest {
        match self {
            QueueOutcome::Pending(request) => request,
            QueueOutcome::Completed { request, .. } => request,
        }
    }

    /// Queued amount for pending requests, paid amount otherwise.
    pub fn asset_amount(&self) -> U256 {
        match self {
            QueueOutcome::Pending(request) => request.asset_amount,
            QueueOutcome::Completed { paid, .. } => *paid,
        }
    }
}

/// Burn `shares` of `owner` and queue their assets for `receiver`.
///
/// `configured_delay` is the delay for this kind of redemption; it is
/// ignored while the module is paused.
pub fn queue_redemption<S, V, T>(
    state: &mut S,
    vault: &mut V,
    tokens: &mut T,
    caller: &Address,
    now: u64,
    configured_delay: u64,
    pool_id: PoolId,
    kind: RedemptionKind,
    shares: U256,
    receiver: &Address,
    owner: &Address,
) -> StateResult<QueueOutcome>
where
    S: StateWriter,
    V: AssetVault,
    T: ReceiptTokens,
{
    let module_state = state.module_state();
    if module_state == ModuleState::Triggered {
        return Err(StateError::InvalidState {
            state: module_state,
        });
    }

    let pool = require_pool(state, pool_id)?;
    let receipt_kind = kind.receipt_kind();
    let token = pool.token(receipt_kind);

    let asset_amount = assets_for_shares(
        shares,
        tokens.total_supply(&token),
        pool.unpending_amount(receipt_kind),
    )?;
    if asset_amount.is_zero() {
        return Err(StateError::RoundsToZero);
    }

    tokens.burn(&token, caller, owner, shares)?;
    earmark(state, pool_id, receipt_kind, asset_amount)?;

    let snapshot = state
        .get_accumulator(pool_id, receipt_kind)
        .map(|acc| acc.snapshot())
        .ok_or(StateError::PoolNotFound { pool_id })?;

    let delay = match module_state {
        ModuleState::Paused => 0,
        _ => configured_delay,
    };

    let request = RedemptionRequest {
        id: state.allocate_redemption_id(),
        pool_id,
        kind,
        share_amount: shares,
        asset_amount,
        owner: *owner,
        receiver: *receiver,
        queued_at: now,
        delay,
        snapshot,
    };

    if delay == 0 {
        let paid = settle(state, vault, &request)?;
        return Ok(QueueOutcome::Completed { request, paid });
    }

    state.insert_redemption(request.clone());
    Ok(QueueOutcome::Pending(request))
}

/// Complete a queued redemption of the given kind, paying its receiver.
///
/// Returns the request and the amount paid.
pub fn complete_redemption<S, V>(
    state: &mut S,
    vault: &mut V,
    now: u64,
    id: RedemptionId,
    kind: RedemptionKind,
) -> StateResult<(RedemptionRequest, U256)>
where
    S: StateWriter,
    V: AssetVault,
{
    let request = state
        .get_redemption(id)
        .filter(|request| request.kind == kind)
        .cloned()
        .ok_or(StateError::RequestNotFound { id })?;

    let module_state = state.module_state();
    match module_state {
        ModuleState::Triggered => {
            return Err(StateError::InvalidState {
                state: module_state,
            })
        }
        ModuleState::Active if now < request.ready_at() => {
            return Err(StateError::DelayNotElapsed {
                id,
                ready_at: request.ready_at(),
                now,
            })
        }
        _ => {}
    }

    state.remove_redemption(id);
    let paid = settle(state, vault, &request)?;
    Ok((request, paid))
}

/// Assets a redemption of `shares` would be queued for right now.
pub fn preview_redemption<S, T>(
    state: &mut S,
    tokens: &T,
    pool_id: PoolId,
    kind: RedemptionKind,
    shares: U256,
) -> StateResult<U256>
where
    S: StateReader,
    T: ReceiptTokens,
{
    let pool = require_pool(state, pool_id)?;
    let receipt_kind = kind.receipt_kind();
    assets_for_shares(
        shares,
        tokens.total_supply(&pool.token(receipt_kind)),
        pool.unpending_amount(receipt_kind),
    )
}

/// Current view of a queued request, including its slashed payout.
pub fn preview_queued<S: StateReader>(
    state: &mut S,
    now: u64,
    id: RedemptionId,
) -> StateResult<QueuedRedemptionPreview> {
    let request = state
        .get_redemption(id)
        .cloned()
        .ok_or(StateError::RequestNotFound { id })?;

    let delay_remaining = match state.module_state() {
        ModuleState::Paused => 0,
        _ => request.delay_remaining(now),
    };

    Ok(QueuedRedemptionPreview {
        pool_id: request.pool_id,
        kind: request.kind,
        delay_remaining,
        share_amount: request.share_amount,
        asset_amount: scaled_payout(state, &request)?,
        owner: request.owner,
        receiver: request.receiver,
    })
}

fn scaled_payout<S: StateReader>(state: &mut S, request: &RedemptionRequest) -> StateResult<U256> {
    let pool_id = request.pool_id;
    state
        .get_accumulator(pool_id, request.kind.receipt_kind())
        .ok_or(StateError::PoolNotFound { pool_id })?
        .scale_queued_amount(request.asset_amount, &request.snapshot)
}

/// Pay out a request that has left the queue.
fn settle<S, V>(state: &mut S, vault: &mut V, request: &RedemptionRequest) -> StateResult<U256>
where
    S: StateWriter,
    V: AssetVault,
{
    let payout = scaled_payout(state, request)?;
    let pool = require_pool(state, request.pool_id)?;
    let receipt_kind = request.kind.receipt_kind();

    debit(state, request.pool_id, receipt_kind, payout)?;
    release(state, request.pool_id, receipt_kind, payout)?;

    if !payout.is_zero() {
        vault.push(&pool.asset, &request.receiver, payout)?;
    }
    Ok(payout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::memory::{MemoryReceiptTokens, MemoryVault};
    use crate::ledger::deposit_assets;
    use crate::state::LedgerState;
    use bulwark_core::{Pool, ReceiptKind, ReceiptTokenId, WAD};

    const MODULE: Address = [0xAA; 20];
    const ALICE: Address = [1u8; 20];
    const BOB: Address = [2u8; 20];
    const ASSET: [u8; 20] = [7u8; 20];
    const DELAY: u64 = 100;
    const T0: u64 = 1_000;

    struct Harness {
        state: LedgerState,
        vault: MemoryVault,
        tokens: MemoryReceiptTokens,
    }

    impl Harness {
        fn new(deposit: u64) -> Self {
            let mut state = LedgerState::new();
            state.insert_pool(Pool::new(0, ASSET, WAD));
            let mut vault = MemoryVault::new(MODULE);
            vault.mint(&ASSET, &ALICE, U256::from(deposit));
            let mut tokens = MemoryReceiptTokens::new();
            deposit_assets(
                &mut state, &mut vault, &mut tokens, &ALICE, 0, ReceiptKind::Deposit,
                U256::from(deposit), &ALICE, Some(&ALICE),
            )
            .unwrap();
            Self { state, vault, tokens }
        }

        fn queue(&mut self, shares: u64) -> StateResult<QueueOutcome> {
            queue_redemption(
                &mut self.state, &mut self.vault, &mut self.tokens, &ALICE, T0, DELAY, 0,
                RedemptionKind::Withdrawal, U256::from(shares), &BOB, &ALICE,
            )
        }

        fn complete(&mut self, id: RedemptionId, now: u64) -> StateResult<(RedemptionRequest, U256)> {
            complete_redemption(&mut self.state, &mut self.vault, now, id, RedemptionKind::Withdrawal)
        }
    }

    #[test]
    fn test_queue_earmarks_and_burns() {
        let mut h = Harness::new(1000);
        let outcome = h.queue(100).unwrap();

        let QueueOutcome::Pending(request) = outcome else {
            panic!("expected pending request");
        };
        assert_eq!(request.asset_amount, U256::from(100u64));
        assert_eq!(request.ready_at(), T0 + DELAY);
        assert_eq!(h.state.pool(0).unwrap().pending_withdrawals_amount, U256::from(100u64));

        let token = ReceiptTokenId::new(0, ReceiptKind::Deposit);
        assert_eq!(h.tokens.total_supply(&token), U256::from(900u64));
        assert!(h.state.redemption(request.id).is_some());
    }

    #[test]
    fn test_complete_after_delay() {
        let mut h = Harness::new(1000);
        let id = h.queue(100).unwrap().request().id;

        let err = h.complete(id, T0 + DELAY - 1).unwrap_err();
        assert_eq!(
            err,
            StateError::DelayNotElapsed {
                id,
                ready_at: T0 + DELAY,
                now: T0 + DELAY - 1,
            }
        );

        let (_, paid) = h.complete(id, T0 + DELAY).unwrap();
        assert_eq!(paid, U256::from(100u64));
        assert_eq!(h.vault.account_balance(&ASSET, &BOB), U256::from(100u64));

        let pool = h.state.pool(0).unwrap();
        assert_eq!(pool.deposit_amount, U256::from(900u64));
        assert!(pool.pending_withdrawals_amount.is_zero());
        assert!(h.state.check_invariants().is_ok());
    }

    #[test]
    fn test_complete_twice_fails() {
        let mut h = Harness::new(1000);
        let id = h.queue(100).unwrap().request().id;
        h.complete(id, T0 + DELAY).unwrap();
        assert_eq!(h.complete(id, T0 + DELAY), Err(StateError::RequestNotFound { id }));
    }

    #[test]
    fn test_complete_wrong_kind_not_found() {
        let mut h = Harness::new(1000);
        let id = h.queue(100).unwrap().request().id;
        let err = complete_redemption(&mut h.state, &mut h.vault, T0 + DELAY, id, RedemptionKind::Unstake)
            .unwrap_err();
        assert_eq!(err, StateError::RequestNotFound { id });
    }

    #[test]
    fn test_paused_completes_inline() {
        let mut h = Harness::new(1000);
        h.state.module_state = ModuleState::Paused;

        let outcome = h.queue(100).unwrap();
        assert!(matches!(outcome, QueueOutcome::Completed { .. }));
        assert_eq!(outcome.asset_amount(), U256::from(100u64));
        assert_eq!(outcome.request().delay, 0);
        assert_eq!(h.state.redemption_count(), 0);
        assert_eq!(h.vault.account_balance(&ASSET, &BOB), U256::from(100u64));
    }

    #[test]
    fn test_paused_skips_remaining_delay() {
        let mut h = Harness::new(1000);
        let id = h.queue(100).unwrap().request().id;
        h.state.module_state = ModuleState::Paused;

        let preview = preview_queued(&mut h.state, T0, id).unwrap();
        assert_eq!(preview.delay_remaining, 0);
        assert!(h.complete(id, T0).is_ok());
    }

    #[test]
    fn test_triggered_blocks_queue_and_complete() {
        let mut h = Harness::new(1000);
        let id = h.queue(100).unwrap().request().id;
        h.state.module_state = ModuleState::Triggered;

        let triggered = StateError::InvalidState {
            state: ModuleState::Triggered,
        };
        assert_eq!(h.queue(100), Err(triggered.clone()));
        assert_eq!(h.complete(id, T0 + DELAY).unwrap_err(), triggered);
    }

    #[test]
    fn test_queue_zero_shares_rounds_to_zero() {
        let mut h = Harness::new(1000);
        assert_eq!(h.queue(0), Err(StateError::RoundsToZero));
    }

    #[test]
    fn test_queue_more_than_held() {
        let mut h = Harness::new(1000);
        let err = h.queue(1001).unwrap_err();
        assert!(matches!(err, StateError::InsufficientShares { .. }));
    }

    #[test]
    fn test_queue_for_other_owner_needs_allowance() {
        let mut h = Harness::new(1000);
        let err = queue_redemption(
            &mut h.state, &mut h.vault, &mut h.tokens, &BOB, T0, DELAY, 0,
            RedemptionKind::Withdrawal, U256::from(10u64), &BOB, &ALICE,
        )
        .unwrap_err();
        assert!(matches!(err, StateError::InsufficientAllowance { .. }));
    }

    #[test]
    fn test_pending_does_not_dilute_new_deposit() {
        let mut h = Harness::new(1000);
        h.queue(500).unwrap();

        // 500 shares back 500 unpending assets: one share per asset.
        let preview = preview_redemption(&mut h.state, &h.tokens, 0, RedemptionKind::Withdrawal, U256::from(100u64))
            .unwrap();
        assert_eq!(preview, U256::from(100u64));
    }

    #[test]
    fn test_preview_unknown_request() {
        let mut h = Harness::new(1000);
        assert_eq!(
            preview_queued(&mut h.state, T0, 42),
            Err(StateError::RequestNotFound { id: 42 })
        );
    }
}
