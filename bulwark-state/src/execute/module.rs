//! Safety module facade.
//!
//! Every operation runs inside a transaction: ledger writes go through a
//! [`JournaledState`] and the vault and token ledgers record their own
//! changes. A failed call rolls all of them back and drops the events it
//! recorded, so it leaves no trace. Configuration changes are made last,
//! once nothing else can fail.

use bulwark_core::{
    Address, AssetId, HandlerStanding, ModuleState, Pool, PoolId, QueuedRedemptionPreview,
    ReceiptKind, RedemptionId, RedemptionKind, RedemptionRequest, SlashInstruction, TriggerData,
    TriggerId, U256,
};

use super::context::ExecutionContext;
use super::events::ModuleEvent;
use crate::accumulator::ScalingAccumulator;
use crate::config::{ConfigUpdate, Configurator, ModuleConfig, PoolConfig, QueuedConfigUpdate, TriggerConfig};
use crate::error::{StateError, StateResult};
use crate::external::{AssetVault, ReceiptTokens, Transactional, TriggerOracle};
use crate::ledger::{deposit_assets, preview_deposit};
use crate::redemption::{
    complete_redemption, preview_queued, preview_redemption, queue_redemption, QueueOutcome,
};
use crate::slash::{execute_slash, SlashReport};
use crate::state::{JournaledState, LedgerState, StateReader, StateWriter};
use crate::trigger::{apply_trigger, pause, unpause};

/// Everything an operation may change.
#[derive(Debug)]
struct ModuleParts<V, T> {
    ledger: LedgerState,
    vault: V,
    tokens: T,
    configurator: Configurator,
    events: Vec<ModuleEvent>,
}

/// One operation's view of the module.
struct Stage<'a, V, T> {
    ledger: JournaledState<'a>,
    vault: &'a mut V,
    tokens: &'a mut T,
    configurator: &'a mut Configurator,
    events: &'a mut Vec<ModuleEvent>,
}

impl<V, T> Stage<'_, V, T> {
    fn record_state_change(&mut self, from: ModuleState, to: ModuleState) {
        if from != to {
            tracing::info!("Module state changed: {} -> {}", from, to);
            self.events.push(ModuleEvent::StateChanged { from, to });
        }
    }

    fn register_pools(&mut self, pools: &[PoolConfig]) -> StateResult<()> {
        for pool in pools {
            let pool_id = PoolId::try_from(self.ledger.pool_count()).map_err(|_| {
                StateError::InvalidConfiguration {
                    reason: "too many pools".to_string(),
                }
            })?;
            self.ledger
                .insert_pool(Pool::new(pool_id, pool.asset, pool.max_slash_percentage));
        }
        Ok(())
    }

    fn register_triggers(&mut self, triggers: &[TriggerConfig]) {
        for trigger in triggers {
            self.ledger
                .insert_trigger(trigger.trigger_id, TriggerData::armed(trigger.payout_handler));
        }
    }
}

/// A protection fund: pools, their redemption queue, and the trigger and
/// slash lifecycle, backed by external asset and share-token ledgers.
#[derive(Debug)]
pub struct SafetyModule<V, T, O> {
    parts: ModuleParts<V, T>,
    oracle: O,
}

impl<V, T, O> SafetyModule<V, T, O>
where
    V: AssetVault,
    T: ReceiptTokens,
    O: TriggerOracle,
{
    /// Create a module from a configuration.
    ///
    /// Pools get ids in configuration order.
    pub fn new(config: ModuleConfig, vault: V, tokens: T, oracle: O) -> StateResult<Self> {
        let configurator = Configurator::new(config)?;
        let config = configurator.config().clone();
        let mut module = Self {
            parts: ModuleParts {
                ledger: LedgerState::new(),
                vault,
                tokens,
                configurator,
                events: Vec::new(),
            },
            oracle,
        };

        module.atomically(|stage, _| {
            stage.register_pools(&config.pools)?;
            stage.register_triggers(&config.triggers);
            Ok(())
        })?;

        tracing::info!(
            "Safety module created with {} pools and {} triggers",
            config.pools.len(),
            config.triggers.len()
        );

        Ok(module)
    }

    /// Run `op` in a transaction; undo everything it changed if it fails.
    fn atomically<R>(
        &mut self,
        op: impl FnOnce(&mut Stage<'_, V, T>, &O) -> StateResult<R>,
    ) -> StateResult<R> {
        let ModuleParts {
            ledger,
            vault,
            tokens,
            configurator,
            events,
        } = &mut self.parts;
        let event_count = events.len();
        vault.begin();
        tokens.begin();

        let mut stage = Stage {
            ledger: JournaledState::new(ledger),
            vault,
            tokens,
            configurator,
            events,
        };
        let result = op(&mut stage, &self.oracle);

        match result {
            Ok(_) => {
                stage.ledger.commit();
                stage.vault.commit();
                stage.tokens.commit();
            }
            Err(ref err) => {
                tracing::debug!("Operation failed, rolling back: {}", err);
                stage.ledger.rollback();
                stage.vault.rollback();
                stage.tokens.rollback();
                stage.events.truncate(event_count);
            }
        }
        result
    }

    // === Deposits ===

    /// Pull `amount` from `from` into a pool's deposit component.
    ///
    /// A caller other than `from` spends `from`'s asset allowance.
    pub fn deposit(
        &mut self,
        ctx: &ExecutionContext,
        pool_id: PoolId,
        amount: U256,
        receiver: &Address,
        from: &Address,
    ) -> StateResult<U256> {
        self.deposit_into(ctx, pool_id, ReceiptKind::Deposit, amount, receiver, Some(from))
    }

    /// Credit assets already transferred to the module as a deposit.
    pub fn deposit_without_transfer(
        &mut self,
        ctx: &ExecutionContext,
        pool_id: PoolId,
        amount: U256,
        receiver: &Address,
    ) -> StateResult<U256> {
        self.deposit_into(ctx, pool_id, ReceiptKind::Deposit, amount, receiver, None)
    }

    /// Pull `amount` from `from` into a pool's stake component.
    pub fn stake(
        &mut self,
        ctx: &ExecutionContext,
        pool_id: PoolId,
        amount: U256,
        receiver: &Address,
        from: &Address,
    ) -> StateResult<U256> {
        self.deposit_into(ctx, pool_id, ReceiptKind::Stake, amount, receiver, Some(from))
    }

    /// Credit assets already transferred to the module as a stake.
    pub fn stake_without_transfer(
        &mut self,
        ctx: &ExecutionContext,
        pool_id: PoolId,
        amount: U256,
        receiver: &Address,
    ) -> StateResult<U256> {
        self.deposit_into(ctx, pool_id, ReceiptKind::Stake, amount, receiver, None)
    }

    fn deposit_into(
        &mut self,
        ctx: &ExecutionContext,
        pool_id: PoolId,
        kind: ReceiptKind,
        amount: U256,
        receiver: &Address,
        from: Option<&Address>,
    ) -> StateResult<U256> {
        self.atomically(|stage, _| {
            let shares = deposit_assets(
                &mut stage.ledger,
                &mut *stage.vault,
                &mut *stage.tokens,
                &ctx.caller,
                pool_id,
                kind,
                amount,
                receiver,
                from,
            )?;

            tracing::debug!("{:?} of {} into pool {} minted {} shares", kind, amount, pool_id, shares);
            stage.events.push(ModuleEvent::Deposited {
                pool_id,
                kind,
                caller: ctx.caller,
                receiver: *receiver,
                assets: amount,
                shares,
            });
            Ok(shares)
        })
    }

    // === Redemptions ===

    /// Queue a withdrawal of deposit shares. Returns the request id and its
    /// asset amount (the paid amount when it completed immediately).
    pub fn queue_redemption(
        &mut self,
        ctx: &ExecutionContext,
        pool_id: PoolId,
        shares: U256,
        receiver: &Address,
        owner: &Address,
    ) -> StateResult<(RedemptionId, U256)> {
        self.queue(ctx, RedemptionKind::Withdrawal, pool_id, shares, receiver, owner)
    }

    /// Queue an unstake of stake shares.
    pub fn queue_unstake(
        &mut self,
        ctx: &ExecutionContext,
        pool_id: PoolId,
        shares: U256,
        receiver: &Address,
        owner: &Address,
    ) -> StateResult<(RedemptionId, U256)> {
        self.queue(ctx, RedemptionKind::Unstake, pool_id, shares, receiver, owner)
    }

    fn queue(
        &mut self,
        ctx: &ExecutionContext,
        kind: RedemptionKind,
        pool_id: PoolId,
        shares: U256,
        receiver: &Address,
        owner: &Address,
    ) -> StateResult<(RedemptionId, U256)> {
        self.atomically(|stage, _| {
            let delays = &stage.configurator.config().delays;
            let configured_delay = match kind {
                RedemptionKind::Withdrawal => delays.withdrawal_delay,
                RedemptionKind::Unstake => delays.unstake_delay,
            };

            let outcome = queue_redemption(
                &mut stage.ledger,
                &mut *stage.vault,
                &mut *stage.tokens,
                &ctx.caller,
                ctx.timestamp,
                configured_delay,
                pool_id,
                kind,
                shares,
                receiver,
                owner,
            )?;

            let request = outcome.request();
            let event = match &outcome {
                QueueOutcome::Pending(request) => {
                    tracing::debug!(
                        "Redemption {} queued: {} assets ready at {}",
                        request.id,
                        request.asset_amount,
                        request.ready_at()
                    );
                    ModuleEvent::RedemptionPending {
                        id: request.id,
                        pool_id,
                        kind,
                        owner: request.owner,
                        receiver: request.receiver,
                        shares: request.share_amount,
                        assets: request.asset_amount,
                        ready_at: request.ready_at(),
                    }
                }
                QueueOutcome::Completed { request, paid } => {
                    tracing::debug!("Redemption {} completed immediately: {} assets", request.id, paid);
                    redeemed_event(request, *paid)
                }
            };
            stage.events.push(event);

            Ok((request.id, outcome.asset_amount()))
        })
    }

    /// Complete a queued withdrawal. Returns the assets paid.
    pub fn complete_redemption(&mut self, ctx: &ExecutionContext, id: RedemptionId) -> StateResult<U256> {
        self.complete(ctx, id, RedemptionKind::Withdrawal)
    }

    /// Complete a queued unstake. Returns the assets paid.
    pub fn complete_unstake(&mut self, ctx: &ExecutionContext, id: RedemptionId) -> StateResult<U256> {
        self.complete(ctx, id, RedemptionKind::Unstake)
    }

    fn complete(
        &mut self,
        ctx: &ExecutionContext,
        id: RedemptionId,
        kind: RedemptionKind,
    ) -> StateResult<U256> {
        self.atomically(|stage, _| {
            let (request, paid) =
                complete_redemption(&mut stage.ledger, &mut *stage.vault, ctx.timestamp, id, kind)?;

            tracing::debug!(
                "Redemption {} completed: {} of {} queued assets paid",
                id,
                paid,
                request.asset_amount
            );
            stage.events.push(redeemed_event(&request, paid));
            Ok(paid)
        })
    }

    // === Previews ===

    /// Assets `shares` would be queued for right now.
    pub fn preview_redemption(
        &mut self,
        pool_id: PoolId,
        kind: RedemptionKind,
        shares: U256,
    ) -> StateResult<U256> {
        preview_redemption(&mut self.parts.ledger, &self.parts.tokens, pool_id, kind, shares)
    }

    /// Shares a deposit or stake of `assets` would mint right now.
    pub fn preview_deposit(
        &mut self,
        pool_id: PoolId,
        kind: ReceiptKind,
        assets: U256,
    ) -> StateResult<U256> {
        preview_deposit(&mut self.parts.ledger, &self.parts.tokens, pool_id, kind, assets)
    }

    /// Current view of a queued request.
    pub fn preview_queued(
        &mut self,
        ctx: &ExecutionContext,
        id: RedemptionId,
    ) -> StateResult<QueuedRedemptionPreview> {
        preview_queued(&mut self.parts.ledger, ctx.timestamp, id)
    }

    // === Triggers and Slashing ===

    /// Apply a fired trigger. Returns the resulting module state.
    pub fn trigger(&mut self, trigger_id: &TriggerId) -> StateResult<ModuleState> {
        self.atomically(|stage, oracle| {
            let (data, from, to) = apply_trigger(&mut stage.ledger, oracle, trigger_id)?;

            tracing::info!(
                "Trigger applied, {} slashes pending",
                stage.ledger.num_pending_slashes()
            );
            stage.events.push(ModuleEvent::TriggerApplied {
                trigger_id: *trigger_id,
                payout_handler: data.payout_handler,
            });
            stage.record_state_change(from, to);
            Ok(to)
        })
    }

    /// Execute one slash owed to the caller, sending the assets to `receiver`.
    ///
    /// Once the last outstanding slash lands the module returns to active
    /// and any queued configuration update is discarded.
    pub fn slash(
        &mut self,
        ctx: &ExecutionContext,
        instructions: &[SlashInstruction],
        receiver: &Address,
    ) -> StateResult<SlashReport> {
        self.atomically(|stage, _| {
            let report = execute_slash(
                &mut stage.ledger,
                &mut *stage.vault,
                &ctx.caller,
                instructions,
                receiver,
            )?;

            for slash in &report.slashes {
                tracing::info!(
                    "Pool {} slashed by {} (deposit {}, stake {})",
                    slash.pool_id,
                    slash.amount,
                    slash.deposit_part,
                    slash.stake_part
                );
                stage.events.push(ModuleEvent::Slashed {
                    pool_id: slash.pool_id,
                    payout_handler: ctx.caller,
                    receiver: *receiver,
                    amount: slash.amount,
                });
            }

            if let Some((from, to)) = report.state_change {
                stage.record_state_change(from, to);
                if to == ModuleState::Active && stage.configurator.discard().is_some() {
                    tracing::warn!("Queued configuration update discarded after slashing");
                    stage.events.push(ModuleEvent::ConfigUpdateDiscarded);
                }
            }

            Ok(report)
        })
    }

    /// Pause the module. Owner or pauser only.
    pub fn pause(&mut self, ctx: &ExecutionContext) -> StateResult<ModuleState> {
        self.atomically(|stage, _| {
            let config = stage.configurator.config();
            let (owner, pauser) = (config.owner, config.pauser);
            let (from, to) = pause(&mut stage.ledger, &ctx.caller, &owner, &pauser)?;
            stage.record_state_change(from, to);
            Ok(to)
        })
    }

    /// Unpause the module. Owner only.
    pub fn unpause(&mut self, ctx: &ExecutionContext) -> StateResult<ModuleState> {
        self.atomically(|stage, _| {
            let owner = stage.configurator.config().owner;
            let (from, to) = unpause(&mut stage.ledger, &ctx.caller, &owner)?;
            stage.record_state_change(from, to);
            Ok(to)
        })
    }

    // === Configuration ===

    /// Queue a configuration update. Owner only.
    pub fn queue_config_update(
        &mut self,
        ctx: &ExecutionContext,
        update: ConfigUpdate,
    ) -> StateResult<QueuedConfigUpdate> {
        self.atomically(|stage, _| {
            let queued = stage
                .configurator
                .queue_update(&ctx.caller, update, ctx.timestamp)?
                .clone();

            tracing::info!(
                "Configuration update queued, finalizable from {} to {}",
                queued.opens_at,
                queued.closes_at
            );
            stage.events.push(ModuleEvent::ConfigUpdateQueued {
                opens_at: queued.opens_at,
                closes_at: queued.closes_at,
            });
            Ok(queued)
        })
    }

    /// Apply the queued configuration update. Only while active.
    pub fn finalize_config_update(&mut self, ctx: &ExecutionContext) -> StateResult<ConfigUpdate> {
        self.atomically(|stage, _| {
            let state = stage.ledger.module_state();
            if state != ModuleState::Active {
                return Err(StateError::InvalidState { state });
            }

            let update = stage.configurator.ready(ctx.timestamp)?.clone();
            stage.register_pools(&update.pools)?;
            stage.register_triggers(&update.triggers);
            stage.configurator.finalize(ctx.timestamp)?;

            tracing::info!(
                "Configuration update applied: {} pools, {} triggers added",
                update.pools.len(),
                update.triggers.len()
            );
            stage.events.push(ModuleEvent::ConfigUpdateApplied {
                pools_added: update.pools.len(),
                triggers_added: update.triggers.len(),
            });
            Ok(update)
        })
    }

    // === Accessors ===

    /// Current lifecycle state.
    pub fn module_state(&self) -> ModuleState {
        self.parts.ledger.module_state
    }

    /// A pool by id.
    pub fn pool(&self, pool_id: PoolId) -> Option<&Pool> {
        self.parts.ledger.pool(pool_id)
    }

    /// All pools in id order.
    pub fn pools(&self) -> &[Pool] {
        &self.parts.ledger.pools
    }

    /// A queued redemption.
    pub fn redemption(&self, id: RedemptionId) -> Option<&RedemptionRequest> {
        self.parts.ledger.redemption(id)
    }

    /// Accumulator for one pool component.
    pub fn accumulator(&self, pool_id: PoolId, kind: ReceiptKind) -> Option<&ScalingAccumulator> {
        self.parts.ledger.accumulator(pool_id, kind)
    }

    /// Module-wide total for an asset.
    pub fn asset_amount(&self, asset: &AssetId) -> U256 {
        self.parts.ledger.asset_amount(asset)
    }

    /// A configured trigger.
    pub fn trigger_data(&self, trigger_id: &TriggerId) -> Option<&TriggerData> {
        self.parts.ledger.trigger(trigger_id)
    }

    /// Slashes owed across all handlers.
    pub fn num_pending_slashes(&self) -> u64 {
        self.parts.ledger.num_pending_slashes
    }

    /// Slashes owed by one handler.
    pub fn handler_standing(&self, handler: &Address) -> HandlerStanding {
        self.parts.ledger.standing(handler)
    }

    /// Live configuration.
    pub fn config(&self) -> &ModuleConfig {
        self.parts.configurator.config()
    }

    /// Queued configuration update, if any.
    pub fn queued_config_update(&self) -> Option<&QueuedConfigUpdate> {
        self.parts.configurator.queued()
    }

    /// The full ledger.
    pub fn ledger(&self) -> &LedgerState {
        &self.parts.ledger
    }

    /// Asset custody.
    pub fn vault(&self) -> &V {
        &self.parts.vault
    }

    /// Mutable asset custody, for moving assets outside module operations.
    pub fn vault_mut(&mut self) -> &mut V {
        &mut self.parts.vault
    }

    /// Share tokens.
    pub fn tokens(&self) -> &T {
        &self.parts.tokens
    }

    /// Mutable share tokens, for approvals and transfers outside module operations.
    pub fn tokens_mut(&mut self) -> &mut T {
        &mut self.parts.tokens
    }

    /// Mutable trigger oracle.
    pub fn oracle_mut(&mut self) -> &mut O {
        &mut self.oracle
    }

    /// Events recorded since the last drain.
    pub fn events(&self) -> &[ModuleEvent] {
        &self.parts.events
    }

    /// Drain recorded events.
    pub fn take_events(&mut self) -> Vec<ModuleEvent> {
        std::mem::take(&mut self.parts.events)
    }
}

fn redeemed_event(request: &RedemptionRequest, paid: U256) -> ModuleEvent {
    ModuleEvent::Redeemed {
        id: request.id,
        pool_id: request.pool_id,
        kind: request.kind,
        owner: request.owner,
        receiver: request.receiver,
        shares: request.share_amount,
        assets: paid,
    }
}
