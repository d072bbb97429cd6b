//! Undo journal over the in-memory ledger.
//!
//! [`JournaledState`] writes straight through to a [`LedgerState`] and
//! remembers the prior value of every entry it touches. `commit` forgets
//! them; `rollback` puts them back in reverse order. Cost is proportional to
//! the entries an operation writes, not to the size of the ledger.

use std::collections::HashMap;
use std::hash::Hash;

use bulwark_core::{
    Address, AssetId, AssetPool, HandlerStanding, ModuleState, Pool, PoolId, ReceiptKind,
    RedemptionId, RedemptionRequest, TriggerData, TriggerId,
};

use super::ledger_state::LedgerState;
use super::store::{StateReader, StateWriter};
use crate::accumulator::ScalingAccumulator;

/// Prior value of one ledger entry.
#[derive(Clone, Debug)]
enum Undo {
    ModuleState(ModuleState),
    PendingSlashes(u64),
    PoolInserted,
    Pool(PoolId, Pool),
    AssetPool(AssetId, Option<AssetPool>),
    Accumulator(PoolId, ReceiptKind, ScalingAccumulator),
    NextRedemptionId(RedemptionId),
    Redemption(RedemptionId, Option<RedemptionRequest>),
    Trigger(TriggerId, Option<TriggerData>),
    HandlerStanding(Address, Option<HandlerStanding>),
}

/// A ledger view whose writes can be undone.
#[derive(Debug)]
pub struct JournaledState<'a> {
    state: &'a mut LedgerState,
    undo: Vec<Undo>,
}

impl<'a> JournaledState<'a> {
    /// Start journaling writes to `state`.
    pub fn new(state: &'a mut LedgerState) -> Self {
        Self {
            state,
            undo: Vec::new(),
        }
    }

    /// Number of entries that a rollback would restore.
    pub fn pending_changes(&self) -> usize {
        self.undo.len()
    }

    /// Keep every write.
    pub fn commit(self) {}

    /// Restore every entry written through this view.
    pub fn rollback(mut self) {
        let state = &mut *self.state;
        while let Some(entry) = self.undo.pop() {
            match entry {
                Undo::ModuleState(module_state) => state.module_state = module_state,
                Undo::PendingSlashes(count) => state.num_pending_slashes = count,
                Undo::PoolInserted => {
                    state.pools.pop();
                    state.accumulators.pop();
                }
                Undo::Pool(pool_id, pool) => {
                    if let Some(slot) = state.pools.get_mut(usize::from(pool_id)) {
                        *slot = pool;
                    }
                }
                Undo::AssetPool(asset, prior) => restore(&mut state.asset_pools, asset, prior),
                Undo::Accumulator(pool_id, kind, acc) => {
                    if let Some(pair) = state.accumulators.get_mut(usize::from(pool_id)) {
                        pair[kind.index()] = acc;
                    }
                }
                Undo::NextRedemptionId(id) => state.next_redemption_id = id,
                Undo::Redemption(id, Some(request)) => {
                    state.redemptions.insert(id, request);
                }
                Undo::Redemption(id, None) => {
                    state.redemptions.remove(&id);
                }
                Undo::Trigger(trigger_id, prior) => restore(&mut state.triggers, trigger_id, prior),
                Undo::HandlerStanding(handler, prior) => {
                    restore(&mut state.handler_standings, handler, prior)
                }
            }
        }
    }
}

fn restore<K: Eq + Hash, V>(map: &mut HashMap<K, V>, key: K, prior: Option<V>) {
    match prior {
        Some(value) => {
            map.insert(key, value);
        }
        None => {
            map.remove(&key);
        }
    }
}

impl StateReader for JournaledState<'_> {
    fn module_state(&mut self) -> ModuleState {
        self.state.module_state()
    }

    fn num_pending_slashes(&mut self) -> u64 {
        self.state.num_pending_slashes()
    }

    fn get_pool(&mut self, pool_id: PoolId) -> Option<&Pool> {
        self.state.get_pool(pool_id)
    }

    fn pool_count(&mut self) -> usize {
        self.state.pool_count()
    }

    fn get_asset_pool(&mut self, asset: &AssetId) -> Option<&AssetPool> {
        self.state.get_asset_pool(asset)
    }

    fn get_accumulator(&mut self, pool_id: PoolId, kind: ReceiptKind) -> Option<&ScalingAccumulator> {
        self.state.get_accumulator(pool_id, kind)
    }

    fn get_redemption(&mut self, id: RedemptionId) -> Option<&RedemptionRequest> {
        self.state.get_redemption(id)
    }

    fn get_trigger(&mut self, trigger_id: &TriggerId) -> Option<&TriggerData> {
        self.state.get_trigger(trigger_id)
    }

    fn handler_standing(&mut self, handler: &Address) -> HandlerStanding {
        self.state.handler_standing(handler)
    }
}

impl StateWriter for JournaledState<'_> {
    fn set_module_state(&mut self, module_state: ModuleState) {
        self.undo.push(Undo::ModuleState(self.state.module_state));
        self.state.set_module_state(module_state);
    }

    fn set_num_pending_slashes(&mut self, count: u64) {
        self.undo.push(Undo::PendingSlashes(self.state.num_pending_slashes));
        self.state.set_num_pending_slashes(count);
    }

    fn insert_pool(&mut self, pool: Pool) {
        let prior = self.state.asset_pools.get(&pool.asset).cloned();
        self.undo.push(Undo::AssetPool(pool.asset, prior));
        self.undo.push(Undo::PoolInserted);
        self.state.insert_pool(pool);
    }

    fn pool_mut(&mut self, pool_id: PoolId) -> Option<&mut Pool> {
        let pool = self.state.pools.get_mut(usize::from(pool_id))?;
        self.undo.push(Undo::Pool(pool_id, pool.clone()));
        Some(pool)
    }

    fn get_or_create_asset_pool(&mut self, asset: &AssetId) -> &mut AssetPool {
        let prior = self.state.asset_pools.get(asset).cloned();
        self.undo.push(Undo::AssetPool(*asset, prior));
        self.state.get_or_create_asset_pool(asset)
    }

    fn accumulator_mut(
        &mut self,
        pool_id: PoolId,
        kind: ReceiptKind,
    ) -> Option<&mut ScalingAccumulator> {
        let acc = self.state.accumulator_mut(pool_id, kind)?;
        self.undo.push(Undo::Accumulator(pool_id, kind, acc.clone()));
        Some(acc)
    }

    fn allocate_redemption_id(&mut self) -> RedemptionId {
        self.undo.push(Undo::NextRedemptionId(self.state.next_redemption_id));
        self.state.allocate_redemption_id()
    }

    fn insert_redemption(&mut self, request: RedemptionRequest) {
        let id = request.id;
        let prior = self.state.redemptions.insert(id, request);
        self.undo.push(Undo::Redemption(id, prior));
    }

    fn remove_redemption(&mut self, id: RedemptionId) -> Option<RedemptionRequest> {
        let removed = self.state.remove_redemption(id)?;
        self.undo.push(Undo::Redemption(id, Some(removed.clone())));
        Some(removed)
    }

    fn insert_trigger(&mut self, trigger_id: TriggerId, data: TriggerData) {
        let prior = self.state.triggers.insert(trigger_id, data);
        self.undo.push(Undo::Trigger(trigger_id, prior));
    }

    fn trigger_mut(&mut self, trigger_id: &TriggerId) -> Option<&mut TriggerData> {
        let trigger = self.state.triggers.get_mut(trigger_id)?;
        self.undo.push(Undo::Trigger(*trigger_id, Some(trigger.clone())));
        Some(trigger)
    }

    fn set_handler_standing(&mut self, handler: Address, standing: HandlerStanding) {
        let prior = self.state.handler_standings.get(&handler).copied();
        self.undo.push(Undo::HandlerStanding(handler, prior));
        self.state.set_handler_standing(handler, standing);
    }
}
