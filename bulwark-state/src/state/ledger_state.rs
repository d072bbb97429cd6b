//! In-memory module state container.

use std::collections::{BTreeMap, HashMap};

use bulwark_core::{
    Address, AssetId, AssetPool, HandlerStanding, ModuleState, Pool, PoolId, ReceiptKind,
    RedemptionId, RedemptionRequest, TriggerData, TriggerId, U256,
};
use serde::{Deserialize, Serialize};

use super::store::{StateReader, StateWriter};
use crate::accumulator::ScalingAccumulator;

/// In-memory module state.
///
/// Pools and their accumulators are indexed by pool id; everything else
/// is keyed by identifier.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    /// Pools in id order.
    pub pools: Vec<Pool>,

    /// Module-wide totals per asset.
    pub asset_pools: HashMap<AssetId, AssetPool>,

    /// Accumulators per pool, indexed by `ReceiptKind::index`.
    pub accumulators: Vec<[ScalingAccumulator; 2]>,

    /// Queued redemptions by id.
    pub redemptions: BTreeMap<RedemptionId, RedemptionRequest>,

    /// Next redemption id to hand out.
    pub next_redemption_id: RedemptionId,

    /// Configured triggers.
    pub triggers: HashMap<TriggerId, TriggerData>,

    /// Payout handlers that owe at least one slash.
    pub handler_standings: HashMap<Address, HandlerStanding>,

    /// Slashes owed across all handlers.
    pub num_pending_slashes: u64,

    /// Lifecycle state.
    pub module_state: ModuleState,
}

impl LedgerState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a pool by id.
    pub fn pool(&self, pool_id: PoolId) -> Option<&Pool> {
        self.pools.get(usize::from(pool_id))
    }

    /// Get the accumulator of one pool component.
    pub fn accumulator(&self, pool_id: PoolId, kind: ReceiptKind) -> Option<&ScalingAccumulator> {
        self.accumulators
            .get(usize::from(pool_id))
            .map(|pair| &pair[kind.index()])
    }

    /// Get a queued redemption.
    pub fn redemption(&self, id: RedemptionId) -> Option<&RedemptionRequest> {
        self.redemptions.get(&id)
    }

    /// Get a configured trigger.
    pub fn trigger(&self, trigger_id: &TriggerId) -> Option<&TriggerData> {
        self.triggers.get(trigger_id)
    }

    /// Module-wide total for an asset.
    pub fn asset_amount(&self, asset: &AssetId) -> U256 {
        self.asset_pools
            .get(asset)
            .map(|asset_pool| asset_pool.amount)
            .unwrap_or_default()
    }

    /// Slashes owed by a payout handler.
    pub fn standing(&self, handler: &Address) -> HandlerStanding {
        self.handler_standings.get(handler).copied().unwrap_or_default()
    }

    /// Number of queued redemptions.
    pub fn redemption_count(&self) -> usize {
        self.redemptions.len()
    }

    /// Check the ledger invariants, describing the first one that fails.
    pub fn check_invariants(&self) -> Result<(), String> {
        for pool in &self.pools {
            if !pool.is_consistent() {
                return Err(format!("pool {} pending exceeds its component", pool.pool_id));
            }
        }

        for pair in &self.accumulators {
            for acc in pair {
                if acc.entries().iter().any(|entry| *entry < bulwark_core::WAD) {
                    return Err("accumulator entry below one".to_string());
                }
            }
        }

        // An era's entry only grows, so it never sits below a value a queued
        // request snapshotted from it.
        for request in self.redemptions.values() {
            let snapshot = &request.snapshot;
            let entry = self
                .accumulator(request.pool_id, request.kind.receipt_kind())
                .and_then(|acc| acc.entries().get(snapshot.index).copied());
            match entry {
                Some(entry) if entry >= snapshot.value => {}
                Some(entry) => {
                    return Err(format!(
                        "redemption {} snapshot {} above era {} entry {}",
                        request.id, snapshot.value, snapshot.index, entry
                    ));
                }
                None => {
                    return Err(format!(
                        "redemption {} snapshot refers to missing era {}",
                        request.id, snapshot.index
                    ));
                }
            }
        }

        let owed: u64 = self
            .handler_standings
            .values()
            .map(|standing| standing.pending())
            .sum();
        if owed != self.num_pending_slashes {
            return Err(format!(
                "handlers owe {owed} slashes, module counts {}",
                self.num_pending_slashes
            ));
        }

        match (self.module_state, self.num_pending_slashes) {
            (ModuleState::Active, n) if n > 0 => {
                return Err(format!("module active with {n} pending slashes"));
            }
            (ModuleState::Triggered, 0) => {
                return Err("module triggered without pending slashes".to_string());
            }
            _ => {}
        }

        let mut expected: HashMap<AssetId, U256> = HashMap::new();
        for pool in &self.pools {
            let total = expected.entry(pool.asset).or_default();
            *total = *total + pool.total_amount();
        }
        for (asset, amount) in &expected {
            if self.asset_amount(asset) != *amount {
                return Err(format!(
                    "asset total {} does not match pools {}",
                    self.asset_amount(asset),
                    amount
                ));
            }
        }

        Ok(())
    }
}

impl StateReader for LedgerState {
    fn module_state(&mut self) -> ModuleState {
        self.module_state
    }

    fn num_pending_slashes(&mut self) -> u64 {
        self.num_pending_slashes
    }

    fn get_pool(&mut self, pool_id: PoolId) -> Option<&Pool> {
        self.pools.get(usize::from(pool_id))
    }

    fn pool_count(&mut self) -> usize {
        self.pools.len()
    }

    fn get_asset_pool(&mut self, asset: &AssetId) -> Option<&AssetPool> {
        self.asset_pools.get(asset)
    }

    fn get_accumulator(&mut self, pool_id: PoolId, kind: ReceiptKind) -> Option<&ScalingAccumulator> {
        self.accumulator(pool_id, kind)
    }

    fn get_redemption(&mut self, id: RedemptionId) -> Option<&RedemptionRequest> {
        self.redemptions.get(&id)
    }

    fn get_trigger(&mut self, trigger_id: &TriggerId) -> Option<&TriggerData> {
        self.triggers.get(trigger_id)
    }

    fn handler_standing(&mut self, handler: &Address) -> HandlerStanding {
        self.standing(handler)
    }
}

impl StateWriter for LedgerState {
    fn set_module_state(&mut self, state: ModuleState) {
        self.module_state = state;
    }

    fn set_num_pending_slashes(&mut self, count: u64) {
        self.num_pending_slashes = count;
    }

    fn insert_pool(&mut self, pool: Pool) {
        self.asset_pools.entry(pool.asset).or_default();
        self.pools.push(pool);
        self.accumulators
            .push([ScalingAccumulator::new(), ScalingAccumulator::new()]);
    }

    fn pool_mut(&mut self, pool_id: PoolId) -> Option<&mut Pool> {
        self.pools.get_mut(usize::from(pool_id))
    }

    fn get_or_create_asset_pool(&mut self, asset: &AssetId) -> &mut AssetPool {
        self.asset_pools.entry(*asset).or_default()
    }

    fn accumulator_mut(
        &mut self,
        pool_id: PoolId,
        kind: ReceiptKind,
    ) -> Option<&mut ScalingAccumulator> {
        self.accumulators
            .get_mut(usize::from(pool_id))
            .map(|pair| &mut pair[kind.index()])
    }

    fn allocate_redemption_id(&mut self) -> RedemptionId {
        let id = self.next_redemption_id;
        self.next_redemption_id += 1;
        id
    }

    fn insert_redemption(&mut self, request: RedemptionRequest) {
        self.redemptions.insert(request.id, request);
    }

    fn remove_redemption(&mut self, id: RedemptionId) -> Option<RedemptionRequest> {
        self.redemptions.remove(&id)
    }

    fn insert_trigger(&mut self, trigger_id: TriggerId, data: TriggerData) {
        self.triggers.insert(trigger_id, data);
    }

    fn trigger_mut(&mut self, trigger_id: &TriggerId) -> Option<&mut TriggerData> {
        self.triggers.get_mut(trigger_id)
    }

    fn set_handler_standing(&mut self, handler: Address, standing: HandlerStanding) {
        match standing {
            HandlerStanding::Idle => {
                self.handler_standings.remove(&handler);
            }
            owing => {
                self.handler_standings.insert(handler, owing);
            }
        }
    }
}
