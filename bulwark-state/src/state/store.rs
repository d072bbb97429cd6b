//! State storage traits.
//!
//! These traits abstract over where module state lives so the ledger,
//! queue and slashing logic can run against any backing store.

use bulwark_core::{
    Address, AssetId, AssetPool, HandlerStanding, ModuleState, Pool, PoolId, ReceiptKind,
    RedemptionId, RedemptionRequest, TriggerData, TriggerId, U256,
};

use crate::accumulator::ScalingAccumulator;

/// Read access to module state.
///
/// Methods take `&mut self` to allow implementations to lazily load data
/// from a backing store into an internal cache on first access.
pub trait StateReader {
    // === Module Operations ===

    /// Current lifecycle state.
    fn module_state(&mut self) -> ModuleState;

    /// Slashes owed across all payout handlers.
    fn num_pending_slashes(&mut self) -> u64;

    // === Pool Operations ===

    /// Get a pool by id.
    fn get_pool(&mut self, pool_id: PoolId) -> Option<&Pool>;

    /// Number of configured pools. Pool ids are `0..pool_count`.
    fn pool_count(&mut self) -> usize;

    /// Check if a pool exists.
    fn pool_exists(&mut self, pool_id: PoolId) -> bool {
        self.get_pool(pool_id).is_some()
    }

    /// Get the module-wide total for an asset.
    fn get_asset_pool(&mut self, asset: &AssetId) -> Option<&AssetPool>;

    /// Assets the module accounts for, zero for an unseen asset.
    fn asset_total(&mut self, asset: &AssetId) -> U256 {
        self.get_asset_pool(asset)
            .map(|asset_pool| asset_pool.amount)
            .unwrap_or_default()
    }

    // === Accumulator Operations ===

    /// Get the scaling accumulator for one component of a pool.
    fn get_accumulator(&mut self, pool_id: PoolId, kind: ReceiptKind) -> Option<&ScalingAccumulator>;

    // === Redemption Operations ===

    /// Get a queued redemption.
    fn get_redemption(&mut self, id: RedemptionId) -> Option<&RedemptionRequest>;

    // === Trigger Operations ===

    /// Get a configured trigger.
    fn get_trigger(&mut self, trigger_id: &TriggerId) -> Option<&TriggerData>;

    /// Slashes owed by one payout handler.
    fn handler_standing(&mut self, handler: &Address) -> HandlerStanding;
}

/// Mutable access to module state.
pub trait StateWriter: StateReader {
    // === Module Mutations ===

    /// Replace the lifecycle state.
    fn set_module_state(&mut self, state: ModuleState);

    /// Replace the global pending-slash count.
    fn set_num_pending_slashes(&mut self, count: u64);

    // === Pool Mutations ===

    /// Insert a new pool together with fresh accumulators for both components.
    fn insert_pool(&mut self, pool: Pool);

    /// Mutable access to an existing pool.
    fn pool_mut(&mut self, pool_id: PoolId) -> Option<&mut Pool>;

    /// Get or create the module-wide total for an asset.
    fn get_or_create_asset_pool(&mut self, asset: &AssetId) -> &mut AssetPool;

    // === Accumulator Mutations ===

    /// Mutable access to the accumulator of one component of a pool.
    fn accumulator_mut(
        &mut self,
        pool_id: PoolId,
        kind: ReceiptKind,
    ) -> Option<&mut ScalingAccumulator>;

    // === Redemption Mutations ===

    /// Allocate the next redemption id.
    fn allocate_redemption_id(&mut self) -> RedemptionId;

    /// Store a queued redemption.
    fn insert_redemption(&mut self, request: RedemptionRequest);

    /// Remove and return a queued redemption.
    fn remove_redemption(&mut self, id: RedemptionId) -> Option<RedemptionRequest>;

    // === Trigger Mutations ===

    /// Register a trigger.
    fn insert_trigger(&mut self, trigger_id: TriggerId, data: TriggerData);

    /// Mutable access to a configured trigger.
    fn trigger_mut(&mut self, trigger_id: &TriggerId) -> Option<&mut TriggerData>;

    /// Replace a payout handler's standing.
    fn set_handler_standing(&mut self, handler: Address, standing: HandlerStanding);
}

/// Combined trait for full state access.
///
/// Any type implementing both `StateReader` and `StateWriter` automatically
/// implements `StateStore`.
pub trait StateStore: StateReader + StateWriter {}

impl<T: StateReader + StateWriter> StateStore for T {}
