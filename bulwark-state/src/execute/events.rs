//! Events recorded by successful operations.

use bulwark_core::{
    Address, ModuleState, PoolId, ReceiptKind, RedemptionId, RedemptionKind, TriggerId, U256,
};
use serde::{Deserialize, Serialize};

/// Something observable that an operation did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleEvent {
    /// Assets deposited or staked.
    Deposited {
        pool_id: PoolId,
        kind: ReceiptKind,
        caller: Address,
        receiver: Address,
        assets: U256,
        shares: U256,
    },

    /// A redemption was queued and waits for its delay.
    RedemptionPending {
        id: RedemptionId,
        pool_id: PoolId,
        kind: RedemptionKind,
        owner: Address,
        receiver: Address,
        shares: U256,
        assets: U256,
        ready_at: u64,
    },

    /// A redemption paid out.
    Redeemed {
        id: RedemptionId,
        pool_id: PoolId,
        kind: RedemptionKind,
        owner: Address,
        receiver: Address,
        shares: U256,
        assets: U256,
    },

    /// A fired trigger was applied.
    TriggerApplied {
        trigger_id: TriggerId,
        payout_handler: Address,
    },

    /// Assets were slashed from a pool.
    Slashed {
        pool_id: PoolId,
        payout_handler: Address,
        receiver: Address,
        amount: U256,
    },

    /// Lifecycle state changed.
    StateChanged { from: ModuleState, to: ModuleState },

    /// A configuration update was queued.
    ConfigUpdateQueued { opens_at: u64, closes_at: u64 },

    /// A queued configuration update took effect.
    ConfigUpdateApplied { pools_added: usize, triggers_added: usize },

    /// A queued configuration update was dropped.
    ConfigUpdateDiscarded,
}
