//! Core protocol data types.
//!
//! - Identifiers for accounts, assets, triggers, pools and redemptions
//! - Pool balances and share-token references
//! - Redemption requests and their accumulator snapshots
//! - Trigger and payout-handler standing
//! - Module state and slash instructions

mod identifiers;
mod module;
mod pool;
mod redemption;
mod trigger;

pub use identifiers::{Address, AssetId, PoolId, RedemptionId, TriggerId, ZERO_ADDRESS};
pub use module::{ModuleState, SlashInstruction};
pub use pool::{AssetPool, Pool, ReceiptKind, ReceiptTokenId};
pub use redemption::{AccumulatorSnapshot, QueuedRedemptionPreview, RedemptionKind, RedemptionRequest};
pub use trigger::{HandlerStanding, TriggerData, TriggerPhase, TriggerStatus};
