//! # Bulwark Core
//!
//! Core types and arithmetic for the Bulwark protection fund.
//!
//! This crate provides the foundation for the state crate:
//! - Protocol data types (Pool, RedemptionRequest, TriggerData, ModuleState)
//! - 256-bit arithmetic for share/asset conversions
//! - WAD fixed-point helpers with explicit rounding direction

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod types;
pub mod u256;

// Re-export commonly used types at crate root
pub use error::MathError;
pub use types::{
    AccumulatorSnapshot, Address, AssetId, AssetPool, HandlerStanding, ModuleState, Pool, PoolId,
    QueuedRedemptionPreview, ReceiptKind, ReceiptTokenId, RedemptionId, RedemptionKind,
    RedemptionRequest, SlashInstruction, TriggerData, TriggerId, TriggerPhase, TriggerStatus,
    ZERO_ADDRESS,
};
pub use u256::fixed_point::{self, MathResult, WAD};
pub use u256::U256;
