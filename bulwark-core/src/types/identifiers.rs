//! Identifier types shared across the protocol.
//!
//! Accounts, assets and triggers are addressed by 20-byte identifiers.
//! Pools are dense indices assigned in configuration order, which lets
//! per-pool arrays (accumulators, slash guards) be indexed directly.

/// 20-byte account address (depositors, receivers, payout handlers, roles).
pub type Address = [u8; 20];

/// 20-byte identifier of an underlying asset.
pub type AssetId = [u8; 20];

/// 20-byte identifier of a trigger.
pub type TriggerId = [u8; 20];

/// Dense pool index.
pub type PoolId = u16;

/// Redemption request identifier. Strictly increasing per module.
pub type RedemptionId = u64;

/// The all-zero address.
pub const ZERO_ADDRESS: Address = [0u8; 20];
