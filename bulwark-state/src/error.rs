//! Error types for safety module operations.
//!
//! Every failure aborts the whole operation; the module is left exactly as
//! it was before the call.

use bulwark_core::{Address, MathError, ModuleState, PoolId, RedemptionId, TriggerId, U256};
use thiserror::Error;

use crate::trigger::Transition;

/// All validation and execution errors for module operations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StateError {
    // === State Machine Errors ===
    /// Operation is not allowed in the current module state.
    #[error("operation not allowed while module is {state}")]
    InvalidState { state: ModuleState },

    /// Requested state transition is not in the transition table.
    #[error("invalid state transition {transition:?} from {from}")]
    InvalidStateTransition {
        from: ModuleState,
        transition: Transition,
    },

    /// Trigger is unknown, has not fired, or was already applied.
    #[error("invalid trigger: {}", short(.trigger_id))]
    InvalidTrigger { trigger_id: TriggerId },

    /// Caller lacks the role or pending slash required.
    #[error("unauthorized caller: {}", short(.caller))]
    Unauthorized { caller: Address },

    // === Pool Errors ===
    /// Pool id is not configured.
    #[error("pool not found: {pool_id}")]
    PoolNotFound { pool_id: PoolId },

    /// Deposit was not backed by a matching increase of held assets.
    #[error("invalid deposit: expected {expected} received {received}")]
    InvalidDeposit { expected: U256, received: U256 },

    /// Pool does not hold enough assets for the operation.
    #[error("insufficient pool assets in pool {pool_id}: available {available}, requested {requested}")]
    InsufficientPoolAssets {
        pool_id: PoolId,
        available: U256,
        requested: U256,
    },

    /// A share/asset conversion produced nothing.
    #[error("conversion rounds to zero")]
    RoundsToZero,

    // === Redemption Errors ===
    /// Redemption id is unknown or already completed.
    #[error("redemption request not found: {id}")]
    RequestNotFound { id: RedemptionId },

    /// Redemption delay has not elapsed.
    #[error("redemption {id} delay not elapsed (ready at {ready_at}, now {now})")]
    DelayNotElapsed {
        id: RedemptionId,
        ready_at: u64,
        now: u64,
    },

    // === Slash Errors ===
    /// Slash would remove more than the pool's configured maximum.
    #[error("slash of pool {pool_id} is {percentage} (WAD), above maximum {max}")]
    ExceedsMaxSlashPercentage {
        pool_id: PoolId,
        percentage: U256,
        max: U256,
    },

    /// A pool appears more than once in one slash batch.
    #[error("pool {pool_id} appears twice in slash batch")]
    DuplicatePoolInSlashBatch { pool_id: PoolId },

    // === Token and Vault Errors ===
    /// Owner holds fewer shares than requested.
    #[error("insufficient shares: available {available}, requested {requested}")]
    InsufficientShares { available: U256, requested: U256 },

    /// Caller's share allowance from the owner is too small.
    #[error("insufficient allowance: allowed {allowed}, requested {requested}")]
    InsufficientAllowance { allowed: U256, requested: U256 },

    /// Account holds fewer assets than a transfer requires.
    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance { available: U256, requested: U256 },

    // === Configuration Errors ===
    /// Configuration or configuration update is malformed.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    /// No configuration update is queued.
    #[error("no configuration update queued")]
    NoQueuedConfigUpdate,

    /// Queued configuration update is outside its finalization window.
    #[error("configuration update not finalizable (window {opens_at}..={closes_at}, now {now})")]
    ConfigUpdateNotReady {
        opens_at: u64,
        closes_at: u64,
        now: u64,
    },

    // === General Errors ===
    /// Fixed-point arithmetic failed.
    #[error("arithmetic error: {0}")]
    Math(#[from] MathError),
}

/// Result type for module operations.
pub type StateResult<T> = Result<T, StateError>;

fn short(id: &[u8; 20]) -> String {
    format!("{:?}", &id[..4])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StateError::RequestNotFound { id: 7 };
        assert!(err.to_string().contains("redemption request not found: 7"));

        let err = StateError::Unauthorized { caller: [1u8; 20] };
        assert!(err.to_string().contains("[1, 1, 1, 1]"));

        let err = StateError::InvalidState {
            state: ModuleState::Triggered,
        };
        assert!(err.to_string().contains("triggered"));
    }

    #[test]
    fn test_math_error_conversion() {
        let err: StateError = MathError::Overflow.into();
        assert_eq!(err, StateError::Math(MathError::Overflow));
    }

    #[test]
    fn test_error_clone() {
        let err = StateError::RoundsToZero;
        assert_eq!(err.clone(), err);
    }
}
