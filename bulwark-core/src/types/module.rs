//! Module-wide state and slash instructions.

use serde::{Deserialize, Serialize};

use super::identifiers::PoolId;
use crate::u256::U256;

/// Lifecycle state of a safety module.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleState {
    /// Normal operation.
    #[default]
    Active,
    /// At least one trigger fired and its slash is outstanding.
    Triggered,
    /// Halted by an authorized role. Redemptions complete immediately.
    Paused,
}

impl std::fmt::Display for ModuleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleState::Active => write!(f, "active"),
            ModuleState::Triggered => write!(f, "triggered"),
            ModuleState::Paused => write!(f, "paused"),
        }
    }
}

/// One entry of a slash batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashInstruction {
    /// Pool to slash.
    pub pool_id: PoolId,
    /// Assets to remove.
    pub amount: U256,
}

impl SlashInstruction {
    /// Create a slash instruction.
    pub fn new(pool_id: PoolId, amount: U256) -> Self {
        Self { pool_id, amount }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_active() {
        assert_eq!(ModuleState::default(), ModuleState::Active);
        assert_eq!(ModuleState::Triggered.to_string(), "triggered");
    }
}
