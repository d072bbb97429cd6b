//! Trigger and payout-handler types.
//!
//! A trigger is an external condition with a designated payout handler.
//! Each trigger can fire at most once per module; every firing entitles
//! its handler to exactly one slash.

use serde::{Deserialize, Serialize};

use super::identifiers::Address;

/// Status reported by a trigger's external condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerStatus {
    /// The condition has not occurred.
    Inactive,
    /// The condition occurred; the trigger may be applied.
    Fired,
    /// The condition is under review and cannot be applied yet.
    Frozen,
}

/// Whether a configured trigger has already been applied to this module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerPhase {
    /// Not yet applied.
    Armed,
    /// Applied; cannot be applied again.
    Fired,
}

/// A configured trigger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerData {
    /// Identity allowed to slash when this trigger fires.
    pub payout_handler: Address,

    /// One-shot phase.
    pub phase: TriggerPhase,
}

impl TriggerData {
    /// A freshly configured, unfired trigger.
    pub fn armed(payout_handler: Address) -> Self {
        Self {
            payout_handler,
            phase: TriggerPhase::Armed,
        }
    }

    /// Whether the trigger was already applied.
    #[inline]
    pub fn has_fired(&self) -> bool {
        matches!(self.phase, TriggerPhase::Fired)
    }
}

/// Outstanding slashes owed by one payout handler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandlerStanding {
    /// No slash pending.
    #[default]
    Idle,
    /// This many slashes pending (always > 0).
    Owing(u64),
}

impl HandlerStanding {
    /// Pending slash count.
    #[inline]
    pub fn pending(self) -> u64 {
        match self {
            HandlerStanding::Idle => 0,
            HandlerStanding::Owing(n) => n,
        }
    }

    /// Standing after one more trigger fires for this handler.
    #[inline]
    pub fn incremented(self) -> Self {
        HandlerStanding::Owing(self.pending().saturating_add(1))
    }

    /// Standing after one slash is executed, or `None` if nothing was owed.
    #[inline]
    pub fn discharged(self) -> Option<Self> {
        match self {
            HandlerStanding::Idle => None,
            HandlerStanding::Owing(1) => Some(HandlerStanding::Idle),
            HandlerStanding::Owing(n) => Some(HandlerStanding::Owing(n - 1)),
        }
    }
}
