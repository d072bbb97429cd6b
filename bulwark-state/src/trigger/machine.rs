//! Module lifecycle state machine.
//!
//! | from      | Trigger   | Pause  | Unpause                      | SlashesDischarged |
//! |-----------|-----------|--------|------------------------------|-------------------|
//! | Active    | Triggered | Paused | error                        | error             |
//! | Triggered | Triggered | Paused | error                        | Active            |
//! | Paused    | Paused    | error  | Triggered if slashes pending, else Active | Paused |

use bulwark_core::{Address, ModuleState, TriggerData, TriggerId, TriggerPhase, TriggerStatus};
use serde::{Deserialize, Serialize};

use crate::error::{StateError, StateResult};
use crate::external::TriggerOracle;
use crate::state::StateWriter;

/// Events that move the module between states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    /// A trigger was applied.
    Trigger,
    /// An authorized role paused the module.
    Pause,
    /// The owner unpaused the module.
    Unpause,
    /// The last outstanding slash was executed.
    SlashesDischarged,
}

/// Resulting state for a transition, given the outstanding slash count.
pub fn next_state(
    from: ModuleState,
    transition: Transition,
    num_pending_slashes: u64,
) -> StateResult<ModuleState> {
    use ModuleState::*;
    use Transition::*;

    let to = match (from, transition) {
        (Active, Trigger) | (Triggered, Trigger) => Triggered,
        (Paused, Trigger) => Paused,

        (Active, Pause) | (Triggered, Pause) => Paused,
        (Paused, Pause) => return Err(StateError::InvalidStateTransition { from, transition }),

        (Paused, Unpause) if num_pending_slashes > 0 => Triggered,
        (Paused, Unpause) => Active,
        (Active, Unpause) | (Triggered, Unpause) => {
            return Err(StateError::InvalidStateTransition { from, transition })
        }

        (Triggered, SlashesDischarged) => Active,
        // Not reachable through `execute_slash`, which only runs while
        // triggered. A paused module with no slashes left unpauses to Active.
        (Paused, SlashesDischarged) => Paused,
        (Active, SlashesDischarged) => {
            return Err(StateError::InvalidStateTransition { from, transition })
        }
    };

    Ok(to)
}

/// Apply a transition to the stored state, returning `(from, to)`.
pub fn transition<S: StateWriter>(
    state: &mut S,
    transition: Transition,
) -> StateResult<(ModuleState, ModuleState)> {
    let from = state.module_state();
    let to = next_state(from, transition, state.num_pending_slashes())?;
    state.set_module_state(to);
    Ok((from, to))
}

/// Apply a fired trigger: mark it used and owe its handler one slash.
///
/// Fails with `InvalidTrigger` unless the trigger is configured, still
/// armed, and its oracle reports it as fired.
pub fn apply_trigger<S, O>(
    state: &mut S,
    oracle: &O,
    trigger_id: &TriggerId,
) -> StateResult<(TriggerData, ModuleState, ModuleState)>
where
    S: StateWriter,
    O: TriggerOracle,
{
    let invalid = || StateError::InvalidTrigger {
        trigger_id: *trigger_id,
    };

    let data = state.get_trigger(trigger_id).cloned().ok_or_else(invalid)?;
    if data.has_fired() || oracle.status(trigger_id) != TriggerStatus::Fired {
        return Err(invalid());
    }

    let trigger = state.trigger_mut(trigger_id).ok_or_else(invalid)?;
    trigger.phase = TriggerPhase::Fired;
    let data = trigger.clone();

    let pending = state.num_pending_slashes().saturating_add(1);
    state.set_num_pending_slashes(pending);
    let standing = state.handler_standing(&data.payout_handler).incremented();
    state.set_handler_standing(data.payout_handler, standing);

    let (from, to) = transition(state, Transition::Trigger)?;
    Ok((data, from, to))
}

/// Pause the module. Owner or pauser only.
pub fn pause<S: StateWriter>(
    state: &mut S,
    caller: &Address,
    owner: &Address,
    pauser: &Address,
) -> StateResult<(ModuleState, ModuleState)> {
    if caller != owner && caller != pauser {
        return Err(StateError::Unauthorized { caller: *caller });
    }
    transition(state, Transition::Pause)
}

/// Unpause the module. Owner only.
pub fn unpause<S: StateWriter>(
    state: &mut S,
    caller: &Address,
    owner: &Address,
) -> StateResult<(ModuleState, ModuleState)> {
    if caller != owner {
        return Err(StateError::Unauthorized { caller: *caller });
    }
    transition(state, Transition::Unpause)
}

/// Require that `handler` owes at least one slash.
pub fn require_pending_slash<S: StateWriter>(state: &mut S, handler: &Address) -> StateResult<()> {
    if state.handler_standing(handler).pending() == 0 {
        return Err(StateError::Unauthorized { caller: *handler });
    }
    Ok(())
}

/// Record one executed slash for `handler`.
///
/// Returns the state change when this was the last outstanding slash.
pub fn discharge_slash<S: StateWriter>(
    state: &mut S,
    handler: &Address,
) -> StateResult<Option<(ModuleState, ModuleState)>> {
    let standing = state
        .handler_standing(handler)
        .discharged()
        .ok_or(StateError::Unauthorized { caller: *handler })?;
    state.set_handler_standing(*handler, standing);

    let pending = state.num_pending_slashes().saturating_sub(1);
    state.set_num_pending_slashes(pending);

    if pending == 0 {
        Ok(Some(transition(state, Transition::SlashesDischarged)?))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::memory::StaticTriggerOracle;
    use crate::state::{LedgerState, StateReader};
    use bulwark_core::HandlerStanding;

    const OWNER: Address = [1u8; 20];
    const PAUSER: Address = [2u8; 20];
    const HANDLER: Address = [3u8; 20];
    const STRANGER: Address = [4u8; 20];
    const TRIGGER_A: TriggerId = [10u8; 20];
    const TRIGGER_B: TriggerId = [11u8; 20];

    fn setup() -> (LedgerState, StaticTriggerOracle) {
        let mut state = LedgerState::new();
        state.insert_trigger(TRIGGER_A, TriggerData::armed(HANDLER));
        state.insert_trigger(TRIGGER_B, TriggerData::armed(HANDLER));
        let mut oracle = StaticTriggerOracle::new();
        oracle.set_status(TRIGGER_A, TriggerStatus::Fired);
        oracle.set_status(TRIGGER_B, TriggerStatus::Fired);
        (state, oracle)
    }

    #[test]
    fn test_transition_table() {
        use ModuleState::*;
        use Transition::*;

        assert_eq!(next_state(Active, Trigger, 1).unwrap(), Triggered);
        assert_eq!(next_state(Triggered, Trigger, 2).unwrap(), Triggered);
        assert_eq!(next_state(Paused, Trigger, 1).unwrap(), Paused);
        assert_eq!(next_state(Active, Pause, 0).unwrap(), Paused);
        assert_eq!(next_state(Triggered, Pause, 1).unwrap(), Paused);
        assert_eq!(next_state(Paused, Unpause, 1).unwrap(), Triggered);
        assert_eq!(next_state(Paused, Unpause, 0).unwrap(), Active);
        assert_eq!(next_state(Triggered, SlashesDischarged, 0).unwrap(), Active);
        assert_eq!(next_state(Paused, SlashesDischarged, 0).unwrap(), Paused);

        for (from, t) in [
            (Paused, Pause),
            (Active, Unpause),
            (Triggered, Unpause),
            (Active, SlashesDischarged),
        ] {
            assert_eq!(
                next_state(from, t, 0),
                Err(StateError::InvalidStateTransition { from, transition: t })
            );
        }
    }

    #[test]
    fn test_apply_trigger() {
        let (mut state, oracle) = setup();
        let (data, from, to) = apply_trigger(&mut state, &oracle, &TRIGGER_A).unwrap();

        assert!(data.has_fired());
        assert_eq!((from, to), (ModuleState::Active, ModuleState::Triggered));
        assert_eq!(state.num_pending_slashes, 1);
        assert_eq!(state.standing(&HANDLER), HandlerStanding::Owing(1));
    }

    #[test]
    fn test_trigger_is_one_shot() {
        let (mut state, oracle) = setup();
        apply_trigger(&mut state, &oracle, &TRIGGER_A).unwrap();
        let err = apply_trigger(&mut state, &oracle, &TRIGGER_A).unwrap_err();
        assert_eq!(err, StateError::InvalidTrigger { trigger_id: TRIGGER_A });
    }

    #[test]
    fn test_trigger_requires_oracle_fired() {
        let (mut state, mut oracle) = setup();
        oracle.set_status(TRIGGER_A, TriggerStatus::Frozen);
        assert!(apply_trigger(&mut state, &oracle, &TRIGGER_A).is_err());

        let unknown = [99u8; 20];
        oracle.set_status(unknown, TriggerStatus::Fired);
        assert!(apply_trigger(&mut state, &oracle, &unknown).is_err());
    }

    #[test]
    fn test_discharge_returns_to_active_after_last_slash() {
        let (mut state, oracle) = setup();
        apply_trigger(&mut state, &oracle, &TRIGGER_A).unwrap();
        apply_trigger(&mut state, &oracle, &TRIGGER_B).unwrap();
        assert_eq!(state.standing(&HANDLER), HandlerStanding::Owing(2));

        assert_eq!(discharge_slash(&mut state, &HANDLER).unwrap(), None);
        assert_eq!(state.module_state(), ModuleState::Triggered);

        let change = discharge_slash(&mut state, &HANDLER).unwrap();
        assert_eq!(change, Some((ModuleState::Triggered, ModuleState::Active)));
        assert_eq!(state.standing(&HANDLER), HandlerStanding::Idle);
        assert!(state.check_invariants().is_ok());
    }

    #[test]
    fn test_pause_roles() {
        let (mut state, _) = setup();
        let err = pause(&mut state, &STRANGER, &OWNER, &PAUSER).unwrap_err();
        assert_eq!(err, StateError::Unauthorized { caller: STRANGER });

        pause(&mut state, &PAUSER, &OWNER, &PAUSER).unwrap();
        assert_eq!(state.module_state(), ModuleState::Paused);

        assert!(unpause(&mut state, &PAUSER, &OWNER).is_err());
        unpause(&mut state, &OWNER, &OWNER).unwrap();
        assert_eq!(state.module_state(), ModuleState::Active);
    }

    #[test]
    fn test_unpause_with_pending_slash_goes_triggered() {
        let (mut state, oracle) = setup();
        pause(&mut state, &OWNER, &OWNER, &PAUSER).unwrap();
        let (_, from, to) = apply_trigger(&mut state, &oracle, &TRIGGER_A).unwrap();
        assert_eq!((from, to), (ModuleState::Paused, ModuleState::Paused));

        let (_, to) = unpause(&mut state, &OWNER, &OWNER).unwrap();
        assert_eq!(to, ModuleState::Triggered);
        assert!(state.check_invariants().is_ok());
    }

    #[test]
    fn test_require_pending_slash() {
        let (mut state, oracle) = setup();
        assert!(require_pending_slash(&mut state, &HANDLER).is_err());
        apply_trigger(&mut state, &oracle, &TRIGGER_A).unwrap();
        assert!(require_pending_slash(&mut state, &HANDLER).is_ok());
        assert!(require_pending_slash(&mut state, &STRANGER).is_err());
    }
}
