//! Trigger application and module lifecycle.

mod machine;

pub use machine::{
    apply_trigger, discharge_slash, next_state, pause, require_pending_slash, transition, unpause,
    Transition,
};
