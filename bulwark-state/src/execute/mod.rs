//! Operation execution.
//!
//! This module contains the [`SafetyModule`] facade, the context passed to
//! each operation and the events operations record.

mod context;
mod events;
mod module;

pub use context::ExecutionContext;
pub use events::ModuleEvent;
pub use module::SafetyModule;
