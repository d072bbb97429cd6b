//! State container and storage traits.
//!
//! This module provides:
//! - [`StateReader`]: Read-only access to module state
//! - [`StateWriter`]: Mutable access to module state
//! - [`StateStore`]: Combined trait for full state access
//! - [`LedgerState`]: In-memory implementation
//! - [`JournaledState`]: Ledger view that can undo its writes

mod journal;
mod ledger_state;
mod store;

pub use journal::JournaledState;
pub use ledger_state::LedgerState;
pub use store::{StateReader, StateStore, StateWriter};
