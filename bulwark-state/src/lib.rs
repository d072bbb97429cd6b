// Allow manual assign operations on U256 amounts
#![allow(clippy::assign_op_pattern)]
// Allow functions with many parameters - ledger operations need every collaborator
#![allow(clippy::too_many_arguments)]

//! State machine for the Bulwark protection fund.
//!
//! This crate implements the pool ledger, the delayed redemption queue, the
//! loss-scaling accumulator and the trigger/slash lifecycle. It performs no
//! custody itself: assets, share tokens and trigger conditions are reached
//! through the collaborator traits in [`external`].
//!
//! # Key Components
//!
//! - [`SafetyModule`]: Facade running each operation atomically
//! - [`LedgerState`]: In-memory state container
//! - [`StateReader`]/[`StateWriter`]: Traits abstracting state access
//! - [`ScalingAccumulator`]: Retroactive slash scaling for queued redemptions
//! - [`StateError`]: Error type for validation failures
//!
//! # Example
//!
//! ```ignore
//! use bulwark_state::{ExecutionContext, SafetyModule};
//!
//! let mut module = SafetyModule::new(config, vault, tokens, oracle)?;
//! let ctx = ExecutionContext::new(alice, now);
//! let shares = module.deposit(&ctx, pool_id, amount, &alice, &alice)?;
//! let (id, assets) = module.queue_redemption(&ctx, pool_id, shares, &alice, &alice)?;
//! ```

pub mod accumulator;
pub mod config;
mod error;
pub mod exchange;
mod execute;
pub mod external;
pub mod ledger;
pub mod redemption;
pub mod slash;
mod state;
pub mod trigger;

pub use accumulator::{ScalingAccumulator, INF_INV_SCALING_FACTOR, INV_SCALING_FACTOR_RESET_THRESHOLD};
pub use config::{ConfigUpdate, Delays, ModuleConfig, PoolConfig, QueuedConfigUpdate, TriggerConfig};
pub use error::{StateError, StateResult};
pub use execute::{ExecutionContext, ModuleEvent, SafetyModule};
pub use external::memory::{MemoryReceiptTokens, MemoryVault, StaticTriggerOracle};
pub use external::{AssetVault, ReceiptTokens, Transactional, TriggerOracle};
pub use slash::SlashReport;
pub use state::{JournaledState, LedgerState, StateReader, StateStore, StateWriter};
pub use trigger::Transition;
