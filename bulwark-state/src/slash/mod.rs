//! Slash execution.

mod executor;

pub use executor::{execute_slash, PoolSlash, SlashGuard, SlashReport};
