//! Pool ledger operations.
//!
//! Handles crediting and debiting pool components, earmarking assets for
//! queued redemptions, and the deposit/stake flows.

mod deposit;
mod pool_ledger;

pub use deposit::{deposit_assets, preview_deposit};
pub use pool_ledger::{credit, debit, earmark, release, require_pool, verify_balance_delta};
