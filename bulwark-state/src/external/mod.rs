//! Collaborators the module calls out to.
//!
//! The module never holds balances itself. Asset custody, share tokens and
//! trigger conditions live behind these traits; [`memory`] provides
//! in-memory implementations.
//!
//! Vaults and token ledgers are [`Transactional`]: the module opens a
//! transaction before each operation and rolls it back if the operation
//! fails.

pub mod memory;

use bulwark_core::{Address, AssetId, ReceiptTokenId, TriggerId, TriggerStatus, U256};

use crate::error::StateResult;

/// Collaborator state that can be rolled back to the start of an operation.
pub trait Transactional {
    /// Start recording changes.
    fn begin(&mut self);

    /// Keep every change made since `begin`.
    fn commit(&mut self);

    /// Undo every change made since `begin`.
    fn rollback(&mut self);
}

/// Custody of the underlying assets.
pub trait AssetVault: Transactional {
    /// Amount of `asset` currently held for the module.
    fn balance_of(&self, asset: &AssetId) -> U256;

    /// Move `amount` of `asset` from `from` into module custody on behalf
    /// of `caller`.
    ///
    /// A caller other than `from` spends `from`'s allowance.
    fn pull(
        &mut self,
        asset: &AssetId,
        caller: &Address,
        from: &Address,
        amount: U256,
    ) -> StateResult<()>;

    /// Move `amount` of `asset` out of module custody to `to`.
    fn push(&mut self, asset: &AssetId, to: &Address, amount: U256) -> StateResult<()>;
}

/// Deposit and stake share tokens.
pub trait ReceiptTokens: Transactional {
    /// Shares in circulation.
    fn total_supply(&self, token: &ReceiptTokenId) -> U256;

    /// Shares held by `holder`.
    fn balance_of(&self, token: &ReceiptTokenId, holder: &Address) -> U256;

    /// Mint new shares to `to`.
    fn mint(&mut self, token: &ReceiptTokenId, to: &Address, amount: U256) -> StateResult<()>;

    /// Burn `amount` of `owner`'s shares on behalf of `caller`.
    ///
    /// A caller other than the owner spends the owner's allowance.
    fn burn(
        &mut self,
        token: &ReceiptTokenId,
        caller: &Address,
        owner: &Address,
        amount: U256,
    ) -> StateResult<()>;
}

/// Source of truth for trigger conditions.
pub trait TriggerOracle {
    /// Current status of a trigger's condition.
    fn status(&self, trigger_id: &TriggerId) -> TriggerStatus;
}
