//! In-memory collaborators.

use std::collections::HashMap;
use std::hash::Hash;

use bulwark_core::{Address, AssetId, ReceiptTokenId, TriggerId, TriggerStatus, U256};

use super::{AssetVault, ReceiptTokens, Transactional, TriggerOracle};
use crate::error::{StateError, StateResult};

const BPS_DENOMINATOR: u64 = 10_000;

/// Prior values of the entries written to one map while a transaction is open.
#[derive(Clone, Debug)]
struct Journal<K> {
    open: bool,
    prior: Vec<(K, Option<U256>)>,
}

impl<K> Default for Journal<K> {
    fn default() -> Self {
        Self {
            open: false,
            prior: Vec::new(),
        }
    }
}

impl<K: Copy + Eq + Hash> Journal<K> {
    fn begin(&mut self) {
        self.open = true;
        self.prior.clear();
    }

    fn commit(&mut self) {
        self.open = false;
        self.prior.clear();
    }

    fn write(&mut self, map: &mut HashMap<K, U256>, key: K, value: U256) {
        let prior = map.insert(key, value);
        if self.open {
            self.prior.push((key, prior));
        }
    }

    fn rollback(&mut self, map: &mut HashMap<K, U256>) {
        for (key, prior) in self.prior.drain(..).rev() {
            match prior {
                Some(value) => {
                    map.insert(key, value);
                }
                None => {
                    map.remove(&key);
                }
            }
        }
        self.open = false;
    }
}

/// Asset balances for any number of accounts, one of which is the module.
#[derive(Clone, Debug, Default)]
pub struct MemoryVault {
    /// Account that holds assets for the module.
    pub module: Address,

    /// Transfer fee charged on incoming pulls, in basis points.
    pub fee_bps: u64,

    balances: HashMap<(AssetId, Address), U256>,
    allowances: HashMap<(AssetId, Address, Address), U256>,
    balance_log: Journal<(AssetId, Address)>,
    allowance_log: Journal<(AssetId, Address, Address)>,
}

impl MemoryVault {
    /// Create a vault that custodies assets under `module`.
    pub fn new(module: Address) -> Self {
        Self {
            module,
            ..Self::default()
        }
    }

    /// Charge `fee_bps` on every pull, simulating a fee-on-transfer asset.
    pub fn with_transfer_fee(mut self, fee_bps: u64) -> Self {
        self.fee_bps = fee_bps.min(BPS_DENOMINATOR);
        self
    }

    /// Create assets out of thin air for `account`.
    pub fn mint(&mut self, asset: &AssetId, account: &Address, amount: U256) {
        let balance = self.account_balance(asset, account).saturating_add(amount);
        self.balance_log
            .write(&mut self.balances, (*asset, *account), balance);
    }

    /// Transfer assets directly into module custody, bypassing `pull`.
    pub fn donate(&mut self, asset: &AssetId, amount: U256) {
        let module = self.module;
        self.mint(asset, &module, amount);
    }

    /// Balance of any account.
    pub fn account_balance(&self, asset: &AssetId, account: &Address) -> U256 {
        self.balances
            .get(&(*asset, *account))
            .copied()
            .unwrap_or_default()
    }

    /// Let `spender` pull up to `amount` of `owner`'s `asset` into the module.
    pub fn approve(&mut self, asset: &AssetId, owner: &Address, spender: &Address, amount: U256) {
        self.allowance_log
            .write(&mut self.allowances, (*asset, *owner, *spender), amount);
    }

    /// Remaining pull allowance.
    pub fn allowance(&self, asset: &AssetId, owner: &Address, spender: &Address) -> U256 {
        self.allowances
            .get(&(*asset, *owner, *spender))
            .copied()
            .unwrap_or_default()
    }

    fn transfer(&mut self, asset: &AssetId, from: &Address, to: &Address, amount: U256) -> StateResult<U256> {
        let available = self.account_balance(asset, from);
        if available < amount {
            return Err(StateError::InsufficientBalance {
                available,
                requested: amount,
            });
        }
        self.balance_log
            .write(&mut self.balances, (*asset, *from), available - amount);

        let fee = bulwark_core::fixed_point::mul_div_down(
            amount,
            U256::from(self.fee_bps),
            U256::from(BPS_DENOMINATOR),
        )?;
        let received = amount - fee;
        self.mint(asset, to, received);
        Ok(received)
    }
}

impl Transactional for MemoryVault {
    fn begin(&mut self) {
        self.balance_log.begin();
        self.allowance_log.begin();
    }

    fn commit(&mut self) {
        self.balance_log.commit();
        self.allowance_log.commit();
    }

    fn rollback(&mut self) {
        self.balance_log.rollback(&mut self.balances);
        self.allowance_log.rollback(&mut self.allowances);
    }
}

impl AssetVault for MemoryVault {
    fn balance_of(&self, asset: &AssetId) -> U256 {
        self.account_balance(asset, &self.module)
    }

    fn pull(
        &mut self,
        asset: &AssetId,
        caller: &Address,
        from: &Address,
        amount: U256,
    ) -> StateResult<()> {
        if caller != from {
            let allowed = self.allowance(asset, from, caller);
            if allowed < amount {
                return Err(StateError::InsufficientAllowance {
                    allowed,
                    requested: amount,
                });
            }
            if allowed != U256::MAX {
                self.approve(asset, from, caller, allowed - amount);
            }
        }

        let module = self.module;
        self.transfer(asset, from, &module, amount)?;
        Ok(())
    }

    fn push(&mut self, asset: &AssetId, to: &Address, amount: U256) -> StateResult<()> {
        let module = self.module;
        let fee_bps = std::mem::take(&mut self.fee_bps);
        let result = self.transfer(asset, &module, to, amount);
        self.fee_bps = fee_bps;
        result.map(|_| ())
    }
}

/// Share balances, supplies and allowances for every receipt token.
#[derive(Clone, Debug, Default)]
pub struct MemoryReceiptTokens {
    balances: HashMap<(ReceiptTokenId, Address), U256>,
    supplies: HashMap<ReceiptTokenId, U256>,
    allowances: HashMap<(ReceiptTokenId, Address, Address), U256>,
    balance_log: Journal<(ReceiptTokenId, Address)>,
    supply_log: Journal<ReceiptTokenId>,
    allowance_log: Journal<(ReceiptTokenId, Address, Address)>,
}

impl MemoryReceiptTokens {
    /// Create an empty token ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Let `spender` burn up to `amount` of `owner`'s shares.
    pub fn approve(&mut self, token: &ReceiptTokenId, owner: &Address, spender: &Address, amount: U256) {
        self.allowance_log
            .write(&mut self.allowances, (*token, *owner, *spender), amount);
    }

    /// Remaining allowance.
    pub fn allowance(&self, token: &ReceiptTokenId, owner: &Address, spender: &Address) -> U256 {
        self.allowances
            .get(&(*token, *owner, *spender))
            .copied()
            .unwrap_or_default()
    }
}

impl Transactional for MemoryReceiptTokens {
    fn begin(&mut self) {
        self.balance_log.begin();
        self.supply_log.begin();
        self.allowance_log.begin();
    }

    fn commit(&mut self) {
        self.balance_log.commit();
        self.supply_log.commit();
        self.allowance_log.commit();
    }

    fn rollback(&mut self) {
        self.balance_log.rollback(&mut self.balances);
        self.supply_log.rollback(&mut self.supplies);
        self.allowance_log.rollback(&mut self.allowances);
    }
}

impl ReceiptTokens for MemoryReceiptTokens {
    fn total_supply(&self, token: &ReceiptTokenId) -> U256 {
        self.supplies.get(token).copied().unwrap_or_default()
    }

    fn balance_of(&self, token: &ReceiptTokenId, holder: &Address) -> U256 {
        self.balances
            .get(&(*token, *holder))
            .copied()
            .unwrap_or_default()
    }

    fn mint(&mut self, token: &ReceiptTokenId, to: &Address, amount: U256) -> StateResult<()> {
        let supply = self
            .total_supply(token)
            .checked_add(amount)
            .ok_or(bulwark_core::MathError::Overflow)?;
        self.supply_log.write(&mut self.supplies, *token, supply);

        let balance = self.balance_of(token, to) + amount;
        self.balance_log
            .write(&mut self.balances, (*token, *to), balance);
        Ok(())
    }

    fn burn(
        &mut self,
        token: &ReceiptTokenId,
        caller: &Address,
        owner: &Address,
        amount: U256,
    ) -> StateResult<()> {
        if caller != owner {
            let allowed = self.allowance(token, owner, caller);
            if allowed < amount {
                return Err(StateError::InsufficientAllowance {
                    allowed,
                    requested: amount,
                });
            }
            if allowed != U256::MAX {
                self.approve(token, owner, caller, allowed - amount);
            }
        }

        let available = self.balance_of(token, owner);
        if available < amount {
            return Err(StateError::InsufficientShares {
                available,
                requested: amount,
            });
        }
        self.balance_log
            .write(&mut self.balances, (*token, *owner), available - amount);

        let supply = self.total_supply(token).saturating_sub(amount);
        self.supply_log.write(&mut self.supplies, *token, supply);
        Ok(())
    }
}

/// Trigger oracle whose answers are set by hand.
#[derive(Clone, Debug, Default)]
pub struct StaticTriggerOracle {
    statuses: HashMap<TriggerId, TriggerStatus>,
}

impl StaticTriggerOracle {
    /// Create an oracle that reports every trigger as inactive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the status reported for a trigger.
    pub fn set_status(&mut self, trigger_id: TriggerId, status: TriggerStatus) {
        self.statuses.insert(trigger_id, status);
    }
}

impl TriggerOracle for StaticTriggerOracle {
    fn status(&self, trigger_id: &TriggerId) -> TriggerStatus {
        self.statuses
            .get(trigger_id)
            .copied()
            .unwrap_or(TriggerStatus::Inactive)
    }
}
