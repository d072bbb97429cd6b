//! Pool types.
//!
//! A pool holds one underlying asset. Holders own it through two share
//! tokens: deposit shares (redeemed by withdrawal) and stake shares
//! (redeemed by unstaking). Both components absorb slashes pro rata.

use serde::{Deserialize, Serialize};

use super::identifiers::{AssetId, PoolId};
use crate::u256::U256;

/// Which of a pool's two share tokens an amount belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReceiptKind {
    /// Plain deposit shares.
    Deposit,
    /// Staked shares.
    Stake,
}

impl ReceiptKind {
    /// Both kinds, in storage order.
    pub const ALL: [ReceiptKind; 2] = [ReceiptKind::Deposit, ReceiptKind::Stake];

    /// Position of this kind in per-kind arrays.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            ReceiptKind::Deposit => 0,
            ReceiptKind::Stake => 1,
        }
    }
}

/// Reference to one of a pool's share tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReceiptTokenId {
    /// Owning pool.
    pub pool_id: PoolId,
    /// Deposit or stake shares.
    pub kind: ReceiptKind,
}

impl ReceiptTokenId {
    /// Create a token reference.
    pub const fn new(pool_id: PoolId, kind: ReceiptKind) -> Self {
        Self { pool_id, kind }
    }
}

/// Per-pool balances.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    /// Dense pool index.
    pub pool_id: PoolId,

    /// Underlying asset held by the pool.
    pub asset: AssetId,

    /// Assets backing deposit shares, including pending withdrawals.
    pub deposit_amount: U256,

    /// Assets backing stake shares, including pending unstakes.
    pub stake_amount: U256,

    /// Portion of `deposit_amount` earmarked for queued withdrawals.
    pub pending_withdrawals_amount: U256,

    /// Portion of `stake_amount` earmarked for queued unstakes.
    pub pending_unstakes_amount: U256,

    /// Largest fraction of the pool a single slash may remove (WAD).
    pub max_slash_percentage: U256,

    /// Deposit share token.
    pub deposit_token: ReceiptTokenId,

    /// Stake share token.
    pub stake_token: ReceiptTokenId,
}

impl Pool {
    /// Create an empty pool.
    pub fn new(pool_id: PoolId, asset: AssetId, max_slash_percentage: U256) -> Self {
        Self {
            pool_id,
            asset,
            deposit_amount: U256::zero(),
            stake_amount: U256::zero(),
            pending_withdrawals_amount: U256::zero(),
            pending_unstakes_amount: U256::zero(),
            max_slash_percentage,
            deposit_token: ReceiptTokenId::new(pool_id, ReceiptKind::Deposit),
            stake_token: ReceiptTokenId::new(pool_id, ReceiptKind::Stake),
        }
    }

    /// Share token for a kind.
    #[inline]
    pub fn token(&self, kind: ReceiptKind) -> ReceiptTokenId {
        match kind {
            ReceiptKind::Deposit => self.deposit_token,
            ReceiptKind::Stake => self.stake_token,
        }
    }

    /// Total assets of a component, pending redemptions included.
    #[inline]
    pub fn amount(&self, kind: ReceiptKind) -> U256 {
        match kind {
            ReceiptKind::Deposit => self.deposit_amount,
            ReceiptKind::Stake => self.stake_amount,
        }
    }

    /// Assets of a component already earmarked for queued redemptions.
    #[inline]
    pub fn pending_amount(&self, kind: ReceiptKind) -> U256 {
        match kind {
            ReceiptKind::Deposit => self.pending_withdrawals_amount,
            ReceiptKind::Stake => self.pending_unstakes_amount,
        }
    }

    /// Assets of a component still backing outstanding shares.
    ///
    /// This is the base for share pricing, so fresh deposits do not dilute
    /// redemptions that are already queued.
    #[inline]
    pub fn unpending_amount(&self, kind: ReceiptKind) -> U256 {
        self.amount(kind).saturating_sub(self.pending_amount(kind))
    }

    /// Assets across both components.
    #[inline]
    pub fn total_amount(&self) -> U256 {
        self.deposit_amount + self.stake_amount
    }

    /// Whether both pending amounts are covered by their component.
    #[inline]
    pub fn is_consistent(&self) -> bool {
        self.deposit_amount >= self.pending_withdrawals_amount
            && self.stake_amount >= self.pending_unstakes_amount
    }

    /// Mutable access to a component and its pending amount.
    pub fn component_mut(&mut self, kind: ReceiptKind) -> (&mut U256, &mut U256) {
        match kind {
            ReceiptKind::Deposit => (&mut self.deposit_amount, &mut self.pending_withdrawals_amount),
            ReceiptKind::Stake => (&mut self.stake_amount, &mut self.pending_unstakes_amount),
        }
    }
}

/// Module-wide total of one asset across all pools that hold it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetPool {
    /// Assets the module accounts for.
    pub amount: U256,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> Pool {
        Pool::new(3, [7u8; 20], U256::from(500_000_000_000_000_000u64))
    }

    #[test]
    fn test_new_pool_tokens() {
        let pool = pool();
        assert_eq!(pool.token(ReceiptKind::Deposit), ReceiptTokenId::new(3, ReceiptKind::Deposit));
        assert_eq!(pool.token(ReceiptKind::Stake), ReceiptTokenId::new(3, ReceiptKind::Stake));
        assert!(pool.total_amount().is_zero());
    }

    #[test]
    fn test_unpending_amount() {
        let mut pool = pool();
        pool.deposit_amount = U256::from(1000u64);
        pool.pending_withdrawals_amount = U256::from(100u64);
        assert_eq!(pool.unpending_amount(ReceiptKind::Deposit), U256::from(900u64));
        assert!(pool.unpending_amount(ReceiptKind::Stake).is_zero());
        assert!(pool.is_consistent());
    }

    #[test]
    fn test_component_mut() {
        let mut pool = pool();
        {
            let (amount, pending) = pool.component_mut(ReceiptKind::Stake);
            *amount = U256::from(40u64);
            *pending = U256::from(50u64);
        }
        assert_eq!(pool.stake_amount, U256::from(40u64));
        assert!(!pool.is_consistent());
    }
}
