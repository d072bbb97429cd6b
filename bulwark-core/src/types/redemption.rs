//! Delayed redemption types.
//!
//! A redemption burns shares up front and pays assets after a delay. The
//! amount paid is the queued amount scaled by every slash that landed on
//! the pool in between, which is recovered from the accumulator snapshot
//! stored on the request.

use serde::{Deserialize, Serialize};

use super::identifiers::{Address, PoolId, RedemptionId};
use super::pool::ReceiptKind;
use crate::u256::U256;

/// What a redemption gives up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RedemptionKind {
    /// Redeem deposit shares.
    Withdrawal,
    /// Redeem stake shares.
    Unstake,
}

impl RedemptionKind {
    /// The share kind this redemption burns.
    #[inline]
    pub const fn receipt_kind(self) -> ReceiptKind {
        match self {
            RedemptionKind::Withdrawal => ReceiptKind::Deposit,
            RedemptionKind::Unstake => ReceiptKind::Stake,
        }
    }
}

impl From<ReceiptKind> for RedemptionKind {
    fn from(kind: ReceiptKind) -> Self {
        match kind {
            ReceiptKind::Deposit => RedemptionKind::Withdrawal,
            ReceiptKind::Stake => RedemptionKind::Unstake,
        }
    }
}

/// Position in a pool's scaling accumulator at queue time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccumulatorSnapshot {
    /// Index of the active entry when the request was queued.
    pub index: usize,
    /// Value of that entry when the request was queued (WAD).
    pub value: U256,
}

/// A queued redemption.
///
/// Immutable once stored; removed when completed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionRequest {
    /// Request identifier.
    pub id: RedemptionId,

    /// Pool being redeemed from.
    pub pool_id: PoolId,

    /// Withdrawal or unstake.
    pub kind: RedemptionKind,

    /// Shares burned at queue time.
    pub share_amount: U256,

    /// Assets owed at queue time, before any later slash.
    pub asset_amount: U256,

    /// Account whose shares were burned.
    pub owner: Address,

    /// Account that receives the assets.
    pub receiver: Address,

    /// Timestamp the request was queued at.
    pub queued_at: u64,

    /// Delay that applied when the request was queued (seconds).
    pub delay: u64,

    /// Accumulator position at queue time.
    pub snapshot: AccumulatorSnapshot,
}

impl RedemptionRequest {
    /// Earliest timestamp at which the request may complete.
    #[inline]
    pub fn ready_at(&self) -> u64 {
        self.queued_at.saturating_add(self.delay)
    }

    /// Seconds left before the request may complete.
    #[inline]
    pub fn delay_remaining(&self, now: u64) -> u64 {
        self.ready_at().saturating_sub(now)
    }
}

/// Read-only view of a queued request with its current payout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedRedemptionPreview {
    /// Pool being redeemed from.
    pub pool_id: PoolId,
    /// Withdrawal or unstake.
    pub kind: RedemptionKind,
    /// Seconds until completion is allowed (0 when ready or paused).
    pub delay_remaining: u64,
    /// Shares burned at queue time.
    pub share_amount: U256,
    /// Assets the request would pay if completed now.
    pub asset_amount: U256,
    /// Account whose shares were burned.
    pub owner: Address,
    /// Account that receives the assets.
    pub receiver: Address,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(queued_at: u64, delay: u64) -> RedemptionRequest {
        RedemptionRequest {
            id: 1,
            pool_id: 0,
            kind: RedemptionKind::Withdrawal,
            share_amount: U256::from(10u64),
            asset_amount: U256::from(10u64),
            owner: [1u8; 20],
            receiver: [2u8; 20],
            queued_at,
            delay,
            snapshot: AccumulatorSnapshot {
                index: 0,
                value: U256::from(1_000_000_000_000_000_000u64),
            },
        }
    }

    #[test]
    fn test_delay_remaining() {
        let req = request(1_000, 600);
        assert_eq!(req.ready_at(), 1_600);
        assert_eq!(req.delay_remaining(1_000), 600);
        assert_eq!(req.delay_remaining(1_599), 1);
        assert_eq!(req.delay_remaining(5_000), 0);
    }

    #[test]
    fn test_ready_at_saturates() {
        let req = request(u64::MAX - 1, 600);
        assert_eq!(req.ready_at(), u64::MAX);
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(RedemptionKind::Withdrawal.receipt_kind(), ReceiptKind::Deposit);
        assert_eq!(RedemptionKind::Unstake.receipt_kind(), ReceiptKind::Stake);
        assert_eq!(RedemptionKind::from(ReceiptKind::Stake), RedemptionKind::Unstake);
    }
}
