//! Accumulated inverse scaling factors.
//!
//! Applies slash losses to every queued redemption of a pool in O(1) per
//! slash.
//!
//! A slash of `s` from a component holding `a` assets scales every claim on
//! that component by `f = 1 - s/a`. Instead of rewriting each queued
//! redemption we keep the running product of `1/f` (the accumulated inverse
//! scaling factor). A redemption remembers the product when it was queued;
//! at completion the ratio `current / queued` is the inverse of everything
//! that was lost in between, and the payout is `queued_amount / ratio`.
//!
//! The product only grows. Once it passes [`INV_SCALING_FACTOR_RESET_THRESHOLD`]
//! a new era starts at `1.0` so later multiplications stay inside 256 bits.
//! Completion replays the eras appended since the snapshot and stops as soon
//! as the running inverse reaches [`INF_INV_SCALING_FACTOR`], where the payout
//! is zero no matter what follows.
//!
//! # Bounds
//!
//! - A per-slash inverse is at most `INF` (`1e36`).
//! - The active entry is at most the threshold (`1e38`) before it is
//!   multiplied, so a product is below `1e74`.
//! - A closed era's last entry is below `1e56`; dividing it by a snapshot
//!   forms `entry * WAD < 1e74`.
//! - Replay multiplies a running inverse below `INF` by an entry below `INF`.
//!
//! All of these are far below `2^256 ≈ 1.16e77`.

use bulwark_core::fixed_point::{div_wad_down, div_wad_up, mul_wad_up};
use bulwark_core::{AccumulatorSnapshot, U256, WAD};
use serde::{Deserialize, Serialize};

use crate::error::StateResult;

/// Inverse scaling factor treated as total loss: `1e36` (a remaining fraction of `1e-18`).
pub const INF_INV_SCALING_FACTOR: U256 = U256([12_919_594_847_110_692_864, 54_210_108_624_275_221, 0, 0]);

/// Accumulator value above which a new era is started: `1e38`.
pub const INV_SCALING_FACTOR_RESET_THRESHOLD: U256 =
    U256([687_399_551_400_673_280, 5_421_010_862_427_522_170, 0, 0]);

/// Append-only sequence of accumulated inverse scaling factors for one pool
/// component. The last entry is the active era.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalingAccumulator {
    entries: Vec<U256>,
}

impl ScalingAccumulator {
    /// A fresh accumulator with one era at `1.0`.
    pub fn new() -> Self {
        Self { entries: vec![WAD] }
    }

    /// All entries, oldest era first.
    pub fn entries(&self) -> &[U256] {
        &self.entries
    }

    /// Number of eras recorded so far.
    pub fn era_count(&self) -> usize {
        self.entries.len()
    }

    /// Value of the active era.
    pub fn current(&self) -> U256 {
        self.entries.last().copied().unwrap_or(WAD)
    }

    /// Position to store on a redemption queued now.
    pub fn snapshot(&self) -> AccumulatorSnapshot {
        AccumulatorSnapshot {
            index: self.entries.len().saturating_sub(1),
            value: self.current(),
        }
    }

    /// Fold a slash of `slash_amount` out of `amount_before` into the active era.
    ///
    /// Returns the scaling factor applied (WAD), which callers also use to
    /// shrink the component's pending-redemption total.
    pub fn record_slash(&mut self, slash_amount: U256, amount_before: U256) -> StateResult<U256> {
        let factor = scaling_factor(slash_amount, amount_before)?;
        if factor == WAD {
            return Ok(factor);
        }

        let updated = mul_wad_up(self.current(), inverse_scaling_factor(factor)?)?;
        match self.entries.last_mut() {
            Some(last) => *last = updated,
            None => self.entries.push(updated),
        }

        if updated > INV_SCALING_FACTOR_RESET_THRESHOLD {
            self.entries.push(WAD);
        }

        Ok(factor)
    }

    /// Accumulated inverse scaling factor since `snapshot`, capped at
    /// [`INF_INV_SCALING_FACTOR`].
    pub fn inverse_scaling_since(&self, snapshot: &AccumulatorSnapshot) -> StateResult<U256> {
        let mut eras = self.entries.iter().skip(snapshot.index);

        let mut acc_isf = match eras.next() {
            Some(entry) => div_wad_up(*entry, snapshot.value)?,
            None => WAD,
        };

        for entry in eras {
            if acc_isf >= INF_INV_SCALING_FACTOR || *entry >= INF_INV_SCALING_FACTOR {
                return Ok(INF_INV_SCALING_FACTOR);
            }
            acc_isf = mul_wad_up(acc_isf, *entry)?;
        }

        Ok(acc_isf.min(INF_INV_SCALING_FACTOR))
    }

    /// Scale an amount queued at `snapshot` by every slash since.
    ///
    /// Rounds down; never exceeds `queued_amount`.
    pub fn scale_queued_amount(
        &self,
        queued_amount: U256,
        snapshot: &AccumulatorSnapshot,
    ) -> StateResult<U256> {
        let acc_isf = self.inverse_scaling_since(snapshot)?;
        if acc_isf >= INF_INV_SCALING_FACTOR {
            return Ok(U256::zero());
        }
        let scaled = div_wad_down(queued_amount, acc_isf)?;
        Ok(scaled.min(queued_amount))
    }
}

impl Default for ScalingAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Remaining fraction after slashing `slash_amount` out of `amount_before` (WAD).
///
/// The slashed fraction is rounded up, so the remaining fraction errs low.
pub fn scaling_factor(slash_amount: U256, amount_before: U256) -> StateResult<U256> {
    if slash_amount.is_zero() {
        return Ok(WAD);
    }
    if amount_before.is_zero() {
        return Ok(U256::zero());
    }
    let slashed = div_wad_up(slash_amount, amount_before)?.min(WAD);
    Ok(WAD - slashed)
}

/// `1 / factor` rounded up, or [`INF_INV_SCALING_FACTOR`] for a total loss.
pub fn inverse_scaling_factor(factor: U256) -> StateResult<U256> {
    if factor.is_zero() {
        return Ok(INF_INV_SCALING_FACTOR);
    }
    Ok(div_wad_up(WAD, factor)?.min(INF_INV_SCALING_FACTOR))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amt(n: u64) -> U256 {
        U256::from(n)
    }

    #[test]
    fn test_constants() {
        assert_eq!(INF_INV_SCALING_FACTOR, U256::exp10(36));
        assert_eq!(INV_SCALING_FACTOR_RESET_THRESHOLD, U256::exp10(38));
    }

    #[test]
    fn test_new_accumulator_is_one() {
        let acc = ScalingAccumulator::new();
        assert_eq!(acc.entries(), &[WAD]);
        assert_eq!(acc.snapshot(), AccumulatorSnapshot { index: 0, value: WAD });
    }

    #[test]
    fn test_no_slash_keeps_amount() {
        let acc = ScalingAccumulator::new();
        let snapshot = acc.snapshot();
        assert_eq!(acc.scale_queued_amount(amt(100), &snapshot).unwrap(), amt(100));
    }

    #[test]
    fn test_half_slash_halves_payout() {
        let mut acc = ScalingAccumulator::new();
        let snapshot = acc.snapshot();

        let factor = acc.record_slash(amt(500), amt(1000)).unwrap();
        assert_eq!(factor, WAD / 2);
        assert_eq!(acc.current(), WAD * 2);

        assert_eq!(acc.scale_queued_amount(amt(100), &snapshot).unwrap(), amt(50));
    }

    #[test]
    fn test_two_half_slashes_quarter_payout() {
        let mut acc = ScalingAccumulator::new();
        let snapshot = acc.snapshot();

        acc.record_slash(amt(500), amt(1000)).unwrap();
        acc.record_slash(amt(250), amt(500)).unwrap();

        assert_eq!(acc.current(), WAD * 4);
        assert_eq!(acc.scale_queued_amount(amt(100), &snapshot).unwrap(), amt(25));
    }

    #[test]
    fn test_slash_before_queue_does_not_apply() {
        let mut acc = ScalingAccumulator::new();
        acc.record_slash(amt(500), amt(1000)).unwrap();

        let snapshot = acc.snapshot();
        assert_eq!(acc.scale_queued_amount(amt(100), &snapshot).unwrap(), amt(100));

        acc.record_slash(amt(200), amt(400)).unwrap();
        assert_eq!(acc.scale_queued_amount(amt(100), &snapshot).unwrap(), amt(50));
    }

    #[test]
    fn test_zero_slash_is_noop() {
        let mut acc = ScalingAccumulator::new();
        let factor = acc.record_slash(U256::zero(), amt(1000)).unwrap();
        assert_eq!(factor, WAD);
        assert_eq!(acc.entries(), &[WAD]);
    }

    #[test]
    fn test_total_loss_zeroes_earlier_requests() {
        let mut acc = ScalingAccumulator::new();
        let before = acc.snapshot();

        let factor = acc.record_slash(amt(1000), amt(1000)).unwrap();
        assert!(factor.is_zero());
        assert_eq!(acc.era_count(), 1);
        assert_eq!(acc.current(), INF_INV_SCALING_FACTOR);

        // Queued before the wipe-out: nothing left.
        assert!(acc.scale_queued_amount(amt(100), &before).unwrap().is_zero());

        // Queued after: ratio starts at one again.
        let after = acc.snapshot();
        assert_eq!(after.value, INF_INV_SCALING_FACTOR);
        assert_eq!(acc.scale_queued_amount(amt(100), &after).unwrap(), amt(100));
    }

    #[test]
    fn test_era_rollover_by_repeated_heavy_slashes() {
        let mut acc = ScalingAccumulator::new();
        let first = acc.snapshot();

        // Each 99% slash multiplies the raw entry by 100.
        for _ in 0..10 {
            acc.record_slash(amt(99), amt(100)).unwrap();
        }
        // 1e18 * 100^10 = 1e38, not above the threshold.
        assert_eq!(acc.era_count(), 1);
        assert_eq!(acc.current(), INV_SCALING_FACTOR_RESET_THRESHOLD);

        for _ in 0..10 {
            acc.record_slash(amt(99), amt(100)).unwrap();
        }
        // The 11th slash reached 1e40 and opened a new era; nine more since.
        assert_eq!(acc.era_count(), 2);
        assert_eq!(acc.entries()[0], U256::exp10(40));
        assert_eq!(acc.current(), U256::exp10(36));

        assert!(acc.scale_queued_amount(amt(1_000_000), &first).unwrap().is_zero());
        assert_eq!(acc.inverse_scaling_since(&first).unwrap(), INF_INV_SCALING_FACTOR);
    }

    #[test]
    fn test_replay_across_era_boundary() {
        let mut acc = ScalingAccumulator::new();

        // Raw entry 1e18 * 100^9 = 1e36.
        for _ in 0..9 {
            acc.record_slash(amt(99), amt(100)).unwrap();
        }
        let queued = acc.snapshot();
        assert_eq!(queued.value, U256::exp10(36));

        // 1e38 stays, 1e40 rolls over.
        acc.record_slash(amt(99), amt(100)).unwrap();
        acc.record_slash(amt(99), amt(100)).unwrap();
        assert_eq!(acc.era_count(), 2);

        // Two 100x losses since the snapshot: inverse 1e4.
        let inverse = acc.inverse_scaling_since(&queued).unwrap();
        assert_eq!(inverse, WAD * U256::from(10_000u64));

        // Then a 50% loss in the new era: inverse 2e4.
        acc.record_slash(amt(50), amt(100)).unwrap();
        let inverse = acc.inverse_scaling_since(&queued).unwrap();
        assert_eq!(inverse, WAD * U256::from(20_000u64));
        assert_eq!(
            acc.scale_queued_amount(amt(1_000_000), &queued).unwrap(),
            amt(50)
        );
    }

    #[test]
    fn test_entries_never_below_one() {
        let mut acc = ScalingAccumulator::new();
        for (slash, before) in [(1u64, 3u64), (7, 11), (0, 5), (5, 5), (2, 9)] {
            acc.record_slash(amt(slash), amt(before)).unwrap();
            assert!(acc.entries().iter().all(|e| *e >= WAD));
        }
    }

    #[test]
    fn test_current_never_decreases_within_era() {
        let mut acc = ScalingAccumulator::new();
        let mut previous = acc.current();
        for step in 0u64..40 {
            let slash = step % 7 * 5;
            acc.record_slash(amt(slash), amt(1000)).unwrap();
            assert_eq!(acc.era_count(), 1);
            if slash == 0 {
                assert_eq!(acc.current(), previous);
            } else {
                assert!(acc.current() > previous, "step {step} lowered the accumulator");
            }
            previous = acc.current();
        }
    }

    #[test]
    fn test_rounding_favors_remaining_holders() {
        // 1/3 slashed: remaining 2/3 rounded down, inverse rounded up.
        let mut acc = ScalingAccumulator::new();
        let snapshot = acc.snapshot();
        acc.record_slash(amt(1), amt(3)).unwrap();
        let paid = acc.scale_queued_amount(amt(300), &snapshot).unwrap();
        assert!(paid <= amt(200));
        assert!(paid >= amt(199));
    }

    #[test]
    fn test_scaling_factor_edges() {
        assert_eq!(scaling_factor(U256::zero(), U256::zero()).unwrap(), WAD);
        assert!(scaling_factor(amt(1), U256::zero()).unwrap().is_zero());
        assert!(scaling_factor(amt(2000), amt(1000)).unwrap().is_zero());
        assert_eq!(inverse_scaling_factor(U256::zero()).unwrap(), INF_INV_SCALING_FACTOR);
        assert_eq!(inverse_scaling_factor(WAD).unwrap(), WAD);
    }
}
