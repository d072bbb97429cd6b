//! Loss-scaling accumulator module.
//!
//! Slashes are recorded as a running product of inverse scaling factors
//! so queued redemptions can be rescaled at completion without touching
//! every request on each slash.

mod scaling;

pub use scaling::{
    inverse_scaling_factor, scaling_factor, ScalingAccumulator, INF_INV_SCALING_FACTOR,
    INV_SCALING_FACTOR_RESET_THRESHOLD,
};
