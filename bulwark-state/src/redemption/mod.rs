//! Redemption queue.

mod queue;

pub use queue::{
    complete_redemption, preview_queued, preview_redemption, queue_redemption, QueueOutcome,
};
