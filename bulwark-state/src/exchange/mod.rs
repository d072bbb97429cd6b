//! Share/asset exchange rate.

mod rate;

pub use rate::{assets_for_shares, shares_for_assets};
