//! Pure catalogue transforms: merging feed outputs and narrowing them per request.

mod filter;
mod merge;

pub use filter::{
    apply, filter_by_platform, filter_by_search, filter_by_tab, filter_by_turnover,
    filter_by_volume, filter_gainers, filter_losers, filter_new, turnover, NEW_COIN_WINDOW_HOURS,
    TOP_LIMIT,
};
pub use merge::merge;
