pub(crate) mod coin;
mod portfolio;
mod query;

pub use coin::{CoinRecord, Sparkline, Source, MAX_PRICE};
pub use portfolio::{
    NewPurchase, NewWatchlistEntry, PortfolioSummary, Purchase, PurchaseValuation,
    WatchlistEntry,
};
pub use query::{CatalogueMeta, CoinQuery, CoinsResponse, Platform, SourceBreakdown, Tab};
