pub mod bybit;
pub mod cache;
pub mod coingecko;
pub mod config;

use async_trait::async_trait;
use common::{
    models::{CoinRecord, Source},
    Result,
};

pub use cache::FeedCache;
pub use config::{BybitConfig, CoinGeckoConfig};

/// A market data feed producing low-price coin snapshots
#[async_trait]
pub trait CoinFeed: Send + Sync {
    /// Provenance tag stamped on every record this feed yields
    fn source(&self) -> Source;

    /// Coins priced in `(0, MAX_PRICE]`, tagged with `source()`.
    ///
    /// Never fails: upstream errors degrade to the last cached result, which
    /// may be empty.
    async fn fetch_low_price_coins(&self) -> Vec<CoinRecord>;

    /// Look up one coin by its feed id, regardless of price.
    async fn fetch_coin(&self, _id: &str) -> Result<Option<CoinRecord>> {
        Ok(None)
    }
}
