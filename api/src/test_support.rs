use async_trait::async_trait;
use chrono::Utc;
use common::models::{CoinRecord, Source};
use common::Result;
use connectors::CoinFeed;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn coin(id: &str, symbol: &str, price: f64) -> CoinRecord {
    let now = Utc::now();
    CoinRecord {
        id: id.to_string(),
        symbol: symbol.to_string(),
        name: symbol.to_uppercase(),
        image: String::new(),
        current_price: price,
        market_cap: 0.0,
        market_cap_rank: None,
        fully_diluted_valuation: None,
        total_volume: 0.0,
        high_24h: price,
        low_24h: price,
        price_change_24h: 0.0,
        price_change_percentage_24h: 0.0,
        market_cap_change_24h: 0.0,
        market_cap_change_percentage_24h: 0.0,
        circulating_supply: None,
        total_supply: None,
        max_supply: None,
        ath: price,
        ath_change_percentage: 0.0,
        ath_date: now,
        atl: price,
        atl_change_percentage: 0.0,
        atl_date: now,
        last_updated: now,
        sparkline_in_7d: None,
        source: None,
    }
}

pub fn with_change(mut coin: CoinRecord, change: f64) -> CoinRecord {
    coin.price_change_percentage_24h = change;
    coin
}

/// Feed returning fixed coins and counting calls
pub struct StubFeed {
    source: Source,
    coins: Vec<CoinRecord>,
    details: Vec<CoinRecord>,
    calls: AtomicUsize,
}

impl StubFeed {
    pub fn new(source: Source, coins: Vec<CoinRecord>) -> Self {
        let coins = coins
            .into_iter()
            .map(|mut c| {
                c.source = Some(source);
                c
            })
            .collect();
        Self {
            source,
            coins,
            details: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_details(mut self, details: Vec<CoinRecord>) -> Self {
        self.details = details;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CoinFeed for StubFeed {
    fn source(&self) -> Source {
        self.source
    }

    async fn fetch_low_price_coins(&self) -> Vec<CoinRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.coins.clone()
    }

    async fn fetch_coin(&self, id: &str) -> Result<Option<CoinRecord>> {
        Ok(self.details.iter().find(|c| c.id == id).cloned())
    }
}

/// Feed whose fetch blows up
pub struct PanickingFeed;

#[async_trait]
impl CoinFeed for PanickingFeed {
    fn source(&self) -> Source {
        Source::Bybit
    }

    async fn fetch_low_price_coins(&self) -> Vec<CoinRecord> {
        panic!("feed exploded")
    }
}
