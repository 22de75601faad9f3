use crate::{cache::FeedCache, config::CoinGeckoConfig, CoinFeed};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{
    models::{CoinRecord, Source, Sparkline},
    Error, Result,
};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

pub struct CoinGeckoConnector {
    client: reqwest::Client,
    config: CoinGeckoConfig,
    cache: FeedCache<Vec<CoinRecord>>,
}

impl CoinGeckoConnector {
    pub fn new(config: CoinGeckoConfig) -> Self {
        let cache = FeedCache::new("CoinGecko", config.cache_ttl);
        Self {
            client: reqwest::Client::new(),
            config,
            cache,
        }
    }

    /// Walk the market pages one at a time, pausing between requests.
    ///
    /// A failing page ends the walk and whatever was collected so far is used.
    /// Only a failure on the very first page is an error.
    async fn fetch_markets(&self) -> Result<Vec<CoinRecord>> {
        let per_page = self.config.per_page as usize;
        let mut markets = Vec::new();
        let mut pages_fetched = 0;

        for page in 1..=self.config.pages {
            if page > 1 {
                tokio::time::sleep(self.config.page_delay).await;
            }

            match self.fetch_page(page).await {
                Ok(batch) => {
                    pages_fetched += 1;
                    let exhausted = batch.len() < per_page;
                    debug!("CoinGecko page {} returned {} coins", page, batch.len());
                    markets.extend(batch);
                    if exhausted {
                        break;
                    }
                }
                Err(e) => {
                    warn!(
                        "CoinGecko page {} failed, keeping {} coins from earlier pages: {}",
                        page,
                        markets.len(),
                        e
                    );
                    break;
                }
            }
        }

        if pages_fetched == 0 {
            return Err(Error::FeedError(
                "CoinGecko returned no market pages".to_string(),
            ));
        }

        let fetched_at = Utc::now();
        let coins: Vec<CoinRecord> = markets
            .into_iter()
            .filter_map(|market| market.into_record(fetched_at))
            .filter(CoinRecord::is_low_price)
            .map(|mut coin| {
                coin.source = Some(Source::CoinGecko);
                coin
            })
            .collect();

        info!(
            "CoinGecko: {} coins under the price ceiling across {} pages",
            coins.len(),
            pages_fetched
        );
        Ok(coins)
    }

    async fn fetch_page(&self, page: u32) -> Result<Vec<CoinGeckoMarket>> {
        let url = format!("{}/coins/markets", self.config.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("vs_currency", "usd".to_string()),
                ("order", "market_cap_desc".to_string()),
                ("per_page", self.config.per_page.to_string()),
                ("page", page.to_string()),
                ("sparkline", "true".to_string()),
                ("price_change_percentage", "24h".to_string()),
            ])
            .send()
            .await
            .map_err(Error::HttpError)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("CoinGecko API error: {} - {}", status, error_text);
            return Err(Error::FeedError(format!(
                "CoinGecko API error: {} - {}",
                status, error_text
            )));
        }

        response.json().await.map_err(|e| {
            Error::ParseError(format!("Failed to parse CoinGecko markets: {}", e))
        })
    }
}

/// One entry of `/coins/markets`. CoinGecko leaves plenty of these null for thin markets.
#[derive(Debug, Deserialize)]
struct CoinGeckoMarket {
    id: String,
    symbol: String,
    name: String,
    image: Option<String>,
    current_price: Option<f64>,
    market_cap: Option<f64>,
    market_cap_rank: Option<u32>,
    fully_diluted_valuation: Option<f64>,
    total_volume: Option<f64>,
    high_24h: Option<f64>,
    low_24h: Option<f64>,
    price_change_24h: Option<f64>,
    price_change_percentage_24h: Option<f64>,
    market_cap_change_24h: Option<f64>,
    market_cap_change_percentage_24h: Option<f64>,
    circulating_supply: Option<f64>,
    total_supply: Option<f64>,
    max_supply: Option<f64>,
    ath: Option<f64>,
    ath_change_percentage: Option<f64>,
    ath_date: Option<DateTime<Utc>>,
    atl: Option<f64>,
    atl_change_percentage: Option<f64>,
    atl_date: Option<DateTime<Utc>>,
    last_updated: Option<DateTime<Utc>>,
    sparkline_in_7d: Option<Sparkline>,
}

impl CoinGeckoMarket {
    /// Coins without a price are dropped.
    fn into_record(self, fetched_at: DateTime<Utc>) -> Option<CoinRecord> {
        let price = self.current_price?;

        Some(CoinRecord {
            id: self.id,
            symbol: self.symbol,
            name: self.name,
            image: self.image.unwrap_or_default(),
            current_price: price,
            market_cap: self.market_cap.unwrap_or_default(),
            market_cap_rank: self.market_cap_rank,
            fully_diluted_valuation: self.fully_diluted_valuation,
            total_volume: self.total_volume.unwrap_or_default(),
            high_24h: self.high_24h.unwrap_or(price),
            low_24h: self.low_24h.unwrap_or(price),
            price_change_24h: self.price_change_24h.unwrap_or_default(),
            price_change_percentage_24h: self.price_change_percentage_24h.unwrap_or_default(),
            market_cap_change_24h: self.market_cap_change_24h.unwrap_or_default(),
            market_cap_change_percentage_24h: self
                .market_cap_change_percentage_24h
                .unwrap_or_default(),
            circulating_supply: self.circulating_supply,
            total_supply: self.total_supply,
            max_supply: self.max_supply,
            ath: self.ath.unwrap_or(price),
            ath_change_percentage: self.ath_change_percentage.unwrap_or_default(),
            ath_date: self.ath_date.unwrap_or(fetched_at),
            atl: self.atl.unwrap_or(price),
            atl_change_percentage: self.atl_change_percentage.unwrap_or_default(),
            atl_date: self.atl_date.unwrap_or(fetched_at),
            last_updated: self.last_updated.unwrap_or(fetched_at),
            sparkline_in_7d: self.sparkline_in_7d,
            source: None,
        })
    }
}

#[async_trait]
impl CoinFeed for CoinGeckoConnector {
    fn source(&self) -> Source {
        Source::CoinGecko
    }

    async fn fetch_low_price_coins(&self) -> Vec<CoinRecord> {
        self.cache.get_or_refresh(|| self.fetch_markets()).await
    }

    async fn fetch_coin(&self, id: &str) -> Result<Option<CoinRecord>> {
        let url = format!("{}/coins/markets", self.config.base_url);

        debug!("Fetching coin details from CoinGecko for {}", id);

        let response = self
            .client
            .get(&url)
            .query(&[("vs_currency", "usd"), ("ids", id), ("sparkline", "true")])
            .send()
            .await
            .map_err(Error::HttpError)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("CoinGecko API error: {} - {}", status, error_text);
            return Err(Error::FeedError(format!(
                "CoinGecko API error: {} - {}",
                status, error_text
            )));
        }

        let markets: Vec<CoinGeckoMarket> = response.json().await.map_err(|e| {
            Error::ParseError(format!("Failed to parse CoinGecko coin details: {}", e))
        })?;

        let fetched_at = Utc::now();
        Ok(markets
            .into_iter()
            .next()
            .and_then(|market| market.into_record(fetched_at))
            .map(|mut coin| {
                coin.source = Some(Source::CoinGecko);
                coin
            }))
    }
}
