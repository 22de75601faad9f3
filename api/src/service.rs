use chrono::Utc;
use common::{
    models::{
        CatalogueMeta, CoinQuery, CoinRecord, CoinsResponse, Platform, PortfolioSummary, Purchase,
        PurchaseValuation, SourceBreakdown,
    },
    pipeline, Error, Result,
};
use connectors::CoinFeed;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Which feeds a request needs, decided before any call goes out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPlan {
    pub coingecko: bool,
    pub bybit: bool,
}

impl FetchPlan {
    /// Single-feed platforms skip the other feed; everything else asks both.
    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::CoinGecko => Self {
                coingecko: true,
                bybit: false,
            },
            Platform::Bybit => Self {
                coingecko: false,
                bybit: true,
            },
            Platform::All | Platform::Both => Self {
                coingecko: true,
                bybit: true,
            },
        }
    }
}

/// Service driving the feeds, the merge and the filter pipeline
pub struct CoinService {
    /// CoinGecko markets feed
    coingecko: Arc<dyn CoinFeed>,
    /// Bybit spot ticker feed
    bybit: Arc<dyn CoinFeed>,
}

impl CoinService {
    pub fn new(coingecko: Arc<dyn CoinFeed>, bybit: Arc<dyn CoinFeed>) -> Self {
        Self { coingecko, bybit }
    }

    /// Fetch the planned feeds concurrently and merge them.
    pub async fn catalogue(&self, plan: FetchPlan) -> Result<Vec<CoinRecord>> {
        let coingecko = spawn_fetch(self.coingecko.clone(), plan.coingecko);
        let bybit = spawn_fetch(self.bybit.clone(), plan.bybit);

        let (coingecko, bybit) = tokio::join!(coingecko, bybit);
        let coingecko = coingecko.map_err(|e| {
            error!("CoinGecko fetch task failed: {}", e);
            Error::InternalError("Failed to fetch coins".to_string())
        })?;
        let bybit = bybit.map_err(|e| {
            error!("Bybit fetch task failed: {}", e);
            Error::InternalError("Failed to fetch coins".to_string())
        })?;

        debug!(
            "Merging {} CoinGecko and {} Bybit coins",
            coingecko.len(),
            bybit.len()
        );
        Ok(pipeline::merge(coingecko, bybit))
    }

    /// Answer one catalogue request
    pub async fn query_coins(&self, query: &CoinQuery) -> Result<CoinsResponse> {
        let plan = FetchPlan::for_platform(query.platform);
        let merged = self.catalogue(plan).await?;

        let coins = pipeline::apply(&merged, query, Utc::now());
        let meta = CatalogueMeta {
            total: merged.len(),
            filtered: coins.len(),
            sources: SourceBreakdown::count(&merged),
        };

        info!(
            "Coins query {:?}/{:?} '{}': {} of {} coins",
            query.tab, query.platform, query.search, meta.filtered, meta.total
        );
        Ok(CoinsResponse { coins, meta })
    }

    /// Look a coin up in the merged catalogue, then ask CoinGecko directly.
    pub async fn get_coin(&self, id: &str) -> Result<CoinRecord> {
        let merged = self.catalogue(FetchPlan::for_platform(Platform::All)).await?;
        if let Some(coin) = merged.into_iter().find(|c| c.id == id) {
            return Ok(coin);
        }

        debug!("{} not in catalogue, asking CoinGecko", id);
        self.coingecko
            .fetch_coin(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Coin with ID '{}' not found", id)))
    }

    /// Mark purchases to the live catalogue. Coins no longer listed are valued at 0.
    pub async fn portfolio(&self, purchases: Vec<Purchase>) -> Result<PortfolioSummary> {
        let merged = self.catalogue(FetchPlan::for_platform(Platform::All)).await?;
        let prices: HashMap<&str, f64> = merged
            .iter()
            .map(|c| (c.id.as_str(), c.current_price))
            .collect();

        let valuations = purchases
            .into_iter()
            .map(|purchase| {
                let price = prices.get(purchase.coin_id.as_str()).copied().unwrap_or(0.0);
                PurchaseValuation::new(purchase, price)
            })
            .collect();

        Ok(PortfolioSummary::new(valuations))
    }
}

fn spawn_fetch(feed: Arc<dyn CoinFeed>, enabled: bool) -> JoinHandle<Vec<CoinRecord>> {
    tokio::spawn(async move {
        if enabled {
            feed.fetch_low_price_coins().await
        } else {
            debug!("Skipping {} feed for this platform", feed.source());
            Vec::new()
        }
    })
}
