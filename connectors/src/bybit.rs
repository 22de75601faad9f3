use crate::{cache::FeedCache, config::BybitConfig, CoinFeed};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{
    models::{CoinRecord, Source},
    Error, Result,
};
use serde::Deserialize;
use tracing::{debug, error, info};

const IMAGE_CDN_URL: &str = "https://cdn.coinranking.com/coins";

pub struct BybitConnector {
    client: reqwest::Client,
    config: BybitConfig,
    cache: FeedCache<Vec<CoinRecord>>,
}

impl BybitConnector {
    pub fn new(config: BybitConfig) -> Self {
        let cache = FeedCache::new("Bybit", config.cache_ttl);
        Self {
            client: reqwest::Client::new(),
            config,
            cache,
        }
    }

    async fn fetch_tickers(&self) -> Result<Vec<CoinRecord>> {
        let url = format!("{}/v5/market/tickers", self.config.base_url);

        debug!("Fetching spot tickers from Bybit: {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[("category", "spot")])
            .send()
            .await
            .map_err(Error::HttpError)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Bybit API error: {} - {}", status, error_text);
            return Err(Error::FeedError(format!(
                "Bybit API error: {} - {}",
                status, error_text
            )));
        }

        let body: BybitResponse = response.json().await.map_err(|e| {
            Error::ParseError(format!("Failed to parse Bybit tickers: {}", e))
        })?;

        if body.ret_code != 0 {
            error!("Bybit rejected ticker request: {} - {}", body.ret_code, body.ret_msg);
            return Err(Error::FeedError(format!(
                "Bybit retCode {}: {}",
                body.ret_code, body.ret_msg
            )));
        }

        let list = body
            .result
            .map(|r| r.list)
            .ok_or_else(|| Error::ParseError("Bybit response has no ticker list".to_string()))?;

        let fetched_at = Utc::now();
        let coins: Vec<CoinRecord> = list
            .iter()
            .filter_map(|ticker| ticker.to_record(&self.config.quote, fetched_at))
            .collect();

        info!(
            "Bybit: {} {} pairs under the price ceiling out of {} tickers",
            coins.len(),
            self.config.quote,
            list.len()
        );
        Ok(coins)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BybitResponse {
    ret_code: i64,
    #[serde(default)]
    ret_msg: String,
    result: Option<BybitTickerList>,
}

#[derive(Debug, Deserialize)]
struct BybitTickerList {
    list: Vec<BybitTicker>,
}

/// Spot ticker; Bybit sends every number as a string
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BybitTicker {
    symbol: String,
    last_price: String,
    #[serde(default)]
    turnover_24h: Option<String>,
    #[serde(default)]
    price_24h_pcnt: Option<String>,
    #[serde(default)]
    high_price_24h: Option<String>,
    #[serde(default)]
    low_price_24h: Option<String>,
}

/// Finite decimals only; `NaN` and `inf` parse as floats but are treated as missing.
fn parse_decimal(raw: Option<&str>) -> Option<f64> {
    raw.filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

impl BybitTicker {
    /// Build a coin record for a `quote` pair priced under the ceiling.
    ///
    /// Values the ticker cannot provide stay as fixed placeholders: market cap
    /// and its change are 0, rank and supplies are unknown, ATH/ATL mirror the
    /// 24h high/low and their dates are the fetch time.
    fn to_record(&self, quote: &str, fetched_at: DateTime<Utc>) -> Option<CoinRecord> {
        let base = self.symbol.strip_suffix(quote)?;
        if base.is_empty() {
            return None;
        }

        let price = parse_decimal(Some(&self.last_price))?;
        let symbol = base.to_lowercase();
        let volume = parse_decimal(self.turnover_24h.as_deref()).unwrap_or_default();
        let change_pct = parse_decimal(self.price_24h_pcnt.as_deref()).unwrap_or_default() * 100.0;
        let high = parse_decimal(self.high_price_24h.as_deref()).unwrap_or(price);
        let low = parse_decimal(self.low_price_24h.as_deref()).unwrap_or(price);

        let record = CoinRecord {
            id: format!("bybit-{}", symbol),
            name: symbol.to_uppercase(),
            image: format!("{}/{}.png", IMAGE_CDN_URL, symbol),
            symbol,
            current_price: price,
            market_cap: 0.0,
            market_cap_rank: None,
            fully_diluted_valuation: None,
            total_volume: volume,
            high_24h: high,
            low_24h: low,
            price_change_24h: price * (change_pct / 100.0),
            price_change_percentage_24h: change_pct,
            market_cap_change_24h: 0.0,
            market_cap_change_percentage_24h: 0.0,
            circulating_supply: None,
            total_supply: None,
            max_supply: None,
            ath: high,
            ath_change_percentage: 0.0,
            ath_date: fetched_at,
            atl: low,
            atl_change_percentage: 0.0,
            atl_date: fetched_at,
            last_updated: fetched_at,
            sparkline_in_7d: None,
            source: Some(Source::Bybit),
        };

        record.is_low_price().then_some(record)
    }
}

#[async_trait]
impl CoinFeed for BybitConnector {
    fn source(&self) -> Source {
        Source::Bybit
    }

    async fn fetch_low_price_coins(&self) -> Vec<CoinRecord> {
        self.cache.get_or_refresh(|| self.fetch_tickers()).await
    }
}
