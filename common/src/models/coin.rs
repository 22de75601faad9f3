use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Price ceiling (USD) every catalogued coin sits under.
pub const MAX_PRICE: f64 = 0.01;

/// Market snapshot for one coin, shared by every feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoinRecord {
    /// Feed specific identifier (e.g., "shiba-inu", "bybit-pepe")
    pub id: String,
    /// Ticker symbol, compared case-insensitively
    pub symbol: String,
    pub name: String,
    pub image: String,
    pub current_price: f64,
    pub market_cap: f64,
    pub market_cap_rank: Option<u32>,
    pub fully_diluted_valuation: Option<f64>,
    /// 24h trading volume in USD
    pub total_volume: f64,
    pub high_24h: f64,
    pub low_24h: f64,
    pub price_change_24h: f64,
    pub price_change_percentage_24h: f64,
    pub market_cap_change_24h: f64,
    pub market_cap_change_percentage_24h: f64,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
    pub max_supply: Option<f64>,
    pub ath: f64,
    pub ath_change_percentage: f64,
    pub ath_date: DateTime<Utc>,
    pub atl: f64,
    pub atl_change_percentage: f64,
    pub atl_date: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sparkline_in_7d: Option<Sparkline>,
    /// Which feed(s) reported this coin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
}

impl CoinRecord {
    /// Identity key used when merging feeds.
    pub fn merge_key(&self) -> String {
        self.symbol.to_lowercase()
    }

    /// True when the price is positive and under the ceiling.
    pub fn is_low_price(&self) -> bool {
        self.current_price > 0.0 && self.current_price <= MAX_PRICE
    }
}

/// 7 day price series, oldest first
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Sparkline {
    pub price: Vec<f64>,
}

/// Provenance tag
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Source {
    #[serde(rename = "coingecko")]
    CoinGecko,
    #[serde(rename = "bybit")]
    Bybit,
    #[serde(rename = "both")]
    Both,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::CoinGecko => write!(f, "coingecko"),
            Source::Bybit => write!(f, "bybit"),
            Source::Both => write!(f, "both"),
        }
    }
}
