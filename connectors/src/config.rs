use common::{Error, Result};
use std::str::FromStr;
use std::time::Duration;

pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";
pub const BYBIT_API_URL: &str = "https://api.bybit.com";

/// Configuration for the CoinGecko markets feed
#[derive(Debug, Clone)]
pub struct CoinGeckoConfig {
    pub base_url: String,
    /// Number of `/coins/markets` pages walked per refresh
    pub pages: u32,
    pub per_page: u32,
    /// Pause between consecutive page requests
    pub page_delay: Duration,
    pub cache_ttl: Duration,
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            base_url: COINGECKO_API_URL.to_string(),
            pages: 4,
            per_page: 250,
            page_delay: Duration::from_millis(1500),
            cache_ttl: Duration::from_secs(300),
        }
    }
}

impl CoinGeckoConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            base_url: std::env::var("COINGECKO_API_URL").unwrap_or(defaults.base_url),
            pages: env_or("COINGECKO_PAGES", defaults.pages)?,
            per_page: env_or("COINGECKO_PER_PAGE", defaults.per_page)?,
            page_delay: env_or("COINGECKO_PAGE_DELAY_MS", 1500).map(Duration::from_millis)?,
            cache_ttl: env_or("COINGECKO_CACHE_SECS", 300).map(Duration::from_secs)?,
        })
    }
}

/// Configuration for the Bybit spot ticker feed
#[derive(Debug, Clone)]
pub struct BybitConfig {
    pub base_url: String,
    /// Only pairs quoted in this currency are kept
    pub quote: String,
    pub cache_ttl: Duration,
}

impl Default for BybitConfig {
    fn default() -> Self {
        Self {
            base_url: BYBIT_API_URL.to_string(),
            quote: "USDT".to_string(),
            cache_ttl: Duration::from_secs(60),
        }
    }
}

impl BybitConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            base_url: std::env::var("BYBIT_API_URL").unwrap_or(defaults.base_url),
            quote: std::env::var("BYBIT_QUOTE")
                .map(|q| q.to_uppercase())
                .unwrap_or(defaults.quote),
            cache_ttl: env_or("BYBIT_CACHE_SECS", 60).map(Duration::from_secs)?,
        })
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| Error::ConfigError(format!("{} must be a number, got '{}'", key, raw))),
        Err(_) => Ok(default),
    }
}
