use crate::models::{CoinRecord, Source};
use crate::Error;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Filter/sort mode applied to the catalogue
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    All,
    New,
    Gainers,
    Losers,
    Volume,
    Turnover,
}

impl FromStr for Tab {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Tab::All),
            "new" => Ok(Tab::New),
            "gainers" => Ok(Tab::Gainers),
            "losers" => Ok(Tab::Losers),
            "volume" => Ok(Tab::Volume),
            "turnover" => Ok(Tab::Turnover),
            unknown => Err(Error::InvalidInput(format!(
                "Unknown filter: {}. Supported filters: all, new, gainers, losers, volume, turnover",
                unknown
            ))),
        }
    }
}

/// Narrowing by provenance
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Platform {
    #[default]
    #[serde(rename = "all")]
    All,
    #[serde(rename = "coingecko")]
    CoinGecko,
    #[serde(rename = "bybit")]
    Bybit,
    #[serde(rename = "both")]
    Both,
}

impl Platform {
    /// Whether a record tagged `source` belongs to this platform.
    ///
    /// A single feed platform also keeps the coins both feeds report, `Both`
    /// keeps only those.
    pub fn admits(&self, source: Option<Source>) -> bool {
        match (self, source) {
            (Platform::All, _) => true,
            (Platform::CoinGecko, Some(Source::CoinGecko | Source::Both)) => true,
            (Platform::Bybit, Some(Source::Bybit | Source::Both)) => true,
            (Platform::Both, Some(Source::Both)) => true,
            _ => false,
        }
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Platform::All),
            "coingecko" => Ok(Platform::CoinGecko),
            "bybit" => Ok(Platform::Bybit),
            "both" => Ok(Platform::Both),
            unknown => Err(Error::InvalidInput(format!(
                "Unknown platform: {}. Supported platforms: all, coingecko, bybit, both",
                unknown
            ))),
        }
    }
}

/// One catalogue request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoinQuery {
    pub tab: Tab,
    pub platform: Platform,
    pub search: String,
}

/// Per-source counts over the merged catalogue
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceBreakdown {
    /// Coins carrying CoinGecko data (only + both)
    pub coingecko: usize,
    /// Coins carrying Bybit data (only + both)
    pub bybit: usize,
    pub coingecko_only: usize,
    pub bybit_only: usize,
    pub both: usize,
}

impl SourceBreakdown {
    pub fn count(coins: &[CoinRecord]) -> Self {
        let mut breakdown = Self::default();
        for coin in coins {
            match coin.source {
                Some(Source::CoinGecko) => breakdown.coingecko_only += 1,
                Some(Source::Bybit) => breakdown.bybit_only += 1,
                Some(Source::Both) => breakdown.both += 1,
                None => {}
            }
        }
        breakdown.coingecko = breakdown.coingecko_only + breakdown.both;
        breakdown.bybit = breakdown.bybit_only + breakdown.both;
        breakdown
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogueMeta {
    /// Size of the merged catalogue before any filtering
    pub total: usize,
    /// Size of the returned result
    pub filtered: usize,
    pub sources: SourceBreakdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinsResponse {
    pub coins: Vec<CoinRecord>,
    pub meta: CatalogueMeta,
}
