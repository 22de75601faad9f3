use crate::models::{CoinQuery, CoinRecord, Platform, Tab};
use chrono::{DateTime, Duration, Utc};
use std::cmp::Ordering;

/// Ranked tabs keep at most this many coins.
pub const TOP_LIMIT: usize = 50;

/// A coin counts as new when updated within this many hours.
pub const NEW_COIN_WINDOW_HOURS: i64 = 48;

/// Run a request through platform, then search, then tab.
///
/// Ranked tabs truncate whatever the earlier stages left, so the order matters.
pub fn apply(coins: &[CoinRecord], query: &CoinQuery, now: DateTime<Utc>) -> Vec<CoinRecord> {
    let narrowed = filter_by_platform(coins, query.platform);
    let narrowed = filter_by_search(&narrowed, &query.search);
    filter_by_tab(&narrowed, query.tab, now)
}

pub fn filter_by_platform(coins: &[CoinRecord], platform: Platform) -> Vec<CoinRecord> {
    coins
        .iter()
        .filter(|coin| platform.admits(coin.source))
        .cloned()
        .collect()
}

/// Case-insensitive substring match on symbol or name; blank queries match everything.
pub fn filter_by_search(coins: &[CoinRecord], search: &str) -> Vec<CoinRecord> {
    let needle = search.trim().to_lowercase();
    if needle.is_empty() {
        return coins.to_vec();
    }

    coins
        .iter()
        .filter(|coin| {
            coin.symbol.to_lowercase().contains(&needle)
                || coin.name.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

pub fn filter_by_tab(coins: &[CoinRecord], tab: Tab, now: DateTime<Utc>) -> Vec<CoinRecord> {
    match tab {
        Tab::All => coins.to_vec(),
        Tab::New => filter_new(coins, now),
        Tab::Gainers => filter_gainers(coins, TOP_LIMIT),
        Tab::Losers => filter_losers(coins, TOP_LIMIT),
        Tab::Volume => filter_by_volume(coins, TOP_LIMIT),
        Tab::Turnover => filter_by_turnover(coins, TOP_LIMIT),
    }
}

pub fn filter_new(coins: &[CoinRecord], now: DateTime<Utc>) -> Vec<CoinRecord> {
    let cutoff = now - Duration::hours(NEW_COIN_WINDOW_HOURS);
    coins
        .iter()
        .filter(|coin| coin.last_updated >= cutoff)
        .cloned()
        .collect()
}

pub fn filter_gainers(coins: &[CoinRecord], limit: usize) -> Vec<CoinRecord> {
    let mut gainers: Vec<CoinRecord> = coins
        .iter()
        .filter(|coin| coin.price_change_percentage_24h > 0.0)
        .cloned()
        .collect();
    gainers.sort_by(|a, b| descending(a.price_change_percentage_24h, b.price_change_percentage_24h));
    gainers.truncate(limit);
    gainers
}

pub fn filter_losers(coins: &[CoinRecord], limit: usize) -> Vec<CoinRecord> {
    let mut losers: Vec<CoinRecord> = coins
        .iter()
        .filter(|coin| coin.price_change_percentage_24h < 0.0)
        .cloned()
        .collect();
    losers.sort_by(|a, b| a.price_change_percentage_24h.total_cmp(&b.price_change_percentage_24h));
    losers.truncate(limit);
    losers
}

pub fn filter_by_volume(coins: &[CoinRecord], limit: usize) -> Vec<CoinRecord> {
    let mut ranked = coins.to_vec();
    ranked.sort_by(|a, b| descending(a.total_volume, b.total_volume));
    ranked.truncate(limit);
    ranked
}

/// Rank by traded value. Turnover is computed on the fly and never stored on the record.
pub fn filter_by_turnover(coins: &[CoinRecord], limit: usize) -> Vec<CoinRecord> {
    let mut ranked: Vec<(f64, &CoinRecord)> =
        coins.iter().map(|coin| (turnover(coin), coin)).collect();
    ranked.sort_by(|a, b| descending(a.0, b.0));
    ranked
        .into_iter()
        .take(limit)
        .map(|(_, coin)| coin.clone())
        .collect()
}

/// Volume times current price.
pub fn turnover(coin: &CoinRecord) -> f64 {
    coin.total_volume * coin.current_price
}

fn descending(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}
