use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use common::models::{Source, MAX_PRICE};
use connectors::{
    bybit::BybitConnector, coingecko::CoinGeckoConnector, BybitConfig, CoinFeed, CoinGeckoConfig,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const PER_PAGE: u32 = 2;

/// Stand-in for both upstream APIs
#[derive(Default)]
struct Upstream {
    hits: AtomicUsize,
    /// Pages from this number on answer 429 (0 = never)
    fail_from_page: AtomicU32,
    /// This page comes back short, ending the catalogue (0 = never)
    short_page: AtomicU32,
    failing: AtomicBool,
    ret_code: AtomicI64,
}

impl Upstream {
    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn spawn(upstream: Arc<Upstream>) -> String {
    let app = Router::new()
        .route("/coins/markets", get(markets))
        .route("/v5/market/tickers", get(tickers))
        .with_state(upstream);

    let server =
        axum::Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0))).serve(app.into_make_service());
    let addr = server.local_addr();
    tokio::spawn(server);
    format!("http://{}", addr)
}

fn market(id: &str, symbol: &str, price: f64) -> Value {
    json!({
        "id": id,
        "symbol": symbol,
        "name": symbol.to_uppercase(),
        "image": format!("https://img.example/{}.png", symbol),
        "current_price": price,
        "market_cap": 1000000.0,
        "market_cap_rank": 500,
        "total_volume": 25000.0,
        "high_24h": price,
        "low_24h": price,
        "price_change_24h": 0.0,
        "price_change_percentage_24h": 1.5,
        "last_updated": "2024-05-01T10:00:00.000Z",
        "sparkline_in_7d": { "price": [price, price] }
    })
}

async fn markets(
    State(upstream): State<Arc<Upstream>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    upstream.hits.fetch_add(1, Ordering::SeqCst);

    if upstream.failing.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    if let Some(id) = params.get("ids") {
        let body = if id == "shiba-inu" {
            json!([market("shiba-inu", "shib", 0.00000874)])
        } else {
            json!([])
        };
        return Json(body).into_response();
    }

    let page: u32 = params
        .get("page")
        .and_then(|p| p.parse().ok())
        .unwrap_or(1);
    let fail_from = upstream.fail_from_page.load(Ordering::SeqCst);
    if fail_from != 0 && page >= fail_from {
        return (StatusCode::TOO_MANY_REQUESTS, "rate limited").into_response();
    }

    let low = market(&format!("low-{}", page), &format!("low{}", page), 0.001);
    let high = market(&format!("high-{}", page), &format!("high{}", page), 12.5);
    let body = if upstream.short_page.load(Ordering::SeqCst) == page {
        json!([low])
    } else {
        json!([low, high])
    };
    Json(body).into_response()
}

async fn tickers(State(upstream): State<Arc<Upstream>>) -> Response {
    upstream.hits.fetch_add(1, Ordering::SeqCst);

    if upstream.failing.load(Ordering::SeqCst) {
        return StatusCode::BAD_GATEWAY.into_response();
    }

    let ret_code = upstream.ret_code.load(Ordering::SeqCst);
    let ret_msg = if ret_code == 0 { "OK" } else { "params error" };
    Json(json!({
        "retCode": ret_code,
        "retMsg": ret_msg,
        "result": {
            "category": "spot",
            "list": [
                { "symbol": "PEPEUSDT", "lastPrice": "0.0000071", "turnover24h": "5400000",
                  "price24hPcnt": "0.042", "highPrice24h": "0.0000075", "lowPrice24h": "0.0000068" },
                { "symbol": "BTCUSDT", "lastPrice": "64210.5", "turnover24h": "900000000",
                  "price24hPcnt": "-0.01", "highPrice24h": "65000", "lowPrice24h": "63000" },
                { "symbol": "PEPEUSDC", "lastPrice": "0.0000071", "turnover24h": "1000",
                  "price24hPcnt": "0.04", "highPrice24h": "0.0000075", "lowPrice24h": "0.0000068" },
                { "symbol": "BONKUSDT", "lastPrice": "0.0000213", "turnover24h": "880000",
                  "price24hPcnt": "-0.051" }
            ]
        }
    }))
    .into_response()
}

fn coingecko_config(base_url: String, pages: u32) -> CoinGeckoConfig {
    CoinGeckoConfig {
        base_url,
        pages,
        per_page: PER_PAGE,
        page_delay: Duration::ZERO,
        cache_ttl: Duration::from_secs(300),
    }
}

fn bybit_config(base_url: String) -> BybitConfig {
    BybitConfig {
        base_url,
        quote: "USDT".to_string(),
        cache_ttl: Duration::from_secs(60),
    }
}

#[tokio::test]
async fn test_coingecko_walks_every_page() {
    let upstream = Arc::new(Upstream::default());
    let base_url = spawn(upstream.clone()).await;
    let feed = CoinGeckoConnector::new(coingecko_config(base_url, 3));

    let coins = feed.fetch_low_price_coins().await;

    assert_eq!(upstream.hits(), 3);
    let ids: Vec<_> = coins.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["low-1", "low-2", "low-3"]);
    assert!(coins
        .iter()
        .all(|c| c.current_price > 0.0 && c.current_price <= MAX_PRICE));
    assert!(coins.iter().all(|c| c.source == Some(Source::CoinGecko)));
}

#[tokio::test]
async fn test_coingecko_cache_window_skips_upstream() {
    let upstream = Arc::new(Upstream::default());
    let base_url = spawn(upstream.clone()).await;
    let feed = CoinGeckoConnector::new(coingecko_config(base_url, 2));

    let first = feed.fetch_low_price_coins().await;
    let second = feed.fetch_low_price_coins().await;

    assert_eq!(upstream.hits(), 2);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[tokio::test]
async fn test_coingecko_keeps_pages_before_a_failure() {
    let upstream = Arc::new(Upstream::default());
    upstream.fail_from_page.store(3, Ordering::SeqCst);
    let base_url = spawn(upstream.clone()).await;
    let feed = CoinGeckoConnector::new(coingecko_config(base_url, 5));

    let coins = feed.fetch_low_price_coins().await;

    // pages 1 and 2 succeed, page 3 is rate limited, 4 and 5 are never asked for
    assert_eq!(upstream.hits(), 3);
    assert_eq!(coins.len(), 2);
}

#[tokio::test]
async fn test_coingecko_stops_at_short_page() {
    let upstream = Arc::new(Upstream::default());
    upstream.short_page.store(2, Ordering::SeqCst);
    let base_url = spawn(upstream.clone()).await;
    let feed = CoinGeckoConnector::new(coingecko_config(base_url, 4));

    let coins = feed.fetch_low_price_coins().await;

    assert_eq!(upstream.hits(), 2);
    assert_eq!(coins.len(), 2);
}

#[tokio::test]
async fn test_coingecko_total_failure_is_empty() {
    let upstream = Arc::new(Upstream::default());
    upstream.fail_from_page.store(1, Ordering::SeqCst);
    let base_url = spawn(upstream.clone()).await;
    let feed = CoinGeckoConnector::new(coingecko_config(base_url, 3));

    assert!(feed.fetch_low_price_coins().await.is_empty());
    assert_eq!(upstream.hits(), 1);
}

#[tokio::test]
async fn test_coingecko_serves_stale_cache_on_failure() {
    let upstream = Arc::new(Upstream::default());
    let base_url = spawn(upstream.clone()).await;
    let mut config = coingecko_config(base_url, 1);
    config.cache_ttl = Duration::ZERO;
    let feed = CoinGeckoConnector::new(config);

    let good = feed.fetch_low_price_coins().await;
    upstream.failing.store(true, Ordering::SeqCst);
    let degraded = feed.fetch_low_price_coins().await;

    assert_eq!(upstream.hits(), 2);
    assert_eq!(good.len(), 1);
    assert_eq!(degraded, good);
}

#[tokio::test]
async fn test_coingecko_spaces_out_pages() {
    let upstream = Arc::new(Upstream::default());
    let base_url = spawn(upstream.clone()).await;
    let mut config = coingecko_config(base_url, 3);
    config.page_delay = Duration::from_millis(40);
    let feed = CoinGeckoConnector::new(config);

    let started = Instant::now();
    feed.fetch_low_price_coins().await;

    assert!(started.elapsed() >= Duration::from_millis(80));
}

#[tokio::test]
async fn test_coingecko_fetch_coin_details() {
    let upstream = Arc::new(Upstream::default());
    let base_url = spawn(upstream.clone()).await;
    let feed = CoinGeckoConnector::new(coingecko_config(base_url, 1));

    let coin = feed.fetch_coin("shiba-inu").await.unwrap().unwrap();
    assert_eq!(coin.symbol, "shib");
    assert_eq!(coin.source, Some(Source::CoinGecko));

    assert!(feed.fetch_coin("unknown-coin").await.unwrap().is_none());
}

#[tokio::test]
async fn test_bybit_filters_usdt_pairs_under_ceiling() {
    let upstream = Arc::new(Upstream::default());
    let base_url = spawn(upstream.clone()).await;
    let feed = BybitConnector::new(bybit_config(base_url));

    let coins = feed.fetch_low_price_coins().await;

    let symbols: Vec<_> = coins.iter().map(|c| c.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["pepe", "bonk"]);
    assert!(coins.iter().all(|c| c.source == Some(Source::Bybit)));
    assert!((coins[0].price_change_percentage_24h - 4.2).abs() < 1e-9);
    assert_eq!(coins[1].high_24h, 0.0000213);
}

#[tokio::test]
async fn test_bybit_cache_window_skips_upstream() {
    let upstream = Arc::new(Upstream::default());
    let base_url = spawn(upstream.clone()).await;
    let feed = BybitConnector::new(bybit_config(base_url));

    let first = feed.fetch_low_price_coins().await;
    let second = feed.fetch_low_price_coins().await;

    assert_eq!(upstream.hits(), 1);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_bybit_error_code_is_a_failure() {
    let upstream = Arc::new(Upstream::default());
    upstream.ret_code.store(10001, Ordering::SeqCst);
    let base_url = spawn(upstream.clone()).await;
    let feed = BybitConnector::new(bybit_config(base_url));

    assert!(feed.fetch_low_price_coins().await.is_empty());
}

#[tokio::test]
async fn test_bybit_serves_stale_cache_on_failure() {
    let upstream = Arc::new(Upstream::default());
    let base_url = spawn(upstream.clone()).await;
    let mut config = bybit_config(base_url);
    config.cache_ttl = Duration::ZERO;
    let feed = BybitConnector::new(config);

    let good = feed.fetch_low_price_coins().await;
    upstream.ret_code.store(10006, Ordering::SeqCst);
    let degraded = feed.fetch_low_price_coins().await;

    assert_eq!(upstream.hits(), 2);
    assert_eq!(good.len(), 2);
    assert_eq!(degraded, good);
}

#[tokio::test]
async fn test_unreachable_upstream_degrades_to_empty() {
    let feed = BybitConnector::new(bybit_config("http://127.0.0.1:1".to_string()));
    assert!(feed.fetch_low_price_coins().await.is_empty());
}
