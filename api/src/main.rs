mod config;
mod handler;
mod service;
#[cfg(test)]
mod test_support;

use axum::{
    routing::{get, post},
    Router,
};
use config::ApiConfig;
use connectors::{bybit::BybitConnector, coingecko::CoinGeckoConnector, BybitConfig, CoinGeckoConfig};
use handler::{AppState, SharedState};
use service::CoinService;
use std::sync::Arc;
use store::{JsonRecordStore, StoreConfig};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// API routes without the HTTP middleware
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/v1/coins", get(handler::list_coins))
        .route("/api/v1/coins/:id", get(handler::get_coin))
        .route(
            "/api/v1/watchlist",
            get(handler::list_watchlist)
                .post(handler::add_to_watchlist)
                .delete(handler::remove_from_watchlist),
        )
        .route(
            "/api/v1/purchases",
            post(handler::create_purchase)
                .get(handler::list_purchases)
                .delete(handler::delete_purchase),
        )
        .route("/api/v1/portfolio", get(handler::get_portfolio))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting Lowin API");

    // Load configuration from environment
    let api_config = ApiConfig::from_env();
    let coingecko_config = CoinGeckoConfig::from_env()
        .map_err(|e| format!("Failed to load CoinGecko configuration: {}", e))?;
    let bybit_config = BybitConfig::from_env()
        .map_err(|e| format!("Failed to load Bybit configuration: {}", e))?;
    let store_config = StoreConfig::from_env();

    let record_store = JsonRecordStore::open(store_config)
        .await
        .map_err(|e| format!("Failed to open record store: {}", e))?;

    // Create coin feeds
    let coingecko = Arc::new(CoinGeckoConnector::new(coingecko_config));
    let bybit = Arc::new(BybitConnector::new(bybit_config));

    let state = Arc::new(AppState {
        coins: CoinService::new(coingecko, bybit),
        store: Arc::new(record_store),
    });

    // Create CORS middleware
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let app = router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = api_config.socket_addr()?;
    info!("Listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
