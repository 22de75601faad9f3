use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use common::{
    models::{
        CoinQuery, CoinRecord, CoinsResponse, NewPurchase, NewWatchlistEntry, PortfolioSummary,
        Purchase, WatchlistEntry,
    },
    Error as CommonError,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use store::RecordStore;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::service::CoinService;

/// Header the upstream auth layer sets to the signed-in user's id
pub const USER_HEADER: &str = "x-user-id";

pub struct AppState {
    pub coins: CoinService,
    pub store: Arc<dyn RecordStore>,
}

pub type SharedState = Arc<AppState>;

// Create a wrapper for our common::Error type
pub struct ApiError(CommonError);

impl From<CommonError> for ApiError {
    fn from(err: CommonError) -> Self {
        ApiError(err)
    }
}

impl From<store::StoreError> for ApiError {
    fn from(err: store::StoreError) -> Self {
        ApiError(err.into())
    }
}

// Convert our API error wrapper to an Axum response
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self.0 {
            CommonError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            CommonError::AlreadyExists(_) => {
                (StatusCode::CONFLICT, "Coin already in watchlist".to_string())
            }
            CommonError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            CommonError::ParseError(msg) => (StatusCode::BAD_REQUEST, msg),
            CommonError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            CommonError::FeedError(msg) => (StatusCode::BAD_GATEWAY, msg),
            CommonError::HttpError(e) => (
                StatusCode::BAD_GATEWAY,
                format!("External API request failed: {}", e),
            ),
            CommonError::StoreError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            CommonError::ConfigError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            CommonError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        if status.is_server_error() {
            error!("Request failed with {}: {}", status, message);
        }

        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
        }

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Caller identity taken from `USER_HEADER`
pub struct UserId(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for UserId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| UserId(v.to_string()))
            .ok_or(ApiError(CommonError::Unauthorized))
    }
}

#[derive(Debug, Deserialize)]
pub struct CoinsParams {
    pub filter: Option<String>,
    pub platform: Option<String>,
    pub search: Option<String>,
}

impl CoinsParams {
    /// Blank or unknown `filter`/`platform` values fall back to `all`.
    fn into_query(self) -> CoinQuery {
        CoinQuery {
            tab: parse_or_default(self.filter.as_deref(), "filter"),
            platform: parse_or_default(self.platform.as_deref(), "platform"),
            search: self.search.unwrap_or_default(),
        }
    }
}

fn parse_or_default<T>(raw: Option<&str>, param: &str) -> T
where
    T: FromStr<Err = CommonError> + Default,
{
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => value.parse().unwrap_or_else(|e| {
            warn!("Ignoring {} parameter: {}", param, e);
            T::default()
        }),
        None => T::default(),
    }
}

// Filtered view of the merged catalogue
pub async fn list_coins(
    State(state): State<SharedState>,
    Query(params): Query<CoinsParams>,
) -> Result<Json<CoinsResponse>, ApiError> {
    let query = params.into_query();
    let response = state.coins.query_coins(&query).await?;
    Ok(Json(response))
}

pub async fn get_coin(
    State(state): State<SharedState>,
    Path(coin_id): Path<String>,
) -> Result<Json<CoinRecord>, ApiError> {
    let coin = state.coins.get_coin(&coin_id).await?;
    Ok(Json(coin))
}

#[derive(Debug, Serialize)]
pub struct WatchlistResponse {
    pub watchlist: Vec<WatchlistEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistItemResponse {
    pub watchlist_item: WatchlistEntry,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistRequest {
    pub coin_id: Option<String>,
    pub symbol: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveWatchlistParams {
    pub coin_id: Option<String>,
}

fn required(field: Option<String>) -> Option<String> {
    field.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn missing_fields() -> CommonError {
    CommonError::InvalidInput("Missing required fields".to_string())
}

pub async fn list_watchlist(
    State(state): State<SharedState>,
    UserId(user): UserId,
) -> Result<Json<WatchlistResponse>, ApiError> {
    let watchlist = state.store.list_watchlist(&user).await?;
    Ok(Json(WatchlistResponse { watchlist }))
}

pub async fn add_to_watchlist(
    State(state): State<SharedState>,
    UserId(user): UserId,
    Json(body): Json<WatchlistRequest>,
) -> Result<(StatusCode, Json<WatchlistItemResponse>), ApiError> {
    let (Some(coin_id), Some(symbol), Some(name)) = (
        required(body.coin_id),
        required(body.symbol),
        required(body.name),
    ) else {
        return Err(missing_fields().into());
    };

    let entry = state
        .store
        .add_watchlist_entry(
            &user,
            NewWatchlistEntry {
                coin_id,
                symbol,
                name,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(WatchlistItemResponse {
            watchlist_item: entry,
        }),
    ))
}

pub async fn remove_from_watchlist(
    State(state): State<SharedState>,
    UserId(user): UserId,
    Query(params): Query<RemoveWatchlistParams>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let coin_id = required(params.coin_id)
        .ok_or_else(|| CommonError::InvalidInput("Coin ID required".to_string()))?;

    let removed = state.store.remove_watchlist_entry(&user, &coin_id).await?;
    debug!("Removed {} watchlist entries for {}", removed, coin_id);
    Ok(Json(SuccessResponse { success: true }))
}

#[derive(Debug, Serialize)]
pub struct PurchasesResponse {
    pub purchases: Vec<Purchase>,
}

#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    pub purchase: Purchase,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub coin_id: Option<String>,
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub quantity: Option<f64>,
    pub buy_price: Option<f64>,
    pub exchange: Option<String>,
    pub notes: Option<String>,
    pub date: Option<String>,
}

impl PurchaseRequest {
    fn validate(self) -> Result<NewPurchase, CommonError> {
        let (
            Some(coin_id),
            Some(symbol),
            Some(name),
            Some(quantity),
            Some(buy_price),
            Some(exchange),
            Some(date),
        ) = (
            required(self.coin_id),
            required(self.symbol),
            required(self.name),
            self.quantity,
            self.buy_price,
            required(self.exchange),
            required(self.date),
        )
        else {
            return Err(missing_fields());
        };

        if !(quantity.is_finite() && quantity > 0.0) {
            return Err(CommonError::InvalidInput(
                "Quantity must be a positive number".to_string(),
            ));
        }
        if !(buy_price.is_finite() && buy_price > 0.0) {
            return Err(CommonError::InvalidInput(
                "Buy price must be a positive number".to_string(),
            ));
        }

        Ok(NewPurchase {
            coin_id,
            symbol,
            name,
            quantity,
            buy_price,
            exchange,
            notes: required(self.notes),
            date: parse_purchase_date(&date)?,
        })
    }
}

/// RFC 3339 timestamp or a plain `YYYY-MM-DD` date (midnight UTC)
fn parse_purchase_date(raw: &str) -> Result<DateTime<Utc>, CommonError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| CommonError::InvalidInput(format!("Invalid purchase date: {}", raw)))
}

#[derive(Debug, Deserialize)]
pub struct DeletePurchaseParams {
    pub id: Option<String>,
}

pub async fn list_purchases(
    State(state): State<SharedState>,
    UserId(user): UserId,
) -> Result<Json<PurchasesResponse>, ApiError> {
    let purchases = state.store.list_purchases(&user).await?;
    Ok(Json(PurchasesResponse { purchases }))
}

pub async fn create_purchase(
    State(state): State<SharedState>,
    UserId(user): UserId,
    Json(body): Json<PurchaseRequest>,
) -> Result<(StatusCode, Json<PurchaseResponse>), ApiError> {
    let purchase = body.validate()?;
    let purchase = state.store.add_purchase(&user, purchase).await?;
    Ok((StatusCode::CREATED, Json(PurchaseResponse { purchase })))
}

pub async fn delete_purchase(
    State(state): State<SharedState>,
    UserId(user): UserId,
    Query(params): Query<DeletePurchaseParams>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let raw = required(params.id)
        .ok_or_else(|| CommonError::InvalidInput("Purchase ID required".to_string()))?;
    // an id that cannot exist is reported like one owned by someone else
    let id = Uuid::parse_str(&raw)
        .map_err(|_| CommonError::NotFound("Purchase not found".to_string()))?;

    state.store.delete_purchase(&user, id).await?;
    Ok(Json(SuccessResponse { success: true }))
}

// Purchases valued at live prices
pub async fn get_portfolio(
    State(state): State<SharedState>,
    UserId(user): UserId,
) -> Result<Json<PortfolioSummary>, ApiError> {
    let purchases = state.store.list_purchases(&user).await?;
    let summary = state.coins.portfolio(purchases).await?;
    Ok(Json(summary))
}
