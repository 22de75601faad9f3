use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A coin a user tracks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistEntry {
    pub id: Uuid,
    pub user_id: String,
    pub coin_id: String,
    pub symbol: String,
    pub name: String,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewWatchlistEntry {
    pub coin_id: String,
    pub symbol: String,
    pub name: String,
}

/// A logged buy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: Uuid,
    pub user_id: String,
    pub coin_id: String,
    pub symbol: String,
    pub name: String,
    pub quantity: f64,
    pub buy_price: f64,
    pub exchange: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Purchase {
    pub fn invested(&self) -> f64 {
        self.quantity * self.buy_price
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewPurchase {
    pub coin_id: String,
    pub symbol: String,
    pub name: String,
    pub quantity: f64,
    pub buy_price: f64,
    pub exchange: String,
    pub notes: Option<String>,
    pub date: DateTime<Utc>,
}

/// A purchase marked to a live price
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseValuation {
    #[serde(flatten)]
    pub purchase: Purchase,
    pub current_price: f64,
    pub current_value: f64,
    pub profit_loss: f64,
    /// Percent of the invested amount, 0 when nothing was invested
    pub profit_loss_percentage: f64,
}

impl PurchaseValuation {
    pub fn new(purchase: Purchase, current_price: f64) -> Self {
        let invested = purchase.invested();
        let current_value = purchase.quantity * current_price;
        let profit_loss = current_value - invested;

        Self {
            purchase,
            current_price,
            current_value,
            profit_loss,
            profit_loss_percentage: percentage(profit_loss, invested),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub purchases: Vec<PurchaseValuation>,
    pub total_invested: f64,
    pub total_current_value: f64,
    pub total_profit_loss: f64,
    pub total_profit_loss_percentage: f64,
}

impl PortfolioSummary {
    pub fn new(purchases: Vec<PurchaseValuation>) -> Self {
        let total_invested: f64 = purchases.iter().map(|p| p.purchase.invested()).sum();
        let total_current_value: f64 = purchases.iter().map(|p| p.current_value).sum();
        let total_profit_loss = total_current_value - total_invested;

        Self {
            purchases,
            total_invested,
            total_current_value,
            total_profit_loss,
            total_profit_loss_percentage: percentage(total_profit_loss, total_invested),
        }
    }
}

fn percentage(profit_loss: f64, invested: f64) -> f64 {
    if invested > 0.0 {
        profit_loss / invested * 100.0
    } else {
        0.0
    }
}
