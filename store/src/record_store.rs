use crate::{StoreConfig, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use common::models::{NewPurchase, NewWatchlistEntry, Purchase, WatchlistEntry};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Durable per-user watchlist and purchase records
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fails with `Duplicate` if the user already watches this coin.
    async fn add_watchlist_entry(
        &self,
        user_id: &str,
        entry: NewWatchlistEntry,
    ) -> Result<WatchlistEntry, StoreError>;

    /// Newest first
    async fn list_watchlist(&self, user_id: &str) -> Result<Vec<WatchlistEntry>, StoreError>;

    /// Returns how many entries were removed.
    async fn remove_watchlist_entry(&self, user_id: &str, coin_id: &str)
        -> Result<usize, StoreError>;

    async fn add_purchase(&self, user_id: &str, purchase: NewPurchase)
        -> Result<Purchase, StoreError>;

    /// Latest purchase date first
    async fn list_purchases(&self, user_id: &str) -> Result<Vec<Purchase>, StoreError>;

    /// Fails with `NotFound` when the purchase is missing or owned by someone else.
    async fn delete_purchase(&self, user_id: &str, id: Uuid) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Records {
    watchlist: Vec<WatchlistEntry>,
    purchases: Vec<Purchase>,
}

/// Record store kept in memory and mirrored to a JSON file when a path is set.
///
/// Every write builds the next state, persists it, then swaps it in, so a
/// failed write leaves both the file and memory untouched.
pub struct JsonRecordStore {
    path: Option<PathBuf>,
    records: RwLock<Records>,
}

impl JsonRecordStore {
    pub async fn open(config: StoreConfig) -> Result<Self, StoreError> {
        let records = match &config.path {
            Some(path) => load(path).await?,
            None => Records::default(),
        };

        info!(
            "Record store ready ({} watchlist entries, {} purchases, {})",
            records.watchlist.len(),
            records.purchases.len(),
            config
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "in-memory".to_string())
        );

        Ok(Self {
            path: config.path,
            records: RwLock::new(records),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            records: RwLock::new(Records::default()),
        }
    }

    async fn persist(&self, records: &Records) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let body = serde_json::to_vec_pretty(records)?;
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, path).await?;

        debug!("Persisted record store to {}", path.display());
        Ok(())
    }
}

async fn load(path: &Path) -> Result<Records, StoreError> {
    match tokio::fs::read(path).await {
        Ok(body) => Ok(serde_json::from_slice(&body)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Records::default()),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl RecordStore for JsonRecordStore {
    async fn add_watchlist_entry(
        &self,
        user_id: &str,
        entry: NewWatchlistEntry,
    ) -> Result<WatchlistEntry, StoreError> {
        let mut records = self.records.write().await;

        if records
            .watchlist
            .iter()
            .any(|w| w.user_id == user_id && w.coin_id == entry.coin_id)
        {
            return Err(StoreError::Duplicate(format!(
                "{} is already in the watchlist",
                entry.coin_id
            )));
        }

        let created = WatchlistEntry {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            coin_id: entry.coin_id,
            symbol: entry.symbol,
            name: entry.name,
            added_at: Utc::now(),
        };

        let mut next = records.clone();
        next.watchlist.push(created.clone());
        self.persist(&next).await?;
        *records = next;

        debug!("Added {} to watchlist of {}", created.coin_id, user_id);
        Ok(created)
    }

    async fn list_watchlist(&self, user_id: &str) -> Result<Vec<WatchlistEntry>, StoreError> {
        let records = self.records.read().await;
        let mut entries: Vec<WatchlistEntry> = records
            .watchlist
            .iter()
            .filter(|w| w.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        Ok(entries)
    }

    async fn remove_watchlist_entry(
        &self,
        user_id: &str,
        coin_id: &str,
    ) -> Result<usize, StoreError> {
        let mut records = self.records.write().await;

        let mut next = records.clone();
        next.watchlist
            .retain(|w| !(w.user_id == user_id && w.coin_id == coin_id));
        let removed = records.watchlist.len() - next.watchlist.len();
        if removed == 0 {
            return Ok(0);
        }

        self.persist(&next).await?;
        *records = next;

        debug!("Removed {} from watchlist of {}", coin_id, user_id);
        Ok(removed)
    }

    async fn add_purchase(
        &self,
        user_id: &str,
        purchase: NewPurchase,
    ) -> Result<Purchase, StoreError> {
        let mut records = self.records.write().await;

        let created = Purchase {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            coin_id: purchase.coin_id,
            symbol: purchase.symbol,
            name: purchase.name,
            quantity: purchase.quantity,
            buy_price: purchase.buy_price,
            exchange: purchase.exchange,
            notes: purchase.notes,
            date: purchase.date,
            created_at: Utc::now(),
        };

        let mut next = records.clone();
        next.purchases.push(created.clone());
        self.persist(&next).await?;
        *records = next;

        debug!("Recorded purchase {} of {} for {}", created.id, created.coin_id, user_id);
        Ok(created)
    }

    async fn list_purchases(&self, user_id: &str) -> Result<Vec<Purchase>, StoreError> {
        let records = self.records.read().await;
        let mut purchases: Vec<Purchase> = records
            .purchases
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        purchases.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(purchases)
    }

    async fn delete_purchase(&self, user_id: &str, id: Uuid) -> Result<(), StoreError> {
        let mut records = self.records.write().await;

        let owned = records
            .purchases
            .iter()
            .any(|p| p.id == id && p.user_id == user_id);
        if !owned {
            return Err(StoreError::NotFound(format!("Purchase {} not found", id)));
        }

        let mut next = records.clone();
        next.purchases.retain(|p| p.id != id);
        self.persist(&next).await?;
        *records = next;

        debug!("Deleted purchase {} for {}", id, user_id);
        Ok(())
    }
}
