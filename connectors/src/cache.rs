use common::Result;
use std::future::Future;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, warn};

struct CacheEntry<T> {
    value: T,
    fetched_at: Instant,
}

/// Last good feed result plus the time it was fetched.
///
/// Reads inside the TTL never touch the network. Refreshes are single-flight:
/// callers that race past an expired entry queue on `refresh` and re-check
/// freshness, so only the first one goes upstream.
pub struct FeedCache<T> {
    name: &'static str,
    ttl: Duration,
    entry: RwLock<Option<CacheEntry<T>>>,
    refresh: Mutex<()>,
}

impl<T: Clone + Default> FeedCache<T> {
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            entry: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached value if it is still inside the TTL.
    pub async fn fresh(&self) -> Option<T> {
        let entry = self.entry.read().await;
        entry
            .as_ref()
            .filter(|e| e.fetched_at.elapsed() < self.ttl)
            .map(|e| e.value.clone())
    }

    /// Last stored value regardless of age, default when nothing was ever stored.
    pub async fn last_known(&self) -> T {
        let entry = self.entry.read().await;
        entry.as_ref().map(|e| e.value.clone()).unwrap_or_default()
    }

    pub async fn store(&self, value: T) {
        let mut entry = self.entry.write().await;
        *entry = Some(CacheEntry {
            value,
            fetched_at: Instant::now(),
        });
    }

    /// Serve the fresh value or refresh it with `fetch`.
    ///
    /// A failed fetch is logged and answered with the last known value; the
    /// fetch time is left alone so the next call tries again.
    pub async fn get_or_refresh<F, Fut>(&self, fetch: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(value) = self.fresh().await {
            debug!("{} cache hit", self.name);
            return value;
        }

        let _guard = self.refresh.lock().await;
        if let Some(value) = self.fresh().await {
            debug!("{} cache refreshed by a concurrent request", self.name);
            return value;
        }

        match fetch().await {
            Ok(value) => {
                self.store(value.clone()).await;
                value
            }
            Err(e) => {
                warn!("{} fetch failed, serving last known data: {}", self.name, e);
                self.last_known().await
            }
        }
    }
}
