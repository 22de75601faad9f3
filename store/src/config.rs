use std::path::PathBuf;

/// Configuration for the watchlist/purchase record store
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    /// JSON file holding every record; `None` keeps records in memory only
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    /// Create a new store configuration from environment variables
    pub fn from_env() -> Self {
        let path = std::env::var("STORE_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Self { path }
    }
}
