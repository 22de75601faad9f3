mod config;
mod error;
mod record_store;

pub use config::StoreConfig;
pub use error::StoreError;
pub use record_store::{JsonRecordStore, RecordStore};
