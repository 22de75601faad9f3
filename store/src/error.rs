use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Record already exists: {0}")]
    Duplicate(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Store file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<StoreError> for common::Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(msg) => common::Error::AlreadyExists(msg),
            StoreError::NotFound(msg) => common::Error::NotFound(msg),
            other => common::Error::StoreError(other.to_string()),
        }
    }
}
