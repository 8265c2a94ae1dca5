use thiserror::Error;

#[derive(Debug, Error)]
pub enum LmdbError {
    #[error("LMDB error: {0}")]
    Heed(#[from] heed::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("key not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("schema error: {0}")]
    Schema(String),
}

impl From<LmdbError> for opgov_store::StoreError {
    fn from(e: LmdbError) -> Self {
        match e {
            LmdbError::NotFound(key) => opgov_store::StoreError::NotFound(key),
            LmdbError::Serialization(msg) => opgov_store::StoreError::Serialization(msg),
            other => opgov_store::StoreError::Backend(other.to_string()),
        }
    }
}
