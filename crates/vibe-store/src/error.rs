//! Error types for the store

use vibe_core::{PersistenceError, SiteId};

/// Store failure
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// SQLite rejected or failed a statement
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Database directory could not be prepared
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Site does not exist
    #[error("site not found: {0}")]
    SiteNotFound(SiteId),

    /// Row cannot be turned back into a value
    #[error("corrupt row: {0}")]
    Corrupt(String),

    /// Custom domain rejected
    #[error("invalid domain: {0:?}")]
    InvalidDomain(String),

    /// Blocking task died before finishing
    #[error("storage task failed: {0}")]
    Task(String),
}

pub type Result<T> = core::result::Result<T, StoreError>;

impl From<StoreError> for PersistenceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SiteNotFound(id) => Self::SiteNotFound(id),
            StoreError::Corrupt(msg) => Self::Corrupt(msg),
            StoreError::InvalidDomain(domain) => Self::InvalidDomain(domain),
            other => Self::Storage(other.to_string()),
        }
    }
}
