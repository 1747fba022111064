use thiserror::Error;

use crate::db::DbError;

/// Everything the pipelines can report to a caller. Each variant is a
/// distinct, inspectable condition; the HTTP layer maps them to statuses.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The ticker was already ingested. No work was performed.
    #[error("company already exists: {0}")]
    AlreadyExists(String),

    /// No company matches the given ticker or name.
    #[error("no company found: {0}")]
    NotFound(String),

    /// The provider returned nothing usable or errored. Transient; nothing
    /// was persisted, so the caller may retry.
    #[error("failed to scrape {ticker}: {reason}")]
    ScrapeFailed { ticker: String, reason: String },

    /// The store failed after a successful scrape. The scraped payload is
    /// logged before this is returned so the data can be recovered manually.
    #[error("failed to persist scraped data for {ticker}: {source}")]
    PersistenceFailed { ticker: String, source: DbError },

    /// A store uniqueness constraint fired, i.e. a race the existence
    /// pre-check did not catch.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// A store failure on a read path.
    #[error("database error: {0}")]
    Database(DbError),
}

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::UniqueViolation(detail) => ServiceError::DuplicateKey(detail),
            other => ServiceError::Database(other),
        }
    }
}
