//! Repository error types

use thiserror::Error;

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Failure of a single repository operation.
///
/// `NotFound` is only produced by lookups that must return exactly one row;
/// updates and deletes report missing rows through their affected-row count.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl RepositoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound,
            other => Self::Database(other),
        }
    }
}
