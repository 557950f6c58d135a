//! Database-specific error types and conversions.

use stockline_core::error::StocklineError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Malformed row: {0}")]
    InvalidRow(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Conflict: {reason}")]
    Conflict { reason: String },

    #[error("Transaction aborted: {0}")]
    Transaction(String),

    #[error("Password hashing failed: {0}")]
    Hash(String),
}

impl DbError {
    pub(crate) fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub(crate) fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict {
            reason: reason.into(),
        }
    }
}

impl From<DbError> for StocklineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => StocklineError::NotFound { entity, id },
            DbError::Conflict { reason } => StocklineError::Conflict { reason },
            DbError::Transaction(detail) => StocklineError::Transaction(detail),
            DbError::Hash(detail) => StocklineError::Crypto(detail),
            other => StocklineError::Database(other.to_string()),
        }
    }
}
