//! Error types for the Stockline system.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StocklineError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Conflict: {reason}")]
    Conflict { reason: String },

    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Authorization denied: {reason}")]
    AuthorizationDenied { reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: Uuid,
        requested: i64,
        available: i64,
    },

    /// Store-level failure while committing. The detail is kept for
    /// logging and never rendered to callers.
    #[error("Transaction failed")]
    Transaction(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StocklineError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self::AuthorizationDenied {
            reason: reason.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict {
            reason: reason.into(),
        }
    }

    /// HTTP status code a transport layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Conflict { .. } | Self::InsufficientStock { .. } => 409,
            Self::AuthenticationFailed { .. } => 401,
            Self::AuthorizationDenied { .. } => 403,
            Self::Validation { .. } => 422,
            Self::Transaction(_) | Self::Database(_) | Self::Crypto(_) | Self::Internal(_) => 500,
        }
    }
}

pub type StocklineResult<T> = Result<T, StocklineError>;
