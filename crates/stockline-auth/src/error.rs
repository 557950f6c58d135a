//! Authentication error types.

use stockline_core::error::StocklineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is inactive")]
    AccountInactive,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for StocklineError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials | AuthError::AccountInactive => {
                StocklineError::AuthenticationFailed {
                    reason: err.to_string(),
                }
            }
            AuthError::TokenExpired | AuthError::TokenInvalid(_) => {
                StocklineError::AuthenticationFailed {
                    reason: err.to_string(),
                }
            }
            AuthError::Crypto(msg) => StocklineError::Crypto(msg),
        }
    }
}
