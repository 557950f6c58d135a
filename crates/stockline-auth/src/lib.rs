//! Stockline Auth: password login, JWT access tokens and resolution of
//! a bearer token into the [`Actor`](stockline_core::actor::Actor) every
//! core operation runs as.

pub mod config;
pub mod error;
pub mod password;
pub mod service;
pub mod token;

pub use config::AuthConfig;
pub use error::AuthError;
pub use service::{AuthService, LoginOutput};
pub use token::AccessTokenClaims;
