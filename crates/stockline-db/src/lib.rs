//! Stockline Database: SurrealDB connection management and repository
//! implementations.
//!
//! This crate provides:
//! - Connection management ([`DbManager`], [`DbConfig`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - Repository implementations of the `stockline-core` traits, including
//!   the transactional order-batch commit ([`SurrealOrderRepository`])
//! - Error types ([`DbError`])

mod connection;
mod error;
mod query;
pub mod repository;
mod schema;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use repository::{
    SurrealBusinessRepository, SurrealOrderRepository, SurrealProductRepository,
    SurrealTenantRepository, SurrealUserRepository,
};
pub use schema::{run_migrations, schema_v1};
