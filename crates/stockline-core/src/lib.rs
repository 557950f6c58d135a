//! Stockline core: domain models, access policy, query scoping,
//! repository traits and the shared error type.

pub mod actor;
pub mod error;
pub mod models;
pub mod policy;
pub mod query;
pub mod repository;
