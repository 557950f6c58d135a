//! Stockline service layer.
//!
//! Composes the access policy, the query scope builder and the
//! repositories into the operations callers invoke on behalf of an
//! authenticated [`Actor`](stockline_core::actor::Actor).

pub mod config;
pub mod directory;
pub mod orders;

pub use config::OrderConfig;
pub use directory::DirectoryService;
pub use orders::OrderService;
