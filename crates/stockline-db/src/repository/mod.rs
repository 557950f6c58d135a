//! SurrealDB repository implementations.

mod business;
mod order;
mod product;
pub(crate) mod support;
mod tenant;
mod user;

pub use business::SurrealBusinessRepository;
pub use order::SurrealOrderRepository;
pub use product::SurrealProductRepository;
pub use tenant::SurrealTenantRepository;
pub use user::SurrealUserRepository;
