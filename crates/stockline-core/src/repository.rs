//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Reads never return soft-deleted
//! rows; write methods take the acting user's id for the audit columns.
//! Access decisions are made by the caller through [`crate::policy`];
//! repositories only apply the [`RecordScope`] or [`QueryDescriptor`]
//! they are handed.

use uuid::Uuid;

use crate::error::StocklineResult;
use crate::models::{
    business::{Business, CreateBusiness, UpdateBusiness},
    order::{Order, OrderBatchPlan, OrderStatus, UpdateOrder},
    product::{CreateProduct, Product, UpdateProduct},
    tenant::{CreateTenant, Tenant, UpdateTenant},
    user::{CreateUser, UpdateUser, User},
};
use crate::policy::RecordScope;
use crate::query::QueryDescriptor;

/// Pagination parameters for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: crate::query::DEFAULT_PAGE_SIZE,
        }
    }
}

/// A paginated result set. `total` counts every matching row.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

pub trait TenantRepository: Send + Sync {
    fn create(
        &self,
        input: CreateTenant,
        actor_id: Uuid,
    ) -> impl Future<Output = StocklineResult<Tenant>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = StocklineResult<Tenant>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateTenant,
        actor_id: Uuid,
    ) -> impl Future<Output = StocklineResult<Tenant>> + Send;
    fn delete(&self, id: Uuid, actor_id: Uuid) -> impl Future<Output = StocklineResult<()>> + Send;
    fn list(
        &self,
        query: &QueryDescriptor,
    ) -> impl Future<Output = StocklineResult<PaginatedResult<Tenant>>> + Send;
}

pub trait BusinessRepository: Send + Sync {
    /// Fails with `Conflict` when a second wholesaler would be created
    /// in the same tenant.
    fn create(
        &self,
        input: CreateBusiness,
        actor_id: Uuid,
    ) -> impl Future<Output = StocklineResult<Business>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = StocklineResult<Business>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateBusiness,
        actor_id: Uuid,
    ) -> impl Future<Output = StocklineResult<Business>> + Send;
    fn delete(&self, id: Uuid, actor_id: Uuid) -> impl Future<Output = StocklineResult<()>> + Send;
    fn list(
        &self,
        query: &QueryDescriptor,
    ) -> impl Future<Output = StocklineResult<PaginatedResult<Business>>> + Send;
}

pub trait UserRepository: Send + Sync {
    /// Hashes `input.password`; username and email must be unused.
    fn create(
        &self,
        input: CreateUser,
        actor_id: Uuid,
    ) -> impl Future<Output = StocklineResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = StocklineResult<User>> + Send;
    fn get_by_username(
        &self,
        username: &str,
    ) -> impl Future<Output = StocklineResult<User>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateUser,
        actor_id: Uuid,
    ) -> impl Future<Output = StocklineResult<User>> + Send;
    fn delete(&self, id: Uuid, actor_id: Uuid) -> impl Future<Output = StocklineResult<()>> + Send;
    fn list(
        &self,
        query: &QueryDescriptor,
    ) -> impl Future<Output = StocklineResult<PaginatedResult<User>>> + Send;
}

pub trait ProductRepository: Send + Sync {
    fn create(
        &self,
        input: CreateProduct,
        actor_id: Uuid,
    ) -> impl Future<Output = StocklineResult<Product>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = StocklineResult<Product>> + Send;
    /// Non-deleted products of `tenant_id` among `ids`; missing ids are
    /// simply absent from the result.
    fn get_many(
        &self,
        tenant_id: Uuid,
        ids: &[Uuid],
    ) -> impl Future<Output = StocklineResult<Vec<Product>>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateProduct,
        actor_id: Uuid,
    ) -> impl Future<Output = StocklineResult<Product>> + Send;
    /// Add `delta` (possibly negative) to the stock of a product inside
    /// `scope`. Fails with `InsufficientStock` instead of going below zero.
    fn adjust_quantity(
        &self,
        scope: RecordScope,
        id: Uuid,
        delta: i64,
        actor_id: Uuid,
    ) -> impl Future<Output = StocklineResult<Product>> + Send;
    fn delete(&self, id: Uuid, actor_id: Uuid) -> impl Future<Output = StocklineResult<()>> + Send;
    fn list(
        &self,
        query: &QueryDescriptor,
    ) -> impl Future<Output = StocklineResult<PaginatedResult<Product>>> + Send;
}

pub trait OrderRepository: Send + Sync {
    /// Persist every order in `plan` and decrement stock by `plan.demand`
    /// in one transaction.
    ///
    /// Returns `Conflict` when a stock guard failed or the store detected
    /// a concurrent write; nothing is written in that case.
    fn commit_batch(
        &self,
        plan: &OrderBatchPlan,
    ) -> impl Future<Output = StocklineResult<Vec<Order>>> + Send;
    /// Order with its line items.
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = StocklineResult<Order>> + Send;
    /// Compare-and-set on the current status; `Conflict` when the order
    /// is no longer in `from`.
    fn update_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        actor_id: Uuid,
    ) -> impl Future<Output = StocklineResult<Order>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateOrder,
        actor_id: Uuid,
    ) -> impl Future<Output = StocklineResult<Order>> + Send;
    /// Soft-deletes the order and its line items.
    fn delete(&self, id: Uuid, actor_id: Uuid) -> impl Future<Output = StocklineResult<()>> + Send;
    fn list(
        &self,
        query: &QueryDescriptor,
    ) -> impl Future<Output = StocklineResult<PaginatedResult<Order>>> + Send;
}
