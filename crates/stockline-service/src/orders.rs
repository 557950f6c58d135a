//! Order service: the batch transaction manager, status changes and
//! scoped order reads.

use std::collections::{BTreeMap, BTreeSet};

use stockline_core::actor::Actor;
use stockline_core::error::{StocklineError, StocklineResult};
use stockline_core::models::order::{
    NewOrder, NewOrderedProduct, Order, OrderBatchPlan, OrderBatchResult, OrderStatus,
    OrderSubmission, OrderType, StockDemand, UpdateOrder,
};
use stockline_core::policy::{AccessPolicy, Action, RecordScope, ResourceKind, Target};
use stockline_core::query::{ListFilters, QueryScope};
use stockline_core::repository::{
    BusinessRepository, OrderRepository, PaginatedResult, ProductRepository,
};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::OrderConfig;

/// A batch holds at most one Booked and one Requested order.
pub const MAX_BATCH_LEN: usize = 2;

/// Order operations, generic over the repositories they run against.
pub struct OrderService<O, P, B>
where
    O: OrderRepository,
    P: ProductRepository,
    B: BusinessRepository,
{
    orders: O,
    products: P,
    businesses: B,
    config: OrderConfig,
}

impl<O, P, B> OrderService<O, P, B>
where
    O: OrderRepository,
    P: ProductRepository,
    B: BusinessRepository,
{
    pub fn new(orders: O, products: P, businesses: B, config: OrderConfig) -> Self {
        Self {
            orders,
            products,
            businesses,
            config,
        }
    }

    /// Validate and atomically persist a batch of one or two orders.
    ///
    /// Booked lines take stock out of the catalogue; Requested lines only
    /// need their products to exist. Either every order, line and stock
    /// decrement is written or none is.
    #[instrument(skip(self, actor, batch), fields(actor_id = %actor.id, orders = batch.len()))]
    pub async fn create_orders(
        &self,
        actor: &Actor,
        batch: Vec<OrderSubmission>,
    ) -> StocklineResult<OrderBatchResult> {
        validate_batch(&batch)?;
        let tenant_id = batch_tenant(actor, &batch)?;
        let plan = build_plan(actor.id, tenant_id, batch)?;

        for order in &plan.orders {
            AccessPolicy::authorize(
                actor,
                ResourceKind::Order,
                Action::Create,
                Some(Target::business(tenant_id, order.business_id)),
            )?;
            let business = self.businesses.get_by_id(order.business_id).await?;
            if business.tenant_id != tenant_id {
                return Err(StocklineError::not_found("business", order.business_id));
            }
        }

        let referenced: Vec<Uuid> = plan
            .orders
            .iter()
            .flat_map(|o| o.items.iter().map(|i| i.product_id))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let attempts = self.config.max_commit_attempts.max(1);
        for attempt in 1..=attempts {
            self.check_stock(tenant_id, &referenced, &plan.demand).await?;

            match self.orders.commit_batch(&plan).await {
                Ok(orders) => {
                    info!(
                        tenant_id = %tenant_id,
                        attempt,
                        order_ids = ?orders.iter().map(|o| o.id).collect::<Vec<_>>(),
                        "orders created"
                    );
                    return Ok(into_batch_result(orders));
                }
                Err(StocklineError::Conflict { reason }) => {
                    warn!(attempt, %reason, "order batch commit refused, re-reading stock");
                    if attempt < attempts {
                        tokio::time::sleep(self.config.retry_delay(attempt)).await;
                    }
                }
                Err(other) => return Err(other),
            }
        }

        Err(StocklineError::conflict(format!(
            "stock kept changing; gave up after {attempts} attempts"
        )))
    }

    /// Read every referenced product inside the tenant and check Booked
    /// demand against what is on hand.
    async fn check_stock(
        &self,
        tenant_id: Uuid,
        referenced: &[Uuid],
        demand: &[StockDemand],
    ) -> StocklineResult<()> {
        let found: BTreeMap<Uuid, i64> = self
            .products
            .get_many(tenant_id, referenced)
            .await?
            .into_iter()
            .map(|p| (p.id, p.quantity))
            .collect();

        if let Some(missing) = referenced.iter().find(|id| !found.contains_key(id)) {
            return Err(StocklineError::not_found("product", missing));
        }

        for d in demand {
            let available = found.get(&d.product_id).copied().unwrap_or_default();
            if available < d.quantity {
                debug!(product_id = %d.product_id, requested = d.quantity, available, "insufficient stock");
                return Err(StocklineError::InsufficientStock {
                    product_id: d.product_id,
                    requested: d.quantity,
                    available,
                });
            }
        }
        Ok(())
    }

    #[instrument(skip(self, actor, filters), fields(actor_id = %actor.id))]
    pub async fn list_orders(
        &self,
        actor: &Actor,
        filters: &ListFilters,
    ) -> StocklineResult<PaginatedResult<Order>> {
        let query = QueryScope::build(actor, ResourceKind::Order, filters)?;
        self.orders.list(&query).await
    }

    /// An order the actor can see; anything else is `NotFound`.
    pub async fn get_order(&self, actor: &Actor, id: Uuid) -> StocklineResult<Order> {
        let scope = AccessPolicy::record_scope(actor, ResourceKind::Order, Action::Read)?;
        self.load_within(scope, id).await
    }

    /// Move an order along the status machine with a compare-and-set on
    /// the status it was read with.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn update_order_status(
        &self,
        actor: &Actor,
        id: Uuid,
        status: OrderStatus,
    ) -> StocklineResult<Order> {
        let order = self.load_for(actor, Action::ChangeStatus, id).await?;
        order.status.transition(status)?;
        // No stock is restored on cancellation; see `DirectoryService::adjust_stock`.
        self.orders
            .update_status(id, order.status, status, actor.id)
            .await
    }

    #[instrument(skip(self, actor, input), fields(actor_id = %actor.id))]
    pub async fn update_order(
        &self,
        actor: &Actor,
        id: Uuid,
        input: UpdateOrder,
    ) -> StocklineResult<Order> {
        self.load_for(actor, Action::Update, id).await?;
        self.orders.update(id, input, actor.id).await
    }

    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn delete_order(&self, actor: &Actor, id: Uuid) -> StocklineResult<()> {
        self.load_for(actor, Action::Delete, id).await?;
        self.orders.delete(id, actor.id).await
    }

    /// Authorize `action`, then load the order if it lies inside both the
    /// read scope and the action's scope.
    async fn load_for(&self, actor: &Actor, action: Action, id: Uuid) -> StocklineResult<Order> {
        let write_scope = AccessPolicy::record_scope(actor, ResourceKind::Order, action)?;
        let order = self.get_order(actor, id).await?;
        if !write_scope.covers(order_target(&order)) {
            return Err(StocklineError::not_found("order", id));
        }
        Ok(order)
    }

    async fn load_within(&self, scope: RecordScope, id: Uuid) -> StocklineResult<Order> {
        let order = self.orders.get_by_id(id).await?;
        if scope.covers(order_target(&order)) {
            Ok(order)
        } else {
            Err(StocklineError::not_found("order", id))
        }
    }
}

fn order_target(order: &Order) -> Target {
    Target::business(order.tenant_id, order.business_id)
}

/// Shape checks that need no store access.
fn validate_batch(batch: &[OrderSubmission]) -> StocklineResult<()> {
    if batch.is_empty() || batch.len() > MAX_BATCH_LEN {
        return Err(StocklineError::validation(format!(
            "a batch holds 1 to {MAX_BATCH_LEN} orders, got {}",
            batch.len()
        )));
    }

    for order_type in OrderType::ALL {
        if batch.iter().filter(|s| s.order_type == *order_type).count() > 1 {
            return Err(StocklineError::validation(format!(
                "a batch holds at most one {order_type} order"
            )));
        }
    }

    for submission in batch {
        if submission.items.is_empty() {
            return Err(StocklineError::validation(format!(
                "{} order has no line items",
                submission.order_type
            )));
        }
        if let Some(item) = submission.items.iter().find(|i| i.quantity <= 0) {
            return Err(StocklineError::validation(format!(
                "quantity for product {} must be positive, got {}",
                item.product_id, item.quantity
            )));
        }
        if let Some(status) = submission.status {
            if !matches!(status, OrderStatus::New | OrderStatus::InProgress) {
                return Err(StocklineError::validation(format!(
                    "orders cannot be created as {status}"
                )));
            }
        }
    }
    Ok(())
}

/// Every order of a batch lands in the same tenant.
fn batch_tenant(actor: &Actor, batch: &[OrderSubmission]) -> StocklineResult<Uuid> {
    let tenants: BTreeSet<Uuid> = batch
        .iter()
        .map(|s| AccessPolicy::order_tenant(actor, s.tenant_id))
        .collect();
    let mut tenants = tenants.into_iter();
    match (tenants.next(), tenants.next()) {
        (Some(tenant_id), None) => Ok(tenant_id),
        _ => Err(StocklineError::validation(
            "all orders of a batch must belong to one tenant",
        )),
    }
}

/// Assign ids and sum Booked demand per product.
///
/// A per-product sum that does not fit in `i64` is rejected.
fn build_plan(
    actor_id: Uuid,
    tenant_id: Uuid,
    batch: Vec<OrderSubmission>,
) -> StocklineResult<OrderBatchPlan> {
    let mut demand: BTreeMap<Uuid, i64> = BTreeMap::new();
    let mut orders = Vec::with_capacity(batch.len());

    for submission in batch {
        if submission.order_type == OrderType::Booked {
            for item in &submission.items {
                let total = demand.entry(item.product_id).or_default();
                *total = total.checked_add(item.quantity).ok_or_else(|| {
                    StocklineError::validation(format!(
                        "total quantity for product {} is too large",
                        item.product_id
                    ))
                })?;
            }
        }
        orders.push(NewOrder {
            id: Uuid::new_v4(),
            business_id: submission.business_id,
            order_type: submission.order_type,
            sub_type: submission.sub_type,
            status: submission.status.unwrap_or(OrderStatus::New),
            additional_data: submission
                .additional_data
                .unwrap_or(serde_json::Value::Object(Default::default())),
            items: submission
                .items
                .into_iter()
                .map(|item| NewOrderedProduct {
                    id: Uuid::new_v4(),
                    product_id: item.product_id,
                    quantity: item.quantity,
                    price: item.price,
                    discount_type: item.discount_type,
                    discount_amount: item.discount_amount,
                    tax_type: item.tax_type,
                    tax_amount: item.tax_amount,
                    total_cost: item.total_cost,
                })
                .collect(),
        });
    }

    Ok(OrderBatchPlan {
        tenant_id,
        actor_id,
        orders,
        demand: demand
            .into_iter()
            .map(|(product_id, quantity)| StockDemand {
                product_id,
                quantity,
            })
            .collect(),
    })
}

fn into_batch_result(orders: Vec<Order>) -> OrderBatchResult {
    let mut result = OrderBatchResult::default();
    for order in orders {
        match order.order_type {
            OrderType::Booked => result.booked_order = Some(order),
            OrderType::Requested => result.requested_order = Some(order),
        }
    }
    result
}
