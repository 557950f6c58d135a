//! SurrealDB implementation of [`OrderRepository`].
//!
//! A batch is committed as one SurrealQL transaction: guarded stock
//! decrements first, then every order and line-item row. A failed guard
//! throws, which rolls the whole transaction back.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use stockline_core::error::StocklineResult;
use stockline_core::models::order::{Order, OrderBatchPlan, OrderStatus, OrderedProduct, UpdateOrder};
use stockline_core::query::QueryDescriptor;
use stockline_core::repository::{OrderRepository, PaginatedResult};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::support::{opt_string, parse_decimal, parse_enum, parse_opt_decimal, parse_uuid};
use crate::error::DbError;
use crate::query::ScopedQuery;

const STOCK_GUARD: &str = "stock_guard_failed";

const COMMIT_BATCH: &str = "\
BEGIN TRANSACTION;
LET $now = time::now();
FOR $item IN $demand {
    LET $taken = (UPDATE type::record('product', $item.product_id) SET \
        quantity -= $item.quantity, modified_by = $actor_id, updated_at = $now \
        WHERE is_deleted = false AND tenant_id = $tenant_id \
        AND quantity >= $item.quantity);
    IF array::len($taken) = 0 {
        THROW 'stock_guard_failed: ' + $item.product_id;
    };
};
FOR $order IN $orders {
    CREATE type::record('purchase_order', $order.id) SET \
        tenant_id = $tenant_id, business_id = $order.business_id, \
        order_type = $order.order_type, sub_type = $order.sub_type, \
        order_status = $order.order_status, order_date_time = $now, \
        additional_data = $order.additional_data, \
        created_by = $actor_id, modified_by = $actor_id, \
        created_at = $now, updated_at = $now;
    FOR $line IN $order.items {
        CREATE type::record('ordered_product', $line.id) SET \
            order_id = $order.id, product_id = $line.product_id, \
            line_no = $line.line_no, quantity = $line.quantity, \
            price = $line.price, discount_type = $line.discount_type, \
            discount_amount = $line.discount_amount, tax_type = $line.tax_type, \
            tax_amount = $line.tax_amount, total_cost = $line.total_cost, \
            created_by = $actor_id, modified_by = $actor_id, \
            created_at = $now, updated_at = $now;
    };
};
COMMIT TRANSACTION;
";

// ---------------------------------------------------------------------------
// Parameters bound into COMMIT_BATCH
// ---------------------------------------------------------------------------

#[derive(Debug, SurrealValue)]
struct DemandParam {
    product_id: String,
    quantity: i64,
}

#[derive(Debug, SurrealValue)]
struct LineParam {
    id: String,
    product_id: String,
    line_no: i64,
    quantity: i64,
    price: String,
    discount_type: Option<String>,
    discount_amount: Option<String>,
    tax_type: Option<String>,
    tax_amount: Option<String>,
    total_cost: String,
}

#[derive(Debug, SurrealValue)]
struct OrderParam {
    id: String,
    business_id: String,
    order_type: String,
    sub_type: Option<String>,
    order_status: String,
    additional_data: serde_json::Value,
    items: Vec<LineParam>,
}

fn order_params(plan: &OrderBatchPlan) -> Vec<OrderParam> {
    plan.orders
        .iter()
        .map(|order| OrderParam {
            id: order.id.to_string(),
            business_id: order.business_id.to_string(),
            order_type: order.order_type.as_str().to_string(),
            sub_type: order.sub_type.clone(),
            order_status: order.status.as_str().to_string(),
            additional_data: order.additional_data.clone(),
            items: order
                .items
                .iter()
                .zip(0_i64..)
                .map(|(line, line_no)| LineParam {
                    id: line.id.to_string(),
                    product_id: line.product_id.to_string(),
                    line_no,
                    quantity: line.quantity,
                    price: line.price.to_string(),
                    discount_type: opt_string(line.discount_type),
                    discount_amount: opt_string(line.discount_amount),
                    tax_type: line.tax_type.clone(),
                    tax_amount: opt_string(line.tax_amount),
                    total_cost: line.total_cost.to_string(),
                })
                .collect(),
        })
        .collect()
}

/// A refused stock guard or a write-write conflict reported by the
/// store both mean "re-read and try again".
fn commit_failure(detail: String) -> DbError {
    let lowered = detail.to_lowercase();
    if lowered.contains(STOCK_GUARD) || lowered.contains("conflict") || lowered.contains("retried")
    {
        DbError::conflict(format!("stock changed during commit: {detail}"))
    } else {
        DbError::Transaction(detail)
    }
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

#[derive(Debug, SurrealValue)]
struct OrderRow {
    record_id: Option<String>,
    tenant_id: String,
    business_id: String,
    order_type: String,
    sub_type: Option<String>,
    order_status: String,
    order_date_time: DateTime<Utc>,
    additional_data: serde_json::Value,
    created_by: String,
    modified_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(
        self,
        id: Uuid,
        items: Vec<OrderedProduct>,
        contacts: &HashMap<Uuid, ContactRow>,
    ) -> Result<Order, DbError> {
        let business_id = parse_uuid(&self.business_id, "business")?;
        let contact = contacts.get(&business_id);
        Ok(Order {
            id,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            business_id,
            order_type: parse_enum(&self.order_type, "order type")?,
            sub_type: self.sub_type,
            status: parse_enum(&self.order_status, "order status")?,
            order_date_time: self.order_date_time,
            additional_data: self.additional_data,
            items,
            dealer_name: contact.map(|c| c.name.clone()),
            dealer_email: contact.and_then(|c| c.email.clone()),
            dealer_phone: contact.and_then(|c| c.phone_number.clone()),
            created_by: parse_uuid(&self.created_by, "created_by")?,
            modified_by: parse_uuid(&self.modified_by, "modified_by")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }

    fn id(&self) -> Result<Uuid, DbError> {
        parse_uuid(self.record_id.as_deref().unwrap_or_default(), "order")
    }
}

/// Name and contact columns of the business an order was placed for.
#[derive(Debug, SurrealValue)]
struct ContactRow {
    record_id: Option<String>,
    name: String,
    email: Option<String>,
    phone_number: Option<String>,
}

#[derive(Debug, SurrealValue)]
struct LineRow {
    record_id: Option<String>,
    order_id: String,
    product_id: String,
    quantity: i64,
    price: String,
    discount_type: Option<String>,
    discount_amount: Option<String>,
    tax_type: Option<String>,
    tax_amount: Option<String>,
    total_cost: String,
    created_by: String,
    modified_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LineRow {
    fn try_into_line(self) -> Result<OrderedProduct, DbError> {
        Ok(OrderedProduct {
            id: parse_uuid(self.record_id.as_deref().unwrap_or_default(), "line item")?,
            order_id: parse_uuid(&self.order_id, "order")?,
            product_id: parse_uuid(&self.product_id, "product")?,
            quantity: self.quantity,
            price: parse_decimal(&self.price, "price")?,
            discount_type: self
                .discount_type
                .as_deref()
                .map(|d| parse_enum(d, "discount type"))
                .transpose()?,
            discount_amount: parse_opt_decimal(self.discount_amount.as_deref(), "discount")?,
            tax_type: self.tax_type,
            tax_amount: parse_opt_decimal(self.tax_amount.as_deref(), "tax")?,
            total_cost: parse_decimal(&self.total_cost, "total_cost")?,
            created_by: parse_uuid(&self.created_by, "created_by")?,
            modified_by: parse_uuid(&self.modified_by, "modified_by")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Order repository.
#[derive(Clone)]
pub struct SurrealOrderRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealOrderRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Line items of the given orders, grouped by order and kept in
    /// submission order.
    async fn lines_for(
        &self,
        order_ids: Vec<String>,
    ) -> Result<HashMap<Uuid, Vec<OrderedProduct>>, DbError> {
        let mut grouped: HashMap<Uuid, Vec<OrderedProduct>> = HashMap::new();
        if order_ids.is_empty() {
            return Ok(grouped);
        }

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM ordered_product \
                 WHERE order_id IN $order_ids AND is_deleted = false \
                 ORDER BY order_id ASC, line_no ASC",
            )
            .bind(("order_ids", order_ids))
            .await?;

        let rows: Vec<LineRow> = result.take(0)?;
        for row in rows {
            let line = row.try_into_line()?;
            grouped.entry(line.order_id).or_default().push(line);
        }
        Ok(grouped)
    }

    /// Contact rows of the given businesses in one round trip. Deleted
    /// businesses still resolve so old orders keep their dealer.
    async fn contacts_for(
        &self,
        business_ids: Vec<String>,
    ) -> Result<HashMap<Uuid, ContactRow>, DbError> {
        if business_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, name, email, phone_number FROM business \
                 WHERE meta::id(id) IN $business_ids",
            )
            .bind(("business_ids", business_ids))
            .await?;

        let rows: Vec<ContactRow> = result.take(0)?;
        rows.into_iter()
            .map(|row| -> Result<(Uuid, ContactRow), DbError> {
                let id = parse_uuid(row.record_id.as_deref().unwrap_or_default(), "business")?;
                Ok((id, row))
            })
            .collect()
    }
}

impl<C: Connection> OrderRepository for SurrealOrderRepository<C> {
    async fn commit_batch(&self, plan: &OrderBatchPlan) -> StocklineResult<Vec<Order>> {
        let demand: Vec<DemandParam> = plan
            .demand
            .iter()
            .map(|d| DemandParam {
                product_id: d.product_id.to_string(),
                quantity: d.quantity,
            })
            .collect();

        let result = self
            .db
            .query(COMMIT_BATCH)
            .bind(("tenant_id", plan.tenant_id.to_string()))
            .bind(("actor_id", plan.actor_id.to_string()))
            .bind(("demand", demand))
            .bind(("orders", order_params(plan)))
            .await
            .map_err(|e| commit_failure(e.to_string()))?;

        if let Err(e) = result.check() {
            let err = commit_failure(e.to_string());
            warn!(tenant_id = %plan.tenant_id, error = %err, "order batch rolled back");
            return Err(err.into());
        }

        info!(
            tenant_id = %plan.tenant_id,
            orders = plan.orders.len(),
            products = plan.demand.len(),
            "order batch committed"
        );

        let mut orders = Vec::with_capacity(plan.orders.len());
        for order in &plan.orders {
            orders.push(self.get_by_id(order.id).await?);
        }
        Ok(orders)
    }

    async fn get_by_id(&self, id: Uuid) -> StocklineResult<Order> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM type::record('purchase_order', $id) \
                 WHERE is_deleted = false",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OrderRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("order", &id_str))?;

        let mut lines = self.lines_for(vec![id_str]).await?;
        let contacts = self.contacts_for(vec![row.business_id.clone()]).await?;
        Ok(row.into_order(id, lines.remove(&id).unwrap_or_default(), &contacts)?)
    }

    async fn update_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        actor_id: Uuid,
    ) -> StocklineResult<Order> {
        let mut result = self
            .db
            .query(
                "UPDATE type::record('purchase_order', $id) SET \
                 order_status = $next, modified_by = $actor_id, updated_at = time::now() \
                 WHERE is_deleted = false AND order_status = $current",
            )
            .bind(("id", id.to_string()))
            .bind(("current", from.as_str().to_string()))
            .bind(("next", to.as_str().to_string()))
            .bind(("actor_id", actor_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OrderRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            // Surfaces NotFound when the order vanished in the meantime.
            let current = self.get_by_id(id).await?;
            return Err(DbError::conflict(format!(
                "order status is {} (expected {from})",
                current.status
            ))
            .into());
        }

        debug!(order_id = %id, %from, %to, "order status changed");
        self.get_by_id(id).await
    }

    async fn update(&self, id: Uuid, input: UpdateOrder, actor_id: Uuid) -> StocklineResult<Order> {
        let mut sets = Vec::new();
        if input.sub_type.is_some() {
            sets.push("sub_type = $sub_type");
        }
        if input.additional_data.is_some() {
            sets.push("additional_data = $additional_data");
        }
        sets.push("modified_by = $actor_id");
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('purchase_order', $id) SET {} WHERE is_deleted = false",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("actor_id", actor_id.to_string()));

        if let Some(sub_type) = input.sub_type {
            builder = builder.bind(("sub_type", sub_type));
        }
        if let Some(additional_data) = input.additional_data {
            builder = builder.bind(("additional_data", additional_data));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<OrderRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(DbError::not_found("order", id).into());
        }
        self.get_by_id(id).await
    }

    async fn delete(&self, id: Uuid, actor_id: Uuid) -> StocklineResult<()> {
        // NotFound for missing or already deleted orders.
        self.get_by_id(id).await?;

        let result = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 UPDATE type::record('purchase_order', $id) SET \
                     is_deleted = true, modified_by = $actor_id, updated_at = time::now(); \
                 UPDATE ordered_product SET \
                     is_deleted = true, modified_by = $actor_id, updated_at = time::now() \
                     WHERE order_id = $id; \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id.to_string()))
            .bind(("actor_id", actor_id.to_string()))
            .await
            .map_err(DbError::from)?;

        result
            .check()
            .map_err(|e| DbError::Transaction(e.to_string()))?;

        debug!(order_id = %id, "order soft-deleted");
        Ok(())
    }

    async fn list(&self, query: &QueryDescriptor) -> StocklineResult<PaginatedResult<Order>> {
        let scoped = ScopedQuery::new("purchase_order", query);
        let pagination = scoped.pagination();
        let (rows, total) = scoped.fetch::<C, OrderRow>(&self.db).await?;

        let ids = rows
            .iter()
            .map(OrderRow::id)
            .collect::<Result<Vec<_>, DbError>>()?;
        let mut lines = self
            .lines_for(ids.iter().map(Uuid::to_string).collect())
            .await?;
        let business_ids: BTreeSet<String> = rows.iter().map(|r| r.business_id.clone()).collect();
        let contacts = self.contacts_for(business_ids.into_iter().collect()).await?;

        let items = rows
            .into_iter()
            .zip(ids)
            .map(|(row, id)| row.into_order(id, lines.remove(&id).unwrap_or_default(), &contacts))
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use stockline_core::models::order::{NewOrder, NewOrderedProduct, OrderType};

    use super::*;

    #[test]
    fn guard_failures_and_store_conflicts_are_retryable() {
        let guard = commit_failure(format!(
            "The query was not executed due to a failed transaction. \
             An error occurred: {STOCK_GUARD}: 6f1c"
        ));
        assert!(matches!(guard, DbError::Conflict { .. }));

        let conflict = commit_failure(
            "Failed to commit transaction due to a read or write conflict. \
             This transaction can be retried"
                .into(),
        );
        assert!(matches!(conflict, DbError::Conflict { .. }));

        let other = commit_failure("Found 'x' for field `quantity`".into());
        assert!(matches!(other, DbError::Transaction(_)));
    }

    #[test]
    fn line_numbers_follow_submission_order() {
        let line = |quantity| NewOrderedProduct {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            quantity,
            price: Decimal::new(1050, 2),
            discount_type: None,
            discount_amount: None,
            tax_type: None,
            tax_amount: None,
            total_cost: Decimal::new(2100, 2),
        };
        let plan = OrderBatchPlan {
            tenant_id: Uuid::new_v4(),
            actor_id: Uuid::new_v4(),
            orders: vec![NewOrder {
                id: Uuid::new_v4(),
                business_id: Uuid::new_v4(),
                order_type: OrderType::Booked,
                sub_type: None,
                status: OrderStatus::New,
                additional_data: serde_json::json!({}),
                items: vec![line(2), line(5), line(1)],
            }],
            demand: Vec::new(),
        };

        let params = order_params(&plan);
        let numbers: Vec<i64> = params[0].items.iter().map(|l| l.line_no).collect();
        assert_eq!(numbers, vec![0, 1, 2]);
        assert_eq!(params[0].items[0].price, "10.50");
        assert_eq!(params[0].order_type, "Booked");
    }
}
