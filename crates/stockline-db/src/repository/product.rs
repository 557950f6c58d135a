//! SurrealDB implementation of [`ProductRepository`].
//!
//! Stock only moves through guarded updates: the `WHERE` clause of every
//! decrement re-checks the available quantity, so stock never goes
//! negative even under concurrent writers.

use chrono::{DateTime, Utc};
use stockline_core::error::{StocklineError, StocklineResult};
use stockline_core::models::product::{CreateProduct, Product, UpdateProduct};
use stockline_core::policy::{RecordScope, Target};
use stockline_core::query::QueryDescriptor;
use stockline_core::repository::{PaginatedResult, ProductRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::support::{
    opt_string, parse_decimal, parse_enum, parse_opt_decimal, parse_opt_uuid, parse_uuid,
};
use crate::error::DbError;
use crate::query::ScopedQuery;

#[derive(Debug, SurrealValue)]
struct ProductRow {
    record_id: Option<String>,
    tenant_id: String,
    code: String,
    name: String,
    description: Option<String>,
    quantity: i64,
    mrp: String,
    discount_type: Option<String>,
    discount_amount: Option<String>,
    tax_type: Option<String>,
    tax_amount: Option<String>,
    image_link: Option<String>,
    image_path: Option<String>,
    additional_data: serde_json::Value,
    created_by: Option<String>,
    modified_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_product(self, id: Uuid) -> Result<Product, DbError> {
        Ok(Product {
            id,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            code: self.code,
            name: self.name,
            description: self.description,
            quantity: self.quantity,
            mrp: parse_decimal(&self.mrp, "mrp")?,
            discount_type: self
                .discount_type
                .as_deref()
                .map(|d| parse_enum(d, "discount type"))
                .transpose()?,
            discount_amount: parse_opt_decimal(self.discount_amount.as_deref(), "discount")?,
            tax_type: self.tax_type,
            tax_amount: parse_opt_decimal(self.tax_amount.as_deref(), "tax")?,
            image_link: self.image_link,
            image_path: self.image_path,
            additional_data: self.additional_data,
            created_by: parse_opt_uuid(self.created_by.as_deref(), "created_by")?,
            modified_by: parse_opt_uuid(self.modified_by.as_deref(), "modified_by")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }

    fn try_into_product(self) -> Result<Product, DbError> {
        let id = parse_uuid(self.record_id.as_deref().unwrap_or_default(), "product")?;
        self.into_product(id)
    }
}

/// SurrealDB implementation of the Product repository.
#[derive(Clone)]
pub struct SurrealProductRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealProductRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ProductRepository for SurrealProductRepository<C> {
    async fn create(&self, input: CreateProduct, actor_id: Uuid) -> StocklineResult<Product> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let additional_data = input
            .additional_data
            .unwrap_or(serde_json::Value::Object(Default::default()));

        let result = self
            .db
            .query(
                "CREATE type::record('product', $id) SET \
                 tenant_id = $tenant_id, code = $code, name = $name, \
                 description = $description, quantity = $quantity, mrp = $mrp, \
                 discount_type = $discount_type, discount_amount = $discount_amount, \
                 tax_type = $tax_type, tax_amount = $tax_amount, \
                 image_link = $image_link, image_path = $image_path, \
                 additional_data = $additional_data, \
                 created_by = $actor_id, modified_by = $actor_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("code", input.code))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .bind(("quantity", input.quantity))
            .bind(("mrp", input.mrp.to_string()))
            .bind(("discount_type", opt_string(input.discount_type)))
            .bind(("discount_amount", opt_string(input.discount_amount)))
            .bind(("tax_type", input.tax_type))
            .bind(("tax_amount", opt_string(input.tax_amount)))
            .bind(("image_link", input.image_link))
            .bind(("image_path", input.image_path))
            .bind(("additional_data", additional_data))
            .bind(("actor_id", actor_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<ProductRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("product", &id_str))?;

        debug!(product_id = %id, "product created");
        Ok(row.into_product(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> StocklineResult<Product> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM type::record('product', $id) \
                 WHERE is_deleted = false",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProductRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("product", &id_str))?;

        Ok(row.into_product(id)?)
    }

    async fn get_many(&self, tenant_id: Uuid, ids: &[Uuid]) -> StocklineResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = ids.iter().map(Uuid::to_string).collect();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM product \
                 WHERE meta::id(id) IN $ids AND tenant_id = $tenant_id \
                 AND is_deleted = false",
            )
            .bind(("ids", ids))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProductRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(ProductRow::try_into_product)
            .collect::<Result<Vec<_>, DbError>>()?)
    }

    async fn update(
        &self,
        id: Uuid,
        input: UpdateProduct,
        actor_id: Uuid,
    ) -> StocklineResult<Product> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.code.is_some() {
            sets.push("code = $code");
        }
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        if input.quantity.is_some() {
            sets.push("quantity = $quantity");
        }
        if input.mrp.is_some() {
            sets.push("mrp = $mrp");
        }
        if input.discount_type.is_some() {
            sets.push("discount_type = $discount_type");
        }
        if input.discount_amount.is_some() {
            sets.push("discount_amount = $discount_amount");
        }
        if input.tax_type.is_some() {
            sets.push("tax_type = $tax_type");
        }
        if input.tax_amount.is_some() {
            sets.push("tax_amount = $tax_amount");
        }
        if input.image_link.is_some() {
            sets.push("image_link = $image_link");
        }
        if input.image_path.is_some() {
            sets.push("image_path = $image_path");
        }
        if input.additional_data.is_some() {
            sets.push("additional_data = $additional_data");
        }
        sets.push("modified_by = $actor_id");
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('product', $id) SET {} WHERE is_deleted = false",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id_str.clone()))
            .bind(("actor_id", actor_id.to_string()));

        if let Some(code) = input.code {
            builder = builder.bind(("code", code));
        }
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }
        if let Some(quantity) = input.quantity {
            builder = builder.bind(("quantity", quantity));
        }
        if let Some(mrp) = input.mrp {
            builder = builder.bind(("mrp", mrp.to_string()));
        }
        if let Some(discount_type) = input.discount_type {
            builder = builder.bind(("discount_type", discount_type.as_str().to_string()));
        }
        if let Some(discount_amount) = input.discount_amount {
            builder = builder.bind(("discount_amount", discount_amount.to_string()));
        }
        if let Some(tax_type) = input.tax_type {
            builder = builder.bind(("tax_type", tax_type));
        }
        if let Some(tax_amount) = input.tax_amount {
            builder = builder.bind(("tax_amount", tax_amount.to_string()));
        }
        if let Some(image_link) = input.image_link {
            builder = builder.bind(("image_link", image_link));
        }
        if let Some(image_path) = input.image_path {
            builder = builder.bind(("image_path", image_path));
        }
        if let Some(additional_data) = input.additional_data {
            builder = builder.bind(("additional_data", additional_data));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<ProductRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("product", &id_str))?;

        Ok(row.into_product(id)?)
    }

    async fn adjust_quantity(
        &self,
        scope: RecordScope,
        id: Uuid,
        delta: i64,
        actor_id: Uuid,
    ) -> StocklineResult<Product> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "UPDATE type::record('product', $id) SET \
                 quantity += $delta, modified_by = $actor_id, updated_at = time::now() \
                 WHERE is_deleted = false AND quantity + $delta >= 0 \
                 AND ($scope_tenant = NONE OR tenant_id = $scope_tenant)",
            )
            .bind(("id", id_str.clone()))
            .bind(("delta", delta))
            .bind(("actor_id", actor_id.to_string()))
            .bind(("scope_tenant", scope.tenant_id.map(|t| t.to_string())))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProductRow> = result.take(0).map_err(DbError::from)?;
        if let Some(row) = rows.into_iter().next() {
            let product = row.into_product(id)?;
            debug!(product_id = %id, delta, quantity = product.quantity, "stock adjusted");
            return Ok(product);
        }

        // Nothing matched: either the product is invisible or the guard held.
        let current = self.get_by_id(id).await?;
        if !scope.covers(Target::tenant(current.tenant_id)) {
            return Err(DbError::not_found("product", id_str).into());
        }
        Err(StocklineError::InsufficientStock {
            product_id: id,
            requested: delta.saturating_neg(),
            available: current.quantity,
        })
    }

    async fn delete(&self, id: Uuid, actor_id: Uuid) -> StocklineResult<()> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "UPDATE type::record('product', $id) SET \
                 is_deleted = true, modified_by = $actor_id, updated_at = time::now() \
                 WHERE is_deleted = false",
            )
            .bind(("id", id_str.clone()))
            .bind(("actor_id", actor_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProductRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(DbError::not_found("product", id_str).into());
        }
        debug!(product_id = %id, "product soft-deleted");
        Ok(())
    }

    async fn list(&self, query: &QueryDescriptor) -> StocklineResult<PaginatedResult<Product>> {
        let scoped = ScopedQuery::new("product", query);
        let pagination = scoped.pagination();
        let (rows, total) = scoped.fetch::<C, ProductRow>(&self.db).await?;

        let items = rows
            .into_iter()
            .map(ProductRow::try_into_product)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
