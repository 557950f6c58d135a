//! SurrealDB implementation of [`TenantRepository`].

use chrono::{DateTime, Utc};
use stockline_core::error::StocklineResult;
use stockline_core::models::tenant::{CreateTenant, Tenant, UpdateTenant};
use stockline_core::query::QueryDescriptor;
use stockline_core::repository::{PaginatedResult, TenantRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::support::{parse_opt_uuid, parse_uuid};
use crate::error::DbError;
use crate::query::ScopedQuery;

const SELECT_BY_ID: &str = "SELECT meta::id(id) AS record_id, * FROM type::record('tenant', $id) \
                            WHERE is_deleted = false";

#[derive(Debug, SurrealValue)]
struct TenantRow {
    /// Present when selected via `meta::id(id)`.
    record_id: Option<String>,
    name: String,
    description: Option<String>,
    status: String,
    tenant_type: Option<String>,
    sub_type: Option<String>,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    additional_data: serde_json::Value,
    created_by: Option<String>,
    modified_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TenantRow {
    fn into_tenant(self, id: Uuid) -> Result<Tenant, DbError> {
        Ok(Tenant {
            id,
            name: self.name,
            description: self.description,
            status: self.status,
            tenant_type: self.tenant_type,
            sub_type: self.sub_type,
            start_date: self.start_date,
            end_date: self.end_date,
            additional_data: self.additional_data,
            created_by: parse_opt_uuid(self.created_by.as_deref(), "created_by")?,
            modified_by: parse_opt_uuid(self.modified_by.as_deref(), "modified_by")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }

    fn try_into_tenant(self) -> Result<Tenant, DbError> {
        let id = parse_uuid(self.record_id.as_deref().unwrap_or_default(), "tenant")?;
        self.into_tenant(id)
    }
}

/// SurrealDB implementation of the Tenant repository.
#[derive(Clone)]
pub struct SurrealTenantRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTenantRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> TenantRepository for SurrealTenantRepository<C> {
    async fn create(&self, input: CreateTenant, actor_id: Uuid) -> StocklineResult<Tenant> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let additional_data = input
            .additional_data
            .unwrap_or(serde_json::Value::Object(Default::default()));

        let result = self
            .db
            .query(
                "CREATE type::record('tenant', $id) SET \
                 name = $name, description = $description, status = $status, \
                 tenant_type = $tenant_type, sub_type = $sub_type, \
                 start_date = $start_date, end_date = $end_date, \
                 additional_data = $additional_data, \
                 created_by = $actor_id, modified_by = $actor_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .bind(("status", input.status.unwrap_or_else(|| "Active".into())))
            .bind(("tenant_type", input.tenant_type))
            .bind(("sub_type", input.sub_type))
            .bind(("start_date", input.start_date))
            .bind(("end_date", input.end_date))
            .bind(("additional_data", additional_data))
            .bind(("actor_id", actor_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("tenant", &id_str))?;

        debug!(tenant_id = %id, "tenant created");
        Ok(row.into_tenant(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> StocklineResult<Tenant> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(SELECT_BY_ID)
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("tenant", &id_str))?;

        Ok(row.into_tenant(id)?)
    }

    async fn update(
        &self,
        id: Uuid,
        input: UpdateTenant,
        actor_id: Uuid,
    ) -> StocklineResult<Tenant> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        if input.status.is_some() {
            sets.push("status = $status");
        }
        if input.tenant_type.is_some() {
            sets.push("tenant_type = $tenant_type");
        }
        if input.sub_type.is_some() {
            sets.push("sub_type = $sub_type");
        }
        if input.start_date.is_some() {
            sets.push("start_date = $start_date");
        }
        if input.end_date.is_some() {
            sets.push("end_date = $end_date");
        }
        if input.additional_data.is_some() {
            sets.push("additional_data = $additional_data");
        }
        sets.push("modified_by = $actor_id");
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('tenant', $id) SET {} WHERE is_deleted = false",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id_str.clone()))
            .bind(("actor_id", actor_id.to_string()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }
        if let Some(status) = input.status {
            builder = builder.bind(("status", status));
        }
        if let Some(tenant_type) = input.tenant_type {
            builder = builder.bind(("tenant_type", tenant_type));
        }
        if let Some(sub_type) = input.sub_type {
            builder = builder.bind(("sub_type", sub_type));
        }
        if let Some(start_date) = input.start_date {
            builder = builder.bind(("start_date", start_date));
        }
        if let Some(end_date) = input.end_date {
            builder = builder.bind(("end_date", end_date));
        }
        if let Some(additional_data) = input.additional_data {
            builder = builder.bind(("additional_data", additional_data));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("tenant", &id_str))?;

        Ok(row.into_tenant(id)?)
    }

    async fn delete(&self, id: Uuid, actor_id: Uuid) -> StocklineResult<()> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "UPDATE type::record('tenant', $id) SET \
                 is_deleted = true, modified_by = $actor_id, updated_at = time::now() \
                 WHERE is_deleted = false",
            )
            .bind(("id", id_str.clone()))
            .bind(("actor_id", actor_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(DbError::not_found("tenant", id_str).into());
        }
        debug!(tenant_id = %id, "tenant soft-deleted");
        Ok(())
    }

    async fn list(&self, query: &QueryDescriptor) -> StocklineResult<PaginatedResult<Tenant>> {
        let scoped = ScopedQuery::new("tenant", query);
        let pagination = scoped.pagination();
        let (rows, total) = scoped.fetch::<C, TenantRow>(&self.db).await?;

        let items = rows
            .into_iter()
            .map(TenantRow::try_into_tenant)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
