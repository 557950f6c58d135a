//! SurrealDB implementation of [`BusinessRepository`].
//!
//! A tenant holds at most one non-deleted wholesaler. The check runs in
//! the same transaction as the write, so two concurrent requests cannot
//! both create one.

use chrono::{DateTime, Utc};
use stockline_core::error::StocklineResult;
use stockline_core::models::business::{Business, BusinessType, CreateBusiness, UpdateBusiness};
use stockline_core::query::QueryDescriptor;
use stockline_core::repository::{BusinessRepository, PaginatedResult};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::support::{classify_failure, parse_enum, parse_opt_uuid, parse_uuid};
use crate::error::DbError;
use crate::query::ScopedQuery;

const WHOLESALER_EXISTS: &str = "wholesaler_exists";

const FAILURE_MARKERS: &[(&str, &str)] =
    &[(WHOLESALER_EXISTS, "tenant already has a wholesaler")];

#[derive(Debug, SurrealValue)]
struct BusinessRow {
    record_id: Option<String>,
    tenant_id: String,
    business_type: String,
    sub_type: Option<String>,
    name: String,
    description: Option<String>,
    address_line1: Option<String>,
    address_line2: Option<String>,
    email: Option<String>,
    phone_number: Option<String>,
    status: String,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    created_by: Option<String>,
    modified_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BusinessRow {
    fn into_business(self, id: Uuid) -> Result<Business, DbError> {
        Ok(Business {
            id,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            business_type: parse_enum(&self.business_type, "business type")?,
            sub_type: self.sub_type,
            name: self.name,
            description: self.description,
            address_line1: self.address_line1,
            address_line2: self.address_line2,
            email: self.email,
            phone_number: self.phone_number,
            status: self.status,
            start_date: self.start_date,
            end_date: self.end_date,
            created_by: parse_opt_uuid(self.created_by.as_deref(), "created_by")?,
            modified_by: parse_opt_uuid(self.modified_by.as_deref(), "modified_by")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }

    fn try_into_business(self) -> Result<Business, DbError> {
        let id = parse_uuid(self.record_id.as_deref().unwrap_or_default(), "business")?;
        self.into_business(id)
    }
}

/// SurrealDB implementation of the Business repository.
#[derive(Clone)]
pub struct SurrealBusinessRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealBusinessRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> BusinessRepository for SurrealBusinessRepository<C> {
    async fn create(&self, input: CreateBusiness, actor_id: Uuid) -> StocklineResult<Business> {
        let id = Uuid::new_v4();

        let result = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 LET $existing = (SELECT VALUE id FROM business \
                     WHERE tenant_id = $tenant_id AND business_type = 'WHOLESALER' \
                     AND is_deleted = false); \
                 IF $business_type = 'WHOLESALER' AND array::len($existing) > 0 { \
                     THROW 'wholesaler_exists'; \
                 }; \
                 CREATE type::record('business', $id) SET \
                     tenant_id = $tenant_id, business_type = $business_type, \
                     sub_type = $sub_type, name = $name, description = $description, \
                     address_line1 = $address_line1, address_line2 = $address_line2, \
                     email = $email, phone_number = $phone_number, status = $status, \
                     start_date = $start_date, end_date = $end_date, \
                     created_by = $actor_id, modified_by = $actor_id; \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("business_type", input.business_type.as_str().to_string()))
            .bind(("sub_type", input.sub_type))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .bind(("address_line1", input.address_line1))
            .bind(("address_line2", input.address_line2))
            .bind(("email", input.email))
            .bind(("phone_number", input.phone_number))
            .bind(("status", input.status.unwrap_or_else(|| "Active".into())))
            .bind(("start_date", input.start_date))
            .bind(("end_date", input.end_date))
            .bind(("actor_id", actor_id.to_string()))
            .await
            .map_err(DbError::from)?;

        result
            .check()
            .map_err(|e| classify_failure(e.to_string(), FAILURE_MARKERS, DbError::Query))?;

        debug!(business_id = %id, tenant_id = %input.tenant_id, "business created");
        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> StocklineResult<Business> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM type::record('business', $id) \
                 WHERE is_deleted = false",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<BusinessRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("business", &id_str))?;

        Ok(row.into_business(id)?)
    }

    async fn update(
        &self,
        id: Uuid,
        input: UpdateBusiness,
        actor_id: Uuid,
    ) -> StocklineResult<Business> {
        let mut sets = Vec::new();
        if input.business_type.is_some() {
            sets.push("business_type = $business_type");
        }
        if input.sub_type.is_some() {
            sets.push("sub_type = $sub_type");
        }
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        if input.address_line1.is_some() {
            sets.push("address_line1 = $address_line1");
        }
        if input.address_line2.is_some() {
            sets.push("address_line2 = $address_line2");
        }
        if input.email.is_some() {
            sets.push("email = $email");
        }
        if input.phone_number.is_some() {
            sets.push("phone_number = $phone_number");
        }
        if input.status.is_some() {
            sets.push("status = $status");
        }
        if input.start_date.is_some() {
            sets.push("start_date = $start_date");
        }
        if input.end_date.is_some() {
            sets.push("end_date = $end_date");
        }
        sets.push("modified_by = $actor_id");
        sets.push("updated_at = time::now()");

        // Retyping to wholesaler must not create a second one.
        let guard = if input.business_type == Some(BusinessType::Wholesaler) {
            "LET $tenant = type::record('business', $id).tenant_id; \
             LET $existing = (SELECT VALUE id FROM business \
                 WHERE tenant_id = $tenant AND business_type = 'WHOLESALER' \
                 AND is_deleted = false AND meta::id(id) != $id); \
             IF array::len($existing) > 0 { THROW 'wholesaler_exists'; };"
        } else {
            ""
        };

        let query = format!(
            "BEGIN TRANSACTION; {guard} \
             UPDATE type::record('business', $id) SET {} WHERE is_deleted = false; \
             COMMIT TRANSACTION;",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("actor_id", actor_id.to_string()));

        if let Some(business_type) = input.business_type {
            builder = builder.bind(("business_type", business_type.as_str().to_string()));
        }
        if let Some(sub_type) = input.sub_type {
            builder = builder.bind(("sub_type", sub_type));
        }
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }
        if let Some(address_line1) = input.address_line1 {
            builder = builder.bind(("address_line1", address_line1));
        }
        if let Some(address_line2) = input.address_line2 {
            builder = builder.bind(("address_line2", address_line2));
        }
        if let Some(email) = input.email {
            builder = builder.bind(("email", email));
        }
        if let Some(phone_number) = input.phone_number {
            builder = builder.bind(("phone_number", phone_number));
        }
        if let Some(status) = input.status {
            builder = builder.bind(("status", status));
        }
        if let Some(start_date) = input.start_date {
            builder = builder.bind(("start_date", start_date));
        }
        if let Some(end_date) = input.end_date {
            builder = builder.bind(("end_date", end_date));
        }

        let result = builder.await.map_err(DbError::from)?;
        result
            .check()
            .map_err(|e| classify_failure(e.to_string(), FAILURE_MARKERS, DbError::Query))?;

        self.get_by_id(id).await
    }

    async fn delete(&self, id: Uuid, actor_id: Uuid) -> StocklineResult<()> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "UPDATE type::record('business', $id) SET \
                 is_deleted = true, modified_by = $actor_id, updated_at = time::now() \
                 WHERE is_deleted = false",
            )
            .bind(("id", id_str.clone()))
            .bind(("actor_id", actor_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<BusinessRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(DbError::not_found("business", id_str).into());
        }
        debug!(business_id = %id, "business soft-deleted");
        Ok(())
    }

    async fn list(&self, query: &QueryDescriptor) -> StocklineResult<PaginatedResult<Business>> {
        let scoped = ScopedQuery::new("business", query);
        let pagination = scoped.pagination();
        let (rows, total) = scoped.fetch::<C, BusinessRow>(&self.db).await?;

        let items = rows
            .into_iter()
            .map(BusinessRow::try_into_business)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
