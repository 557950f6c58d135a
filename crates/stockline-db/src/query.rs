//! Renders a [`QueryDescriptor`] into a SurrealQL count + page query.
//!
//! Column names only ever come from the static allow-lists in
//! `stockline_core::query`; every caller-supplied value is bound as a
//! parameter.

use serde_json::Value;
use stockline_core::policy::ResourceKind;
use stockline_core::query::QueryDescriptor;
use stockline_core::repository::Pagination;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use crate::error::DbError;
use crate::repository::support::CountRow;

pub(crate) struct ScopedQuery {
    table: &'static str,
    clauses: Vec<String>,
    params: Vec<(&'static str, Value)>,
    order_by: String,
    pagination: Pagination,
}

impl ScopedQuery {
    pub(crate) fn new(table: &'static str, query: &QueryDescriptor) -> Self {
        let resource = query.resource;
        let mut clauses = vec!["is_deleted = false".to_string()];
        let mut params: Vec<(&'static str, Value)> = Vec::new();

        if let Some(tenant_id) = query.scope.tenant_id {
            let column = resource.tenant_column().unwrap_or("meta::id(id)");
            clauses.push(format!("{column} = $scope_tenant"));
            params.push(("scope_tenant", Value::String(tenant_id.to_string())));
        }

        if let Some(business_id) = query.scope.business_id {
            let column = match resource {
                ResourceKind::Business => Some("meta::id(id)"),
                other => other.business_column(),
            };
            if let Some(column) = column {
                clauses.push(format!("{column} = $scope_business"));
                params.push(("scope_business", Value::String(business_id.to_string())));
            }
        }

        if let Some(types) = query.visible_business_types {
            clauses.push(
                "business_id IN (SELECT VALUE meta::id(id) FROM business \
                 WHERE business_type IN $visible_types AND is_deleted = false)"
                    .to_string(),
            );
            params.push((
                "visible_types",
                Value::Array(types.iter().map(|t| Value::from(t.as_str())).collect()),
            ));
        }

        if let Some(business_type) = query.business_type {
            clauses.push("business_type = $business_type".to_string());
            params.push(("business_type", Value::from(business_type.as_str())));
        }

        if let Some(order_type) = query.order_type {
            clauses.push("order_type = $order_type".to_string());
            params.push(("order_type", Value::from(order_type.as_str())));
        }

        if let (Some(status), Some(column)) = (&query.status, resource.status_column()) {
            clauses.push(format!("{column} = $status"));
            params.push(("status", Value::String(status.clone())));
        }

        if let Some(search) = &query.search {
            let matches: Vec<String> = resource
                .search_columns()
                .iter()
                .map(|c| format!("string::contains(string::lowercase({c} ?? ''), $search)"))
                .collect();
            if !matches.is_empty() {
                clauses.push(format!("({})", matches.join(" OR ")));
                params.push(("search", Value::String(search.clone())));
            }
        }

        let date_column = resource.date_column();
        if let Some(from) = query.from {
            clauses.push(format!("{date_column} >= <datetime>$date_from"));
            params.push(("date_from", Value::String(from.to_rfc3339())));
        }
        if let Some(before) = query.before {
            clauses.push(format!("{date_column} < <datetime>$date_before"));
            params.push(("date_before", Value::String(before.to_rfc3339())));
        }

        Self {
            table,
            clauses,
            params,
            order_by: format!(
                "{} {}, id ASC",
                query.sort.column,
                query.sort.direction.keyword()
            ),
            pagination: query.pagination,
        }
    }

    fn where_clause(&self) -> String {
        self.clauses.join(" AND ")
    }

    pub(crate) fn count_sql(&self) -> String {
        format!(
            "SELECT count() AS total FROM {} WHERE {} GROUP ALL",
            self.table,
            self.where_clause()
        )
    }

    pub(crate) fn page_sql(&self) -> String {
        format!(
            "SELECT meta::id(id) AS record_id, * FROM {} WHERE {} \
             ORDER BY {} LIMIT $limit START $offset",
            self.table,
            self.where_clause(),
            self.order_by
        )
    }

    /// Run the count and page statements in one round trip.
    pub(crate) async fn fetch<C, R>(self, db: &Surreal<C>) -> Result<(Vec<R>, u64), DbError>
    where
        C: Connection,
        R: SurrealValue,
    {
        let sql = format!("{}; {};", self.count_sql(), self.page_sql());
        let mut builder = db
            .query(sql)
            .bind(("limit", self.pagination.limit))
            .bind(("offset", self.pagination.offset));
        for (name, value) in self.params {
            builder = builder.bind((name, value));
        }

        let result = builder.await?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let count_rows: Vec<CountRow> = result.take(0)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);
        let rows: Vec<R> = result.take(1)?;
        Ok((rows, total))
    }

    pub(crate) fn pagination(&self) -> Pagination {
        self.pagination
    }
}
