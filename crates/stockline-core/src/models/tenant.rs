//! Tenant domain model.
//!
//! Tenants are the isolation boundary. Businesses, users, products and
//! orders are all scoped to exactly one tenant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::business::Business;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Free-form lifecycle status (e.g. `Active`).
    pub status: String,
    pub tenant_type: Option<String>,
    pub sub_type: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub additional_data: serde_json::Value,
    pub created_by: Option<Uuid>,
    pub modified_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A tenant together with the businesses the caller may see in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantDetail {
    #[serde(flatten)]
    pub tenant: Tenant,
    pub wholesaler: Option<Business>,
    pub dealers: Vec<Business>,
}

/// Fields required to create a new tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTenant {
    pub name: String,
    pub description: Option<String>,
    /// Defaults to `Active`.
    pub status: Option<String>,
    pub tenant_type: Option<String>,
    pub sub_type: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub additional_data: Option<serde_json::Value>,
}

/// Fields that can be updated on an existing tenant.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateTenant {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub tenant_type: Option<String>,
    pub sub_type: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub additional_data: Option<serde_json::Value>,
}
