//! User domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{StocklineError, StocklineResult};

string_enum! {
    Role {
        SuperAdmin => "SuperAdmin",
        TechAdmin => "TechAdmin",
        SalesAdmin => "SalesAdmin",
        WholesalerAdmin => "WholesalerAdmin",
        Wholesaler => "Wholesaler",
        DealerAdmin => "DealerAdmin",
        Dealer => "Dealer",
    }
}

impl Role {
    /// SuperAdmin, TechAdmin and SalesAdmin operate across tenants and
    /// are never attached to a business.
    pub const fn is_cross_tenant(self) -> bool {
        matches!(self, Self::SuperAdmin | Self::TechAdmin | Self::SalesAdmin)
    }

    pub const fn is_wholesaler(self) -> bool {
        matches!(self, Self::WholesalerAdmin | Self::Wholesaler)
    }

    pub const fn is_dealer(self) -> bool {
        matches!(self, Self::DealerAdmin | Self::Dealer)
    }

    /// Check the role/business pairing: cross-tenant roles carry no
    /// business, every other role requires one.
    pub fn check_business(self, business_id: Option<Uuid>) -> StocklineResult<()> {
        match (self.is_cross_tenant(), business_id) {
            (true, None) | (false, Some(_)) => Ok(()),
            (true, Some(_)) => Err(StocklineError::validation(format!(
                "role {self} cannot be attached to a business"
            ))),
            (false, None) => Err(StocklineError::validation(format!(
                "role {self} requires a business"
            ))),
        }
    }
}

string_enum! {
    UserStatus {
        Active => "Active",
        Inactive => "Inactive",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// `None` for cross-tenant roles.
    pub business_id: Option<Uuid>,
    pub role: Role,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub phone_number: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub description: Option<String>,
    pub status: UserStatus,
    pub created_by: Option<Uuid>,
    pub modified_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub tenant_id: Uuid,
    pub business_id: Option<Uuid>,
    pub role: Role,
    pub username: String,
    pub email: String,
    /// Raw password (hashed with Argon2id before storage).
    pub password: String,
    pub name: String,
    pub phone_number: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateUser {
    /// `Some(Some(id))` = attach, `Some(None)` = detach, `None` = no change.
    pub business_id: Option<Option<Uuid>>,
    pub role: Option<Role>,
    pub username: Option<String>,
    pub email: Option<String>,
    /// Raw password; re-hashed when present.
    pub password: Option<String>,
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub description: Option<String>,
    pub status: Option<UserStatus>,
}
