//! Product (catalogue + stock) domain model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

string_enum! {
    DiscountType {
        Fixed => "Fixed",
        Percentage => "Percentage",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// Catalogue code shown to users (not the primary key).
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    /// Units in stock. Never negative.
    pub quantity: i64,
    pub mrp: Decimal,
    pub discount_type: Option<DiscountType>,
    pub discount_amount: Option<Decimal>,
    pub tax_type: Option<String>,
    pub tax_amount: Option<Decimal>,
    /// Opaque image reference; storage lives outside this system.
    pub image_link: Option<String>,
    pub image_path: Option<String>,
    pub additional_data: serde_json::Value,
    pub created_by: Option<Uuid>,
    pub modified_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProduct {
    pub tenant_id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub quantity: i64,
    pub mrp: Decimal,
    pub discount_type: Option<DiscountType>,
    pub discount_amount: Option<Decimal>,
    pub tax_type: Option<String>,
    pub tax_amount: Option<Decimal>,
    pub image_link: Option<String>,
    pub image_path: Option<String>,
    pub additional_data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateProduct {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    /// Absolute stock level; use stock adjustment for relative changes.
    pub quantity: Option<i64>,
    pub mrp: Option<Decimal>,
    pub discount_type: Option<DiscountType>,
    pub discount_amount: Option<Decimal>,
    pub tax_type: Option<String>,
    pub tax_amount: Option<Decimal>,
    pub image_link: Option<String>,
    pub image_path: Option<String>,
    pub additional_data: Option<serde_json::Value>,
}
