//! Business domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

string_enum! {
    /// A tenant has one wholesaler and any number of dealers buying from it.
    BusinessType {
        Wholesaler => "WHOLESALER",
        Dealer => "DEALER",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub business_type: BusinessType,
    pub sub_type: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: String,
    pub created_by: Option<Uuid>,
    pub modified_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBusiness {
    pub tenant_id: Uuid,
    pub business_type: BusinessType,
    pub sub_type: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// Defaults to `Active`.
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateBusiness {
    pub business_type: Option<BusinessType>,
    pub sub_type: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_type_parses_case_insensitively() {
        assert_eq!("dealer".parse::<BusinessType>().unwrap(), BusinessType::Dealer);
        assert_eq!(
            " WHOLESALER ".parse::<BusinessType>().unwrap(),
            BusinessType::Wholesaler
        );
        assert!("RETAILER".parse::<BusinessType>().is_err());
    }

    #[test]
    fn business_type_serializes_uppercase() {
        let json = serde_json::to_string(&BusinessType::Wholesaler).unwrap();
        assert_eq!(json, "\"WHOLESALER\"");
    }
}
