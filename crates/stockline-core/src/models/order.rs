//! Order domain model and the order status state machine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::product::DiscountType;
use crate::error::{StocklineError, StocklineResult};

string_enum! {
    /// Booked orders commit stock at creation; Requested orders only
    /// record demand.
    OrderType {
        Booked => "Booked",
        Requested => "Requested",
    }
}

string_enum! {
    OrderStatus {
        New => "New",
        InProgress => "InProgress",
        Done => "Done",
        Cancelled => "Cancelled",
    }
}

impl OrderStatus {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Cancelled)
    }

    /// `New -> InProgress -> Done`, and `New | InProgress -> Cancelled`.
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::New, Self::InProgress)
                | (Self::InProgress, Self::Done)
                | (Self::New | Self::InProgress, Self::Cancelled)
        )
    }

    pub fn transition(self, next: Self) -> StocklineResult<Self> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(StocklineError::validation(format!(
                "illegal order status transition {self} -> {next}"
            )))
        }
    }
}

/// A persisted line item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderedProduct {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
    pub price: Decimal,
    pub discount_type: Option<DiscountType>,
    pub discount_amount: Option<Decimal>,
    pub tax_type: Option<String>,
    pub tax_amount: Option<Decimal>,
    pub total_cost: Decimal,
    pub created_by: Uuid,
    pub modified_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub business_id: Uuid,
    pub order_type: OrderType,
    pub sub_type: Option<String>,
    pub status: OrderStatus,
    pub order_date_time: DateTime<Utc>,
    pub additional_data: serde_json::Value,
    pub items: Vec<OrderedProduct>,
    /// Contact details of the ordering business, read at fetch time.
    pub dealer_name: Option<String>,
    pub dealer_email: Option<String>,
    pub dealer_phone: Option<String>,
    pub created_by: Uuid,
    pub modified_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line item as submitted by the caller. Monetary fields are persisted
/// exactly as given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemInput {
    pub product_id: Uuid,
    pub quantity: i64,
    pub price: Decimal,
    pub discount_type: Option<DiscountType>,
    pub discount_amount: Option<Decimal>,
    pub tax_type: Option<String>,
    pub tax_amount: Option<Decimal>,
    pub total_cost: Decimal,
}

/// One order of a create batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSubmission {
    /// Honored only for cross-tenant roles; everyone else books into
    /// their own tenant.
    pub tenant_id: Option<Uuid>,
    pub business_id: Uuid,
    pub order_type: OrderType,
    pub sub_type: Option<String>,
    /// Initial status, `New` when absent.
    pub status: Option<OrderStatus>,
    pub additional_data: Option<serde_json::Value>,
    pub items: Vec<LineItemInput>,
}

/// Header fields an administrator may edit after creation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateOrder {
    pub sub_type: Option<String>,
    pub additional_data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderBatchResult {
    pub booked_order: Option<Order>,
    pub requested_order: Option<Order>,
}

// ---------------------------------------------------------------------------
// Commit plan handed to the store
// ---------------------------------------------------------------------------

/// Units of one product a batch takes out of stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockDemand {
    pub product_id: Uuid,
    pub quantity: i64,
}

#[derive(Debug, Clone)]
pub struct NewOrderedProduct {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
    pub price: Decimal,
    pub discount_type: Option<DiscountType>,
    pub discount_amount: Option<Decimal>,
    pub tax_type: Option<String>,
    pub tax_amount: Option<Decimal>,
    pub total_cost: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: Uuid,
    pub business_id: Uuid,
    pub order_type: OrderType,
    pub sub_type: Option<String>,
    pub status: OrderStatus,
    pub additional_data: serde_json::Value,
    pub items: Vec<NewOrderedProduct>,
}

/// Everything a single store transaction writes for one batch.
///
/// The store must apply every stock decrement in `demand` only while
/// the product still holds at least that many units, and must write
/// nothing at all if any decrement is refused.
#[derive(Debug, Clone)]
pub struct OrderBatchPlan {
    pub tenant_id: Uuid,
    pub actor_id: Uuid,
    pub orders: Vec<NewOrder>,
    pub demand: Vec<StockDemand>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions() {
        assert!(OrderStatus::New.can_transition_to(OrderStatus::InProgress));
        assert!(OrderStatus::InProgress.can_transition_to(OrderStatus::Done));
        assert!(OrderStatus::New.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::InProgress.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn skipping_and_backwards_are_rejected() {
        assert!(!OrderStatus::New.can_transition_to(OrderStatus::Done));
        assert!(!OrderStatus::InProgress.can_transition_to(OrderStatus::New));
        assert!(!OrderStatus::New.can_transition_to(OrderStatus::New));
    }

    #[test]
    fn terminal_states_accept_nothing() {
        for terminal in [OrderStatus::Done, OrderStatus::Cancelled] {
            assert!(terminal.is_terminal());
            for next in OrderStatus::ALL {
                assert!(!terminal.can_transition_to(*next));
            }
        }
    }

    #[test]
    fn transition_reports_illegal_moves() {
        let err = OrderStatus::Done
            .transition(OrderStatus::InProgress)
            .unwrap_err();
        assert!(matches!(err, StocklineError::Validation { .. }));
        assert_eq!(
            OrderStatus::New.transition(OrderStatus::InProgress).unwrap(),
            OrderStatus::InProgress
        );
    }
}
