use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{new_id, require_non_blank, Location, OrderStatus};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub menu_item_id: String,
    pub menu_item_name: String,
    pub quantity: i64,
    pub unit_price: f64,
    #[serde(default)]
    pub special_instructions: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub customer_id: String,
    pub catering_firm_id: String,
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub delivery_address: String,
    pub delivery_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub estimated_delivery_time: Option<DateTime<Utc>>,
}

impl Order {
    /// Sum of `quantity * unit_price` over all lines.
    pub fn items_subtotal(&self) -> f64 {
        self.items
            .iter()
            .map(|i| i.quantity as f64 * i.unit_price)
            .sum()
    }
}

// ── Request payloads ─────────────────────────────────────────────────────────

/// A blank `catering_firm_id` asks the agent to route the order.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderPayload {
    pub customer_id: String,
    #[serde(default)]
    pub catering_firm_id: String,
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    pub delivery_address: String,
    #[serde(default)]
    pub delivery_notes: Option<String>,
    #[serde(default)]
    pub estimated_delivery_time: Option<DateTime<Utc>>,
}

impl OrderPayload {
    /// Shape checks only. Business rules (empty basket, amount, address) belong to the agent.
    pub fn validate(&self) -> AppResult<()> {
        require_non_blank("customer_id", &self.customer_id)?;
        if !self.total_amount.is_finite() {
            return Err(AppError::Validation("total_amount must be a number".to_string()));
        }
        for item in &self.items {
            require_non_blank("menu_item_id", &item.menu_item_id)?;
            if item.quantity <= 0 {
                return Err(AppError::Validation(format!(
                    "quantity for '{}' must be > 0",
                    item.menu_item_name
                )));
            }
            if !item.unit_price.is_finite() || item.unit_price < 0.0 {
                return Err(AppError::Validation(format!(
                    "unit_price for '{}' must be >= 0",
                    item.menu_item_name
                )));
            }
        }
        Ok(())
    }

    pub fn into_order(self, now: DateTime<Utc>) -> Order {
        Order {
            id: new_id(),
            customer_id: self.customer_id,
            catering_firm_id: self.catering_firm_id.trim().to_string(),
            items: self.items,
            total_amount: self.total_amount,
            status: OrderStatus::Pending,
            delivery_address: self.delivery_address,
            delivery_notes: self.delivery_notes,
            created_at: now,
            updated_at: now,
            estimated_delivery_time: self.estimated_delivery_time,
        }
    }
}

// ── Query parameters ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct OrderFilters {
    pub customer_id: Option<String>,
    pub status: Option<OrderStatus>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct OrderStatusParams {
    pub status: OrderStatus,
}

/// Status report posted back by the order workflow.
#[derive(Debug, Deserialize)]
pub struct WorkflowCallback {
    pub order_id: String,
    pub status: OrderStatus,
}

// ── Tracking ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct OrderEvent {
    pub timestamp: DateTime<Utc>,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderTracking {
    pub order_id: String,
    pub status: OrderStatus,
    pub current_location: Option<Location>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub updates: Vec<OrderEvent>,
}
