use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{new_id, require_non_blank, PaymentStatus};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub order_id: String,
    pub amount: f64,
    pub payment_method: String,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub refund_amount: Option<f64>,
    pub refunded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentPayload {
    pub order_id: String,
    pub amount: f64,
    pub payment_method: String,
}

impl PaymentPayload {
    pub fn validate(&self) -> AppResult<()> {
        require_non_blank("order_id", &self.order_id)?;
        require_non_blank("payment_method", &self.payment_method)?;
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(AppError::Validation(
                "amount must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn into_payment(self, now: DateTime<Utc>) -> Payment {
        Payment {
            id: new_id(),
            order_id: self.order_id,
            amount: self.amount,
            payment_method: self.payment_method,
            status: PaymentStatus::Processing,
            transaction_id: None,
            created_at: now,
            completed_at: None,
            refund_amount: None,
            refunded_at: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct RefundParams {
    /// Partial refund amount; absent means refund everything.
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    pub payment_id: String,
    pub receipt_url: String,
    pub generated_at: DateTime<Utc>,
}

impl Receipt {
    pub fn for_payment(payment_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            payment_id: payment_id.to_string(),
            receipt_url: format!("https://receipts.healthyfoods.com/{}", payment_id),
            generated_at: now,
        }
    }
}
