use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::parse_column;
use crate::error::{AppError, AppResult};
use crate::models::{Payment, PaymentStatus};

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: String,
    order_id: String,
    amount: f64,
    payment_method: String,
    status: String,
    transaction_id: Option<String>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    refund_amount: Option<f64>,
    refunded_at: Option<DateTime<Utc>>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = AppError;

    fn try_from(row: PaymentRow) -> AppResult<Self> {
        Ok(Payment {
            id: row.id,
            order_id: row.order_id,
            amount: row.amount,
            payment_method: row.payment_method,
            status: parse_column(&row.status)?,
            transaction_id: row.transaction_id,
            created_at: row.created_at,
            completed_at: row.completed_at,
            refund_amount: row.refund_amount,
            refunded_at: row.refunded_at,
        })
    }
}

const COLUMNS: &str = "id, order_id, amount, payment_method, status, transaction_id, \
     created_at, completed_at, refund_amount, refunded_at";

pub async fn insert_payment(pool: &SqlitePool, payment: &Payment) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO payments
            (id, order_id, amount, payment_method, status, transaction_id,
             created_at, completed_at, refund_amount, refunded_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.order_id)
    .bind(payment.amount)
    .bind(&payment.payment_method)
    .bind(payment.status.as_str())
    .bind(&payment.transaction_id)
    .bind(payment.created_at)
    .bind(payment.completed_at)
    .bind(payment.refund_amount)
    .bind(payment.refunded_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn fetch_payment(pool: &SqlitePool, id: &str) -> AppResult<Payment> {
    sqlx::query_as::<_, PaymentRow>(&format!("SELECT {COLUMNS} FROM payments WHERE id = ?1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?
        .try_into()
}

pub async fn list_payments_for_order(pool: &SqlitePool, order_id: &str) -> AppResult<Vec<Payment>> {
    let rows = sqlx::query_as::<_, PaymentRow>(&format!(
        "SELECT {COLUMNS} FROM payments WHERE order_id = ?1 ORDER BY created_at ASC"
    ))
    .bind(order_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Payment::try_from).collect()
}

/// Marks a completed payment as refunded. The status guard makes concurrent refunds lose.
pub async fn record_refund(
    pool: &SqlitePool,
    id: &str,
    amount: f64,
    now: DateTime<Utc>,
) -> AppResult<Payment> {
    let result = sqlx::query(
        r#"
        UPDATE payments
        SET status = ?1, refund_amount = ?2, refunded_at = ?3
        WHERE id = ?4 AND status = ?5
        "#,
    )
    .bind(PaymentStatus::Refunded.as_str())
    .bind(amount)
    .bind(now)
    .bind(id)
    .bind(PaymentStatus::Completed.as_str())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        // Distinguish "no such payment" from "not refundable".
        let current = fetch_payment(pool, id).await?;
        return Err(AppError::Conflict(format!(
            "Payment is {} and cannot be refunded",
            current.status
        )));
    }
    fetch_payment(pool, id).await
}
