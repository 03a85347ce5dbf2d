use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::{from_json_text_opt, parse_column, to_json_text, to_json_text_opt};
use crate::error::{AppError, AppResult};
use crate::models::{Delivery, DeliveryStatus, Location};

#[derive(Debug, sqlx::FromRow)]
struct DeliveryRow {
    id: String,
    order_id: String,
    driver_id: Option<String>,
    status: String,
    pickup_time: Option<DateTime<Utc>>,
    delivery_time: Option<DateTime<Utc>>,
    current_location: Option<String>,
    estimated_arrival: Option<DateTime<Utc>>,
    signature_blob: Option<String>,
}

impl TryFrom<DeliveryRow> for Delivery {
    type Error = AppError;

    fn try_from(row: DeliveryRow) -> AppResult<Self> {
        Ok(Delivery {
            id: row.id,
            order_id: row.order_id,
            driver_id: row.driver_id,
            status: parse_column(&row.status)?,
            pickup_time: row.pickup_time,
            delivery_time: row.delivery_time,
            current_location: from_json_text_opt(row.current_location)?,
            estimated_arrival: row.estimated_arrival,
            signature_blob: row.signature_blob,
        })
    }
}

const COLUMNS: &str = "id, order_id, driver_id, status, pickup_time, delivery_time, \
     current_location, estimated_arrival, signature_blob";

fn not_found() -> AppError {
    AppError::NotFound("Delivery not found".to_string())
}

pub async fn insert_delivery(pool: &SqlitePool, delivery: &Delivery) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO deliveries
            (id, order_id, driver_id, status, pickup_time, delivery_time,
             current_location, estimated_arrival, signature_blob, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&delivery.id)
    .bind(&delivery.order_id)
    .bind(&delivery.driver_id)
    .bind(delivery.status.as_str())
    .bind(delivery.pickup_time)
    .bind(delivery.delivery_time)
    .bind(to_json_text_opt(delivery.current_location.as_ref())?)
    .bind(delivery.estimated_arrival)
    .bind(&delivery.signature_blob)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn fetch_delivery(pool: &SqlitePool, id: &str) -> AppResult<Delivery> {
    sqlx::query_as::<_, DeliveryRow>(&format!("SELECT {COLUMNS} FROM deliveries WHERE id = ?1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(not_found)?
        .try_into()
}

/// Most recently created delivery for the order, if any.
pub async fn find_latest_for_order(pool: &SqlitePool, order_id: &str) -> AppResult<Option<Delivery>> {
    let row = sqlx::query_as::<_, DeliveryRow>(&format!(
        "SELECT {COLUMNS} FROM deliveries
         WHERE order_id = ?1
         ORDER BY created_at DESC, rowid DESC
         LIMIT 1"
    ))
    .bind(order_id)
    .fetch_optional(pool)
    .await?;

    row.map(Delivery::try_from).transpose()
}

/// Sets the status; `picked_up` stamps the pickup time and `delivered` the delivery time.
pub async fn update_delivery_status(
    pool: &SqlitePool,
    id: &str,
    status: DeliveryStatus,
    now: DateTime<Utc>,
) -> AppResult<Delivery> {
    let result = sqlx::query(
        r#"
        UPDATE deliveries
        SET status        = ?1,
            pickup_time   = CASE WHEN ?1 = ?2 THEN ?4 ELSE pickup_time END,
            delivery_time = CASE WHEN ?1 = ?3 THEN ?4 ELSE delivery_time END
        WHERE id = ?5
        "#,
    )
    .bind(status.as_str())
    .bind(DeliveryStatus::PickedUp.as_str())
    .bind(DeliveryStatus::Delivered.as_str())
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(not_found());
    }
    fetch_delivery(pool, id).await
}

pub async fn update_location(pool: &SqlitePool, id: &str, location: &Location) -> AppResult<()> {
    let result = sqlx::query("UPDATE deliveries SET current_location = ?1 WHERE id = ?2")
        .bind(to_json_text(location)?)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(not_found());
    }
    Ok(())
}

pub async fn attach_signature(pool: &SqlitePool, id: &str, blob_name: &str) -> AppResult<()> {
    sqlx::query("UPDATE deliveries SET signature_blob = ?1 WHERE id = ?2")
        .bind(blob_name)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
