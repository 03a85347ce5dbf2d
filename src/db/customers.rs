use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::{from_json_text_opt, page_limit, to_json_text_opt};
use crate::error::{AppError, AppResult};
use crate::models::{Customer, CustomerPayload};

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: String,
    name: String,
    email: String,
    phone: String,
    address: String,
    preferences: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = AppError;

    fn try_from(row: CustomerRow) -> AppResult<Self> {
        Ok(Customer {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            address: row.address,
            preferences: from_json_text_opt(row.preferences)?,
            created_at: row.created_at,
        })
    }
}

const COLUMNS: &str = "id, name, email, phone, address, preferences, created_at";

fn not_found() -> AppError {
    AppError::NotFound("Customer not found".to_string())
}

pub async fn insert_customer(pool: &SqlitePool, customer: &Customer) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO customers (id, name, email, phone, address, preferences, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&customer.id)
    .bind(&customer.name)
    .bind(&customer.email)
    .bind(&customer.phone)
    .bind(&customer.address)
    .bind(to_json_text_opt(customer.preferences.as_ref())?)
    .bind(customer.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn fetch_customer(pool: &SqlitePool, id: &str) -> AppResult<Customer> {
    sqlx::query_as::<_, CustomerRow>(&format!(
        "SELECT {COLUMNS} FROM customers WHERE id = ?1 AND deleted_at IS NULL"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(not_found)?
    .try_into()
}

pub async fn list_customers(pool: &SqlitePool, limit: Option<i64>) -> AppResult<Vec<Customer>> {
    let rows = sqlx::query_as::<_, CustomerRow>(&format!(
        "SELECT {COLUMNS} FROM customers
         WHERE deleted_at IS NULL
         ORDER BY created_at DESC
         LIMIT ?1"
    ))
    .bind(page_limit(limit))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Customer::try_from).collect()
}

/// Full replace of the mutable fields; `id` and `created_at` are kept.
pub async fn update_customer(
    pool: &SqlitePool,
    id: &str,
    payload: &CustomerPayload,
) -> AppResult<Customer> {
    let result = sqlx::query(
        r#"
        UPDATE customers
        SET name        = ?1,
            email       = ?2,
            phone       = ?3,
            address     = ?4,
            preferences = ?5
        WHERE id = ?6 AND deleted_at IS NULL
        "#,
    )
    .bind(&payload.name)
    .bind(&payload.email)
    .bind(&payload.phone)
    .bind(&payload.address)
    .bind(to_json_text_opt(payload.preferences.as_ref())?)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(not_found());
    }
    fetch_customer(pool, id).await
}

pub async fn soft_delete_customer(pool: &SqlitePool, id: &str, now: DateTime<Utc>) -> AppResult<()> {
    let result = sqlx::query("UPDATE customers SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL")
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(not_found());
    }
    Ok(())
}
