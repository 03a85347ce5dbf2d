use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::{page_limit, parse_column};
use crate::error::{AppError, AppResult};
use crate::models::{Order, OrderEvent, OrderItem, OrderStatus};

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    customer_id: String,
    catering_firm_id: String,
    total_amount: f64,
    status: String,
    delivery_address: String,
    delivery_notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    estimated_delivery_time: Option<DateTime<Utc>>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> AppResult<Order> {
        Ok(Order {
            id: self.id,
            customer_id: self.customer_id,
            catering_firm_id: self.catering_firm_id,
            items,
            total_amount: self.total_amount,
            status: parse_column(&self.status)?,
            delivery_address: self.delivery_address,
            delivery_notes: self.delivery_notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
            estimated_delivery_time: self.estimated_delivery_time,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    menu_item_id: String,
    menu_item_name: String,
    quantity: i64,
    unit_price: f64,
    special_instructions: Option<String>,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        OrderItem {
            menu_item_id: row.menu_item_id,
            menu_item_name: row.menu_item_name,
            quantity: row.quantity,
            unit_price: row.unit_price,
            special_instructions: row.special_instructions,
        }
    }
}

const ORDER_COLUMNS: &str = "id, customer_id, catering_firm_id, total_amount, status, \
     delivery_address, delivery_notes, created_at, updated_at, estimated_delivery_time";

fn not_found() -> AppError {
    AppError::NotFound("Order not found".to_string())
}

/// Narrowing for order listings; every field is optional.
#[derive(Debug, Default)]
pub struct OrderQuery<'a> {
    pub customer_id: Option<&'a str>,
    pub catering_firm_id: Option<&'a str>,
    pub status: Option<OrderStatus>,
    pub limit: Option<i64>,
}

/// Persists the order, its lines and the initial status event atomically.
pub async fn insert_order(pool: &SqlitePool, order: &Order) -> AppResult<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO orders
            (id, customer_id, catering_firm_id, total_amount, status, delivery_address,
             delivery_notes, created_at, updated_at, estimated_delivery_time)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&order.id)
    .bind(&order.customer_id)
    .bind(&order.catering_firm_id)
    .bind(order.total_amount)
    .bind(order.status.as_str())
    .bind(&order.delivery_address)
    .bind(&order.delivery_notes)
    .bind(order.created_at)
    .bind(order.updated_at)
    .bind(order.estimated_delivery_time)
    .execute(&mut *tx)
    .await?;

    for (position, item) in order.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO order_items
                (order_id, position, menu_item_id, menu_item_name, quantity, unit_price, special_instructions)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&order.id)
        .bind(position as i64)
        .bind(&item.menu_item_id)
        .bind(&item.menu_item_name)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(&item.special_instructions)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("INSERT INTO order_events (order_id, status, occurred_at) VALUES (?1, ?2, ?3)")
        .bind(&order.id)
        .bind(order.status.as_str())
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

async fn fetch_items(pool: &SqlitePool, order_id: &str) -> AppResult<Vec<OrderItem>> {
    let rows = sqlx::query_as::<_, OrderItemRow>(
        r#"
        SELECT menu_item_id, menu_item_name, quantity, unit_price, special_instructions
        FROM order_items
        WHERE order_id = ?1
        ORDER BY position
        "#,
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(OrderItem::from).collect())
}

pub async fn fetch_order(pool: &SqlitePool, id: &str) -> AppResult<Order> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(not_found)?;

    let items = fetch_items(pool, &row.id).await?;
    row.into_order(items)
}

/// Like [`fetch_order`] but absence is not an error.
pub async fn find_order(pool: &SqlitePool, id: &str) -> AppResult<Option<Order>> {
    match fetch_order(pool, id).await {
        Ok(order) => Ok(Some(order)),
        Err(AppError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

pub async fn list_orders(pool: &SqlitePool, query: &OrderQuery<'_>) -> AppResult<Vec<Order>> {
    let rows = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders
         WHERE (?1 IS NULL OR customer_id = ?1)
           AND (?2 IS NULL OR catering_firm_id = ?2)
           AND (?3 IS NULL OR status = ?3)
         ORDER BY created_at DESC
         LIMIT ?4"
    ))
    .bind(query.customer_id)
    .bind(query.catering_firm_id)
    .bind(query.status.map(|s| s.as_str()))
    .bind(page_limit(query.limit))
    .fetch_all(pool)
    .await?;

    let mut orders = Vec::with_capacity(rows.len());
    for row in rows {
        let items = fetch_items(pool, &row.id).await?;
        orders.push(row.into_order(items)?);
    }
    Ok(orders)
}

/// Moves the order to `status` and appends the change to its history.
pub async fn update_order_status(
    pool: &SqlitePool,
    id: &str,
    status: OrderStatus,
    now: DateTime<Utc>,
) -> AppResult<()> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query("UPDATE orders SET status = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(status.as_str())
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(not_found());
    }

    sqlx::query("INSERT INTO order_events (order_id, status, occurred_at) VALUES (?1, ?2, ?3)")
        .bind(id)
        .bind(status.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

pub async fn fetch_order_events(pool: &SqlitePool, order_id: &str) -> AppResult<Vec<OrderEvent>> {
    let rows: Vec<(String, DateTime<Utc>)> = sqlx::query_as(
        "SELECT status, occurred_at FROM order_events WHERE order_id = ?1 ORDER BY id",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(status, timestamp)| {
            Ok(OrderEvent {
                timestamp,
                status: parse_column(&status)?,
            })
        })
        .collect()
}
