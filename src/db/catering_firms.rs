use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::{from_json_text, from_json_text_opt, to_json_text, to_json_text_opt};
use crate::error::{AppError, AppResult};
use crate::models::{CateringFirm, CateringFirmPayload, MenuItem, OrderStatus, PopularItem};

// ── Firms ─────────────────────────────────────────────────────────────────────

#[derive(Debug, sqlx::FromRow)]
struct FirmRow {
    id: String,
    name: String,
    email: String,
    phone: String,
    address: String,
    cuisine_types: String,
    rating: f64,
    is_active: bool,
    operating_hours: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<FirmRow> for CateringFirm {
    type Error = AppError;

    fn try_from(row: FirmRow) -> AppResult<Self> {
        Ok(CateringFirm {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            address: row.address,
            cuisine_types: from_json_text(&row.cuisine_types)?,
            rating: row.rating,
            is_active: row.is_active,
            operating_hours: from_json_text_opt(row.operating_hours)?,
            menu_items: None,
            created_at: row.created_at,
        })
    }
}

const FIRM_COLUMNS: &str =
    "id, name, email, phone, address, cuisine_types, rating, is_active, operating_hours, created_at";

fn firm_not_found() -> AppError {
    AppError::NotFound("Catering firm not found".to_string())
}

pub async fn insert_firm(pool: &SqlitePool, firm: &CateringFirm) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO catering_firms
            (id, name, email, phone, address, cuisine_types, rating, is_active, operating_hours, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&firm.id)
    .bind(&firm.name)
    .bind(&firm.email)
    .bind(&firm.phone)
    .bind(&firm.address)
    .bind(to_json_text(&firm.cuisine_types)?)
    .bind(firm.rating)
    .bind(firm.is_active)
    .bind(to_json_text_opt(firm.operating_hours.as_ref())?)
    .bind(firm.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn fetch_firm(pool: &SqlitePool, id: &str) -> AppResult<CateringFirm> {
    sqlx::query_as::<_, FirmRow>(&format!(
        "SELECT {FIRM_COLUMNS} FROM catering_firms WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(firm_not_found)?
    .try_into()
}

/// All firms matching `is_active`, newest first. Cuisine filtering happens in the caller
/// because cuisine types live in a JSON column.
pub async fn list_firms(pool: &SqlitePool, is_active: Option<bool>) -> AppResult<Vec<CateringFirm>> {
    let rows = sqlx::query_as::<_, FirmRow>(&format!(
        "SELECT {FIRM_COLUMNS} FROM catering_firms
         WHERE (?1 IS NULL OR is_active = ?1)
         ORDER BY created_at DESC"
    ))
    .bind(is_active)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(CateringFirm::try_from).collect()
}

pub async fn update_firm(
    pool: &SqlitePool,
    id: &str,
    payload: &CateringFirmPayload,
) -> AppResult<CateringFirm> {
    let existing = fetch_firm(pool, id).await?;

    sqlx::query(
        r#"
        UPDATE catering_firms
        SET name            = ?1,
            email           = ?2,
            phone           = ?3,
            address         = ?4,
            cuisine_types   = ?5,
            rating          = ?6,
            is_active       = ?7,
            operating_hours = ?8
        WHERE id = ?9
        "#,
    )
    .bind(&payload.name)
    .bind(&payload.email)
    .bind(&payload.phone)
    .bind(&payload.address)
    .bind(to_json_text(&payload.cuisine_types)?)
    .bind(payload.rating.unwrap_or(existing.rating))
    .bind(payload.is_active)
    .bind(to_json_text_opt(payload.operating_hours.as_ref())?)
    .bind(id)
    .execute(pool)
    .await?;

    fetch_firm(pool, id).await
}

// ── Menu ──────────────────────────────────────────────────────────────────────

#[derive(Debug, sqlx::FromRow)]
struct MenuItemRow {
    id: String,
    catering_firm_id: String,
    name: String,
    description: String,
    price: f64,
    category: String,
    dietary_info: Option<String>,
    ingredients: Option<String>,
    is_available: bool,
}

impl TryFrom<MenuItemRow> for MenuItem {
    type Error = AppError;

    fn try_from(row: MenuItemRow) -> AppResult<Self> {
        Ok(MenuItem {
            id: row.id,
            catering_firm_id: row.catering_firm_id,
            name: row.name,
            description: row.description,
            price: row.price,
            category: row.category,
            dietary_info: from_json_text_opt(row.dietary_info)?,
            ingredients: from_json_text_opt(row.ingredients)?,
            is_available: row.is_available,
        })
    }
}

pub async fn insert_menu_item(pool: &SqlitePool, item: &MenuItem) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO menu_items
            (id, catering_firm_id, name, description, price, category,
             dietary_info, ingredients, is_available, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&item.id)
    .bind(&item.catering_firm_id)
    .bind(&item.name)
    .bind(&item.description)
    .bind(item.price)
    .bind(&item.category)
    .bind(to_json_text_opt(item.dietary_info.as_ref())?)
    .bind(to_json_text_opt(item.ingredients.as_ref())?)
    .bind(item.is_available)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn fetch_menu(
    pool: &SqlitePool,
    firm_id: &str,
    category: Option<&str>,
) -> AppResult<Vec<MenuItem>> {
    let rows = sqlx::query_as::<_, MenuItemRow>(
        r#"
        SELECT id, catering_firm_id, name, description, price, category,
               dietary_info, ingredients, is_available
        FROM menu_items
        WHERE catering_firm_id = ?1
          AND (?2 IS NULL OR category = ?2 COLLATE NOCASE)
        ORDER BY category, name
        "#,
    )
    .bind(firm_id)
    .bind(category)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(MenuItem::try_from).collect()
}

// ── Analytics ─────────────────────────────────────────────────────────────────

/// (order count, revenue) over the firm's orders; cancelled orders earn nothing.
pub async fn order_totals(pool: &SqlitePool, firm_id: &str) -> AppResult<(i64, f64)> {
    let row: (i64, f64) = sqlx::query_as(
        r#"
        SELECT COUNT(*),
               COALESCE(SUM(CASE WHEN status != ?2 THEN total_amount ELSE 0.0 END), 0.0)
        FROM orders
        WHERE catering_firm_id = ?1
        "#,
    )
    .bind(firm_id)
    .bind(OrderStatus::Cancelled.as_str())
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn popular_items(pool: &SqlitePool, firm_id: &str, top: i64) -> AppResult<Vec<PopularItem>> {
    let items = sqlx::query_as::<_, PopularItem>(
        r#"
        SELECT i.menu_item_name AS menu_item_name, SUM(i.quantity) AS quantity
        FROM order_items i
        JOIN orders o ON o.id = i.order_id
        WHERE o.catering_firm_id = ?1 AND o.status != ?2
        GROUP BY i.menu_item_name
        ORDER BY quantity DESC, menu_item_name ASC
        LIMIT ?3
        "#,
    )
    .bind(firm_id)
    .bind(OrderStatus::Cancelled.as_str())
    .bind(top)
    .fetch_all(pool)
    .await?;

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::models::new_id;

    fn firm(name: &str, cuisines: &[&str], active: bool) -> CateringFirm {
        CateringFirm {
            id: new_id(),
            name: name.to_string(),
            email: "contact@firm.com".to_string(),
            phone: "+1234567890".to_string(),
            address: "456 Food St".to_string(),
            cuisine_types: cuisines.iter().map(|c| c.to_string()).collect(),
            rating: 4.5,
            is_active: active,
            operating_hours: Some(serde_json::json!({"monday": "9:00-21:00"})),
            menu_items: None,
            created_at: Utc::now(),
        }
    }

    fn menu_item(firm_id: &str, name: &str, category: &str) -> MenuItem {
        MenuItem {
            id: new_id(),
            catering_firm_id: firm_id.to_string(),
            name: name.to_string(),
            description: "tasty".to_string(),
            price: 9.5,
            category: category.to_string(),
            dietary_info: Some(vec!["gluten-free".to_string()]),
            ingredients: None,
            is_available: true,
        }
    }

    #[tokio::test]
    async fn firm_round_trips_json_columns() {
        let pool = test_pool().await;
        let f = firm("Healthy Bites", &["Italian", "Mediterranean"], true);
        insert_firm(&pool, &f).await.unwrap();

        let back = fetch_firm(&pool, &f.id).await.unwrap();
        assert_eq!(back.cuisine_types, vec!["Italian", "Mediterranean"]);
        assert_eq!(back.operating_hours.unwrap()["monday"], "9:00-21:00");
        assert!(back.is_active);
    }

    #[tokio::test]
    async fn list_filters_on_activity() {
        let pool = test_pool().await;
        insert_firm(&pool, &firm("A", &["Thai"], true)).await.unwrap();
        insert_firm(&pool, &firm("B", &["Thai"], false)).await.unwrap();

        assert_eq!(list_firms(&pool, None).await.unwrap().len(), 2);
        let active = list_firms(&pool, Some(true)).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "A");
    }

    #[tokio::test]
    async fn update_keeps_rating_when_omitted() {
        let pool = test_pool().await;
        let f = firm("Old", &["Thai"], true);
        insert_firm(&pool, &f).await.unwrap();

        let payload = CateringFirmPayload {
            name: "New".into(),
            email: "new@firm.com".into(),
            phone: "1".into(),
            address: "a".into(),
            cuisine_types: vec!["Greek".into()],
            rating: None,
            is_active: false,
            operating_hours: None,
        };
        let updated = update_firm(&pool, &f.id, &payload).await.unwrap();
        assert_eq!(updated.name, "New");
        assert_eq!(updated.rating, 4.5);
        assert!(!updated.is_active);
        assert!(update_firm(&pool, "missing", &payload).await.is_err());
    }

    #[tokio::test]
    async fn menu_category_filter_is_case_insensitive() {
        let pool = test_pool().await;
        let f = firm("Menu Co", &["Thai"], true);
        insert_firm(&pool, &f).await.unwrap();
        insert_menu_item(&pool, &menu_item(&f.id, "Soup", "Starter")).await.unwrap();
        insert_menu_item(&pool, &menu_item(&f.id, "Curry", "Main Course")).await.unwrap();

        assert_eq!(fetch_menu(&pool, &f.id, None).await.unwrap().len(), 2);
        let mains = fetch_menu(&pool, &f.id, Some("main course")).await.unwrap();
        assert_eq!(mains.len(), 1);
        assert_eq!(mains[0].name, "Curry");
        assert_eq!(mains[0].dietary_info.as_deref(), Some(&["gluten-free".to_string()][..]));
    }

    #[tokio::test]
    async fn totals_are_zero_without_orders() {
        let pool = test_pool().await;
        let (count, revenue) = order_totals(&pool, "nobody").await.unwrap();
        assert_eq!(count, 0);
        assert_eq!(revenue, 0.0);
        assert!(popular_items(&pool, "nobody", 5).await.unwrap().is_empty());
    }
}
