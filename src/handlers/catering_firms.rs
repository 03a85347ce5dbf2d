use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use tracing::info;

use crate::{
    db::{self, orders::OrderQuery},
    error::{AppError, AppResult},
    extract::{Json, Query},
    models::{
        CateringFirmFilters, CateringFirmPayload, FirmAnalytics, FirmOrderFilters, MenuFilters,
        MenuItemPayload, OrderStatus,
    },
    AppState,
};

const TOP_ITEMS: i64 = 5;

// ── Firms ─────────────────────────────────────────────────────────────────────

pub async fn create_firm(
    State(state): State<AppState>,
    Json(payload): Json<CateringFirmPayload>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    payload.validate()?;

    let firm = payload.into_firm(Utc::now());
    db::catering_firms::insert_firm(&state.db, &firm).await?;

    info!(firm_id = %firm.id, name = %firm.name, "Registered catering firm");

    Ok((StatusCode::OK, Json(serde_json::to_value(&firm)?)))
}

pub async fn get_firm(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let mut firm = db::catering_firms::fetch_firm(&state.db, &id).await?;
    firm.menu_items = Some(db::catering_firms::fetch_menu(&state.db, &id, None).await?);

    Ok((StatusCode::OK, Json(serde_json::to_value(&firm)?)))
}

pub async fn list_firms(
    State(state): State<AppState>,
    Query(filters): Query<CateringFirmFilters>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let limit = db::page_limit(filters.limit) as usize;

    let firms: Vec<_> = db::catering_firms::list_firms(&state.db, filters.is_active)
        .await?
        .into_iter()
        .filter(|f| {
            filters
                .cuisine_type
                .as_deref()
                .map_or(true, |cuisine| f.serves(cuisine))
        })
        .take(limit)
        .collect();

    Ok((StatusCode::OK, Json(serde_json::to_value(&firms)?)))
}

pub async fn update_firm(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<CateringFirmPayload>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    payload.validate()?;

    let firm = db::catering_firms::update_firm(&state.db, &id, &payload).await?;
    info!(firm_id = %id, "Updated catering firm");

    Ok((StatusCode::OK, Json(serde_json::to_value(&firm)?)))
}

// ── Menu ──────────────────────────────────────────────────────────────────────

pub async fn add_menu_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<MenuItemPayload>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    payload.validate()?;
    db::catering_firms::fetch_firm(&state.db, &id).await?;

    let item = payload.into_menu_item(&id);
    db::catering_firms::insert_menu_item(&state.db, &item).await?;

    info!(firm_id = %id, menu_item_id = %item.id, "Added menu item");

    Ok((StatusCode::OK, Json(serde_json::to_value(&item)?)))
}

pub async fn get_menu(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(filters): Query<MenuFilters>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let items =
        db::catering_firms::fetch_menu(&state.db, &id, filters.category.as_deref()).await?;
    Ok((StatusCode::OK, Json(serde_json::to_value(&items)?)))
}

// ── Orders & analytics ────────────────────────────────────────────────────────

pub async fn firm_orders(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(filters): Query<FirmOrderFilters>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let status = filters
        .status
        .as_deref()
        .map(str::parse::<OrderStatus>)
        .transpose()
        .map_err(AppError::Validation)?;

    let orders = db::orders::list_orders(
        &state.db,
        &OrderQuery {
            catering_firm_id: Some(&id),
            status,
            limit: Some(100),
            ..Default::default()
        },
    )
    .await?;

    Ok((StatusCode::OK, Json(serde_json::to_value(&orders)?)))
}

pub async fn firm_analytics(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let firm = db::catering_firms::fetch_firm(&state.db, &id).await?;
    let (total_orders, revenue) = db::catering_firms::order_totals(&state.db, &id).await?;
    let popular_items = db::catering_firms::popular_items(&state.db, &id, TOP_ITEMS).await?;

    let analytics = FirmAnalytics {
        firm_id: firm.id,
        total_orders,
        revenue,
        average_rating: firm.rating,
        popular_items,
    };

    Ok((StatusCode::OK, Json(serde_json::to_value(&analytics)?)))
}
