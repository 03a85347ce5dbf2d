use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use serde_json::json;
use tracing::info;

use crate::{
    db::{self, orders::OrderQuery},
    error::AppResult,
    extract::{Json, Query},
    models::{CustomerFilters, CustomerPayload},
    AppState,
};

/// Order history considered when building recommendations.
const HISTORY_WINDOW: i64 = 50;

// ── Create ────────────────────────────────────────────────────────────────────

pub async fn create_customer(
    State(state): State<AppState>,
    Json(payload): Json<CustomerPayload>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    payload.validate()?;

    let customer = payload.into_customer(Utc::now());
    db::customers::insert_customer(&state.db, &customer).await?;

    info!(customer_id = %customer.id, "Created customer");

    Ok((StatusCode::OK, Json(serde_json::to_value(&customer)?)))
}

// ── Read ──────────────────────────────────────────────────────────────────────

pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let customer = db::customers::fetch_customer(&state.db, &id).await?;
    Ok((StatusCode::OK, Json(serde_json::to_value(&customer)?)))
}

pub async fn list_customers(
    State(state): State<AppState>,
    Query(filters): Query<CustomerFilters>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let customers = db::customers::list_customers(&state.db, filters.limit).await?;
    Ok((StatusCode::OK, Json(serde_json::to_value(&customers)?)))
}

// ── Update / delete ───────────────────────────────────────────────────────────

pub async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<CustomerPayload>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    payload.validate()?;

    let customer = db::customers::update_customer(&state.db, &id, &payload).await?;
    info!(customer_id = %id, "Updated customer");

    Ok((StatusCode::OK, Json(serde_json::to_value(&customer)?)))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    db::customers::soft_delete_customer(&state.db, &id, Utc::now()).await?;
    info!(customer_id = %id, "Deleted customer");

    Ok((
        StatusCode::OK,
        Json(json!({ "message": "Customer deleted", "customer_id": id })),
    ))
}

// ── Orders & recommendations ──────────────────────────────────────────────────

pub async fn customer_orders(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let orders = db::orders::list_orders(
        &state.db,
        &OrderQuery {
            customer_id: Some(&id),
            limit: Some(100),
            ..Default::default()
        },
    )
    .await?;

    Ok((StatusCode::OK, Json(serde_json::to_value(&orders)?)))
}

pub async fn customer_recommendations(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    db::customers::fetch_customer(&state.db, &id).await?;

    let history = db::orders::list_orders(
        &state.db,
        &OrderQuery {
            customer_id: Some(&id),
            limit: Some(HISTORY_WINDOW),
            ..Default::default()
        },
    )
    .await?;

    let recommendations = state.agent.generate_recommendations(&id, &history).await;

    Ok((
        StatusCode::OK,
        Json(json!({ "customer_id": id, "recommendations": recommendations })),
    ))
}
