use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use chrono::Utc;
use serde_json::json;
use tracing::{info, warn, Level};

use crate::{
    db::{self, orders::OrderQuery},
    error::{AppError, AppResult},
    extract::{Json, Query},
    models::{
        OrderFilters, OrderPayload, OrderStatus, OrderStatusParams, OrderTracking, WorkflowCallback,
    },
    security::verify_webhook_signature,
    AppState,
};

// ── Create ────────────────────────────────────────────────────────────────────

pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<OrderPayload>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    payload.validate()?;
    let mut order = payload.into_order(Utc::now());

    let validation = state.agent.validate_order(&order).await;
    if !validation.is_valid {
        warn!(order_id = %order.id, issues = ?validation.issues, "Order rejected");
        return Err(AppError::BadRequest(format!(
            "Order validation failed: {}",
            validation.issues.join(", ")
        )));
    }

    // Candidates are only needed when the customer left the firm open.
    let candidates = if order.catering_firm_id.is_empty() {
        db::catering_firms::list_firms(&state.db, Some(true)).await?
    } else {
        Vec::new()
    };
    let routing = state.agent.route_order(&order, &candidates).await;
    order.catering_firm_id = routing
        .selected_firm_id
        .ok_or_else(|| AppError::BadRequest("No catering firm available".to_string()))?;

    order.status = OrderStatus::Validated;
    order.updated_at = Utc::now();
    db::orders::insert_order(&state.db, &order).await?;

    info!(
        order_id = %order.id,
        firm_id = %order.catering_firm_id,
        routing = %routing.reason,
        total = order.total_amount,
        "Created order"
    );

    let integrations = &state.integrations;
    integrations.workflows.trigger_order_workflow(&order).await;
    integrations
        .service_bus
        .send_message(json!({
            "order_id": order.id,
            "type": "order_created",
            "timestamp": order.created_at.to_rfc3339(),
        }))
        .await;
    integrations
        .monitoring
        .log_metric(
            "orders.created",
            order.total_amount,
            Some(json!({ "order_id": order.id, "catering_firm_id": order.catering_firm_id })),
        )
        .await;

    Ok((StatusCode::OK, Json(serde_json::to_value(&order)?)))
}

// ── Read ──────────────────────────────────────────────────────────────────────

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let order = db::orders::fetch_order(&state.db, &id).await?;
    Ok((StatusCode::OK, Json(serde_json::to_value(&order)?)))
}

pub async fn list_orders(
    State(state): State<AppState>,
    Query(filters): Query<OrderFilters>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let orders = db::orders::list_orders(
        &state.db,
        &OrderQuery {
            customer_id: filters.customer_id.as_deref(),
            status: filters.status,
            limit: filters.limit,
            ..Default::default()
        },
    )
    .await?;

    Ok((StatusCode::OK, Json(serde_json::to_value(&orders)?)))
}

// ── Status changes ────────────────────────────────────────────────────────────

pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<OrderStatusParams>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let now = Utc::now();
    db::orders::update_order_status(&state.db, &id, params.status, now).await?;

    info!(order_id = %id, status = %params.status, "Order status updated");

    Ok((
        StatusCode::OK,
        Json(json!({ "order_id": id, "status": params.status, "updated_at": now })),
    ))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let order = db::orders::fetch_order(&state.db, &id).await?;
    if !order.status.is_cancellable() {
        return Err(AppError::Conflict(format!(
            "Order is {} and can no longer be cancelled",
            order.status
        )));
    }

    let now = Utc::now();
    db::orders::update_order_status(&state.db, &id, OrderStatus::Cancelled, now).await?;

    state
        .integrations
        .monitoring
        .log_trace(&format!("Order {} cancelled", id), Level::INFO)
        .await;

    Ok((
        StatusCode::OK,
        Json(json!({
            "order_id": id,
            "status": OrderStatus::Cancelled,
            "cancelled_at": now,
        })),
    ))
}

// ── Workflow callbacks ────────────────────────────────────────────────────────

/// Signed with HMAC-SHA256 over the raw body, keyed by `SECRET_KEY`.
pub async fn workflow_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let signature = headers
        .get("x-signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !verify_webhook_signature(&body, signature, &state.config.secret_key) {
        warn!("Workflow callback with bad signature");
        return Err(AppError::Unauthorized("Invalid webhook signature".to_string()));
    }

    let callback: WorkflowCallback =
        serde_json::from_slice(&body).map_err(|e| AppError::Validation(e.to_string()))?;

    let now = Utc::now();
    db::orders::update_order_status(&state.db, &callback.order_id, callback.status, now).await?;

    info!(order_id = %callback.order_id, status = %callback.status, "Workflow reported order status");

    Ok((
        StatusCode::OK,
        Json(json!({
            "order_id": callback.order_id,
            "status": callback.status,
            "updated_at": now,
        })),
    ))
}

// ── Tracking ──────────────────────────────────────────────────────────────────

pub async fn track_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let order = db::orders::fetch_order(&state.db, &id).await?;
    let delivery = db::deliveries::find_latest_for_order(&state.db, &id).await?;
    let updates = db::orders::fetch_order_events(&state.db, &id).await?;

    let tracking = OrderTracking {
        order_id: order.id,
        status: order.status,
        current_location: delivery.as_ref().and_then(|d| d.current_location),
        estimated_delivery: delivery
            .as_ref()
            .and_then(|d| d.estimated_arrival)
            .or(order.estimated_delivery_time),
        updates,
    };

    Ok((StatusCode::OK, Json(serde_json::to_value(&tracking)?)))
}
