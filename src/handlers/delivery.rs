use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use serde_json::json;
use tracing::{info, warn, Level};

use crate::{
    db,
    error::{AppError, AppResult},
    extract::{Json, Query},
    models::{
        new_id, CompleteParams, Delivery, DeliveryPayload, DeliveryStatus, DeliveryStatusParams,
        DeliveryTracking, Location, LocationParams, OrderStatus,
    },
    seed::available_drivers,
    AppState,
};

// ── Assign ────────────────────────────────────────────────────────────────────

pub async fn create_delivery(
    State(state): State<AppState>,
    Json(payload): Json<DeliveryPayload>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    if payload.order_id.trim().is_empty() {
        return Err(AppError::Validation("order_id must not be empty".to_string()));
    }

    let order = db::orders::find_order(&state.db, &payload.order_id).await?;
    let drivers = available_drivers();
    let plan = state
        .agent
        .optimize_delivery_route(order.as_ref(), &drivers)
        .await;

    let status = if plan.assigned_driver_id.is_some() {
        DeliveryStatus::Assigned
    } else {
        warn!(order_id = %payload.order_id, "No driver available");
        DeliveryStatus::Pending
    };

    let delivery = Delivery {
        id: new_id(),
        order_id: payload.order_id,
        driver_id: plan.assigned_driver_id,
        status,
        pickup_time: None,
        delivery_time: None,
        current_location: None,
        estimated_arrival: plan.estimated_delivery_time,
        signature_blob: None,
    };
    db::deliveries::insert_delivery(&state.db, &delivery).await?;

    info!(
        delivery_id = %delivery.id,
        order_id = %delivery.order_id,
        driver_id = delivery.driver_id.as_deref().unwrap_or("none"),
        "Delivery assigned"
    );

    let integrations = &state.integrations;
    integrations.workflows.trigger_delivery_workflow(&delivery).await;
    integrations
        .monitoring
        .log_metric(
            "deliveries.assigned",
            1.0,
            Some(json!({ "delivery_id": delivery.id, "order_id": delivery.order_id })),
        )
        .await;

    Ok((StatusCode::OK, Json(serde_json::to_value(&delivery)?)))
}

// ── Read ──────────────────────────────────────────────────────────────────────

pub async fn get_delivery(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let delivery = db::deliveries::fetch_delivery(&state.db, &id).await?;
    Ok((StatusCode::OK, Json(serde_json::to_value(&delivery)?)))
}

pub async fn delivery_for_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let delivery = db::deliveries::find_latest_for_order(&state.db, &order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Delivery not found".to_string()))?;
    Ok((StatusCode::OK, Json(serde_json::to_value(&delivery)?)))
}

// ── Updates ───────────────────────────────────────────────────────────────────

pub async fn update_delivery_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<DeliveryStatusParams>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let now = Utc::now();
    db::deliveries::update_delivery_status(&state.db, &id, params.status, now).await?;

    info!(delivery_id = %id, status = %params.status, "Delivery status updated");

    Ok((
        StatusCode::OK,
        Json(json!({ "delivery_id": id, "status": params.status, "updated_at": now })),
    ))
}

pub async fn update_location(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<LocationParams>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let location = Location {
        lat: params.latitude,
        lng: params.longitude,
    };
    if !location.is_valid() {
        return Err(AppError::BadRequest(
            "latitude must be within [-90, 90] and longitude within [-180, 180]".to_string(),
        ));
    }

    db::deliveries::update_location(&state.db, &id, &location).await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "delivery_id": id,
            "current_location": location,
            "updated_at": Utc::now(),
        })),
    ))
}

pub async fn track_delivery(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let delivery = db::deliveries::fetch_delivery(&state.db, &id).await?;
    let driver = delivery
        .driver_id
        .as_deref()
        .and_then(|driver_id| available_drivers().into_iter().find(|d| d.id == driver_id));

    let tracking = DeliveryTracking {
        delivery_id: delivery.id,
        status: delivery.status,
        current_location: delivery.current_location,
        estimated_arrival: delivery.estimated_arrival,
        driver,
        route: Vec::new(),
    };

    Ok((StatusCode::OK, Json(serde_json::to_value(&tracking)?)))
}

pub async fn delivery_signature(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let delivery = db::deliveries::fetch_delivery(&state.db, &id).await?;
    let not_found = || AppError::NotFound("Signature not found".to_string());

    let blob_name = delivery.signature_blob.ok_or_else(not_found)?;
    let blob = state
        .integrations
        .storage
        .download_data(&blob_name)
        .await
        .ok_or_else(not_found)?;

    Ok((StatusCode::OK, Json(blob)))
}

// ── Complete ──────────────────────────────────────────────────────────────────

pub async fn complete_delivery(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<CompleteParams>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let now = Utc::now();
    let delivery =
        db::deliveries::update_delivery_status(&state.db, &id, DeliveryStatus::Delivered, now)
            .await?;

    // The order may live in another system; only mark it when we know it.
    if db::orders::find_order(&state.db, &delivery.order_id).await?.is_some() {
        db::orders::update_order_status(&state.db, &delivery.order_id, OrderStatus::Delivered, now)
            .await?;
    }

    let integrations = &state.integrations;
    let signature_captured = match params.signature.as_deref().map(str::trim) {
        Some(signature) if !signature.is_empty() => {
            let blob_name = format!("signatures/{}", id);
            integrations
                .storage
                .upload_data(
                    &blob_name,
                    json!({ "delivery_id": id, "signature": signature, "captured_at": now }),
                )
                .await;
            db::deliveries::attach_signature(&state.db, &id, &blob_name).await?;
            true
        }
        _ => false,
    };

    integrations
        .monitoring
        .log_metric("deliveries.completed", 1.0, Some(json!({ "delivery_id": id })))
        .await;
    integrations
        .monitoring
        .log_trace(&format!("Delivery {} completed", id), Level::INFO)
        .await;

    Ok((
        StatusCode::OK,
        Json(json!({
            "delivery_id": id,
            "status": DeliveryStatus::Delivered,
            "delivered_at": delivery.delivery_time.unwrap_or(now),
            "signature_captured": signature_captured,
        })),
    ))
}
