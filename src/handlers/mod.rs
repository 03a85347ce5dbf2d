pub mod catering_firms;
pub mod customers;
pub mod delivery;
pub mod orders;
pub mod payments;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{
    error::AppResult,
    extract::{Json, Query},
    seed, AppState,
};

pub const SERVICE_VERSION: &str = "1.0.0";

pub async fn root() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "message": "Welcome to HealthyFoods AI Agentic Platform",
            "version": SERVICE_VERSION,
            "status": "operational",
        })),
    )
}

pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "healthy", "service": "HealthyFoods", "version": SERVICE_VERSION })),
    )
}

// ── POST /api/v1/seed ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SeedParams {
    pub count: Option<usize>,
}

pub async fn seed_data(
    State(state): State<AppState>,
    Query(params): Query<SeedParams>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let count = params.count.unwrap_or(5).min(100);
    let firms = seed::seed_catering_firms(&state.db, count).await?;

    info!(seeded = firms.len(), "Demo data seeded");

    Ok((
        StatusCode::OK,
        Json(json!({
            "seeded": firms.len(),
            "firm_ids": firms.iter().map(|f| f.id.as_str()).collect::<Vec<_>>(),
        })),
    ))
}

// ── Monitoring ────────────────────────────────────────────────────────────────

pub async fn metrics_summary(State(state): State<AppState>) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let metrics = state.metrics.read().await;

    Ok((
        StatusCode::OK,
        Json(json!({
            "entry_count": metrics.entries.len(),
            "aggregated": metrics.aggregated(),
        })),
    ))
}

pub async fn metrics_csv(State(state): State<AppState>) -> AppResult<Response> {
    let csv = state.metrics.read().await.to_csv()?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"healthyfoods_metrics.csv\""),
        ],
        csv,
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct ReceiveParams {
    pub max_messages: Option<usize>,
}

pub async fn receive_queue(
    State(state): State<AppState>,
    Query(params): Query<ReceiveParams>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let bus = &state.integrations.service_bus;
    let max = params.max_messages.unwrap_or(10).clamp(1, 100);
    let messages = bus.receive_messages(max).await;

    Ok((
        StatusCode::OK,
        Json(json!({ "queue": bus.queue_name(), "messages": messages })),
    ))
}

pub async fn clear_metrics(State(state): State<AppState>) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let mut metrics = state.metrics.write().await;
    let cleared = metrics.entries.len();
    metrics.clear();

    info!(cleared, "Metrics cleared");

    Ok((StatusCode::OK, Json(json!({ "cleared": cleared }))))
}
