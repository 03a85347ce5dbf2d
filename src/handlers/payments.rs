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
    models::{PaymentPayload, PaymentStatus, Receipt, RefundParams},
    security::hash_sensitive_data,
    AppState,
};

// ── Process ───────────────────────────────────────────────────────────────────

pub async fn process_payment(
    State(state): State<AppState>,
    Json(payload): Json<PaymentPayload>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    payload.validate()?;
    let mut payment = payload.into_payment(Utc::now());

    let order = db::orders::find_order(&state.db, &payment.order_id).await?;
    let validation = state
        .agent
        .process_payment_validation(order.as_ref(), &payment)
        .await;

    if !validation.is_valid {
        warn!(
            payment_id = %payment.id,
            order_id = %payment.order_id,
            recommendations = ?validation.recommendations,
            "Payment rejected"
        );
        return Err(AppError::BadRequest("Payment validation failed".to_string()));
    }

    payment.status = PaymentStatus::Completed;
    payment.completed_at = Some(Utc::now());
    payment.transaction_id = Some(format!("txn_{}", uuid::Uuid::new_v4()));
    db::payments::insert_payment(&state.db, &payment).await?;

    info!(
        payment_id = %payment.id,
        order_id = %payment.order_id,
        method_hash = %hash_sensitive_data(&payment.payment_method),
        amount = payment.amount,
        "Payment completed"
    );

    let integrations = &state.integrations;
    integrations.workflows.trigger_payment_workflow(&payment).await;
    integrations
        .monitoring
        .log_metric(
            "payments.completed",
            payment.amount,
            Some(json!({ "payment_id": payment.id, "order_id": payment.order_id })),
        )
        .await;

    Ok((StatusCode::OK, Json(serde_json::to_value(&payment)?)))
}

// ── Read ──────────────────────────────────────────────────────────────────────

pub async fn get_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let payment = db::payments::fetch_payment(&state.db, &id).await?;
    Ok((StatusCode::OK, Json(serde_json::to_value(&payment)?)))
}

pub async fn payments_for_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let payments = db::payments::list_payments_for_order(&state.db, &order_id).await?;
    Ok((StatusCode::OK, Json(serde_json::to_value(&payments)?)))
}

// ── Refund ────────────────────────────────────────────────────────────────────

pub async fn refund_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<RefundParams>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let payment = db::payments::fetch_payment(&state.db, &id).await?;
    let amount = params.amount.unwrap_or(payment.amount);

    if !amount.is_finite() || amount <= 0.0 || amount > payment.amount {
        return Err(AppError::BadRequest(format!(
            "Refund amount must be greater than 0 and at most {:.2}",
            payment.amount
        )));
    }

    let refunded = db::payments::record_refund(&state.db, &id, amount, Utc::now()).await?;

    info!(payment_id = %id, amount, "Payment refunded");

    let monitoring = &state.integrations.monitoring;
    monitoring
        .log_metric("payments.refunded", amount, Some(json!({ "payment_id": id })))
        .await;
    monitoring
        .log_trace(&format!("Refund of {:.2} issued for payment {}", amount, id), Level::INFO)
        .await;

    Ok((
        StatusCode::OK,
        Json(json!({
            "payment_id": refunded.id,
            "status": refunded.status,
            "refund_amount": refunded.refund_amount,
            "refunded_at": refunded.refunded_at,
        })),
    ))
}

pub async fn payment_receipt(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let payment = db::payments::fetch_payment(&state.db, &id).await?;
    let receipt = Receipt::for_payment(&payment.id, Utc::now());
    Ok((StatusCode::OK, Json(serde_json::to_value(&receipt)?)))
}
