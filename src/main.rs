use std::sync::Arc;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

mod config;
mod db;
mod error;
mod extract;
mod handlers;
mod metrics;
mod models;
mod security;
mod seed;
mod services;

use crate::config::Config;
use crate::metrics::MetricsStore;
use crate::services::{AgentOrchestrator, Integrations};

/// Shared application state. Clones only bump reference counts.
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub config: Arc<Config>,
    pub agent: Arc<AgentOrchestrator>,
    pub integrations: Arc<Integrations>,
    pub metrics: Arc<RwLock<MetricsStore>>,
}

impl AppState {
    pub fn new(db: sqlx::SqlitePool, config: Config) -> Self {
        let metrics = Arc::new(RwLock::new(MetricsStore::new()));
        let integrations = Integrations::from_config(&config.azure, metrics.clone());
        let agent = AgentOrchestrator::from_config(&config.azure);

        Self {
            db,
            config: Arc::new(config),
            agent: Arc::new(agent),
            integrations: Arc::new(integrations),
            metrics,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (ignored in production where env vars are injected)
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,healthyfoods_service=debug")),
        )
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env()?;

    info!("╔══════════════════════════════════════════╗");
    info!("║  HealthyFoods AI Agentic Platform  v1.0  ║");
    info!("║  Orders · Payments · Deliveries          ║");
    info!("╚══════════════════════════════════════════╝");
    info!(app = %config.app_name, debug = config.debug, "Starting");

    info!("Opening database...");
    let pool = db::connect(&config.database_url, 5).await?;
    info!("Database ready, migrations applied.");

    let addr = format!("{}:{}", config.host, config.port);
    let api_keys = config.api_keys.len();
    let app = build_router(AppState::new(pool, config));

    info!(api_keys, "Listening on http://{}", addr);
    info!("Quick-start: POST http://{}/api/v1/seed?count=5  →  then POST http://{}/api/v1/orders", addr, addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-api-key"),
        ])
        .allow_credentials(true)
}

fn build_router(state: AppState) -> Router {
    use handlers::{catering_firms, customers, delivery, orders, payments};

    let cors = cors_layer(&state.config.allowed_origins);

    Router::new()
        // ── General ─────────────────────────────────────────────────────────
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/api/v1/seed", post(handlers::seed_data))
        .route(
            "/api/v1/monitoring/metrics",
            get(handlers::metrics_summary).delete(handlers::clear_metrics),
        )
        .route("/api/v1/monitoring/metrics/csv", get(handlers::metrics_csv))
        .route("/api/v1/monitoring/queue/receive", post(handlers::receive_queue))

        // ── Customers ───────────────────────────────────────────────────────
        .route(
            "/api/v1/customers",
            get(customers::list_customers).post(customers::create_customer),
        )
        .route(
            "/api/v1/customers/:id",
            get(customers::get_customer)
                .put(customers::update_customer)
                .delete(customers::delete_customer),
        )
        .route("/api/v1/customers/:id/orders", get(customers::customer_orders))
        .route(
            "/api/v1/customers/:id/recommendations",
            get(customers::customer_recommendations),
        )

        // ── Catering firms ──────────────────────────────────────────────────
        .route(
            "/api/v1/catering-firms",
            get(catering_firms::list_firms).post(catering_firms::create_firm),
        )
        .route(
            "/api/v1/catering-firms/:id",
            get(catering_firms::get_firm).put(catering_firms::update_firm),
        )
        .route(
            "/api/v1/catering-firms/:id/menu",
            get(catering_firms::get_menu).post(catering_firms::add_menu_item),
        )
        .route("/api/v1/catering-firms/:id/orders", get(catering_firms::firm_orders))
        .route(
            "/api/v1/catering-firms/:id/analytics",
            get(catering_firms::firm_analytics),
        )

        // ── Orders ──────────────────────────────────────────────────────────
        .route(
            "/api/v1/orders",
            get(orders::list_orders).post(orders::create_order),
        )
        .route("/api/v1/orders/:id", get(orders::get_order))
        .route("/api/v1/orders/:id/status", put(orders::update_order_status))
        .route("/api/v1/orders/:id/cancel", post(orders::cancel_order))
        .route("/api/v1/orders/:id/track", get(orders::track_order))
        .route("/api/v1/webhooks/workflow", post(orders::workflow_callback))

        // ── Payments ────────────────────────────────────────────────────────
        .route("/api/v1/payments", post(payments::process_payment))
        .route("/api/v1/payments/:id", get(payments::get_payment))
        .route("/api/v1/payments/order/:order_id", get(payments::payments_for_order))
        .route("/api/v1/payments/:id/refund", post(payments::refund_payment))
        .route("/api/v1/payments/:id/receipt", get(payments::payment_receipt))

        // ── Deliveries ──────────────────────────────────────────────────────
        .route("/api/v1/delivery", post(delivery::create_delivery))
        .route("/api/v1/delivery/:id", get(delivery::get_delivery))
        .route("/api/v1/delivery/order/:order_id", get(delivery::delivery_for_order))
        .route("/api/v1/delivery/:id/status", put(delivery::update_delivery_status))
        .route("/api/v1/delivery/:id/location", post(delivery::update_location))
        .route("/api/v1/delivery/:id/track", get(delivery::track_delivery))
        .route("/api/v1/delivery/:id/complete", post(delivery::complete_delivery))
        .route("/api/v1/delivery/:id/signature", get(delivery::delivery_signature))

        // ── Middleware (last added runs first) ──────────────────────────────
        .layer(middleware::from_fn_with_state(
            state.integrations.clone(),
            security::content_safety,
        ))
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            security::require_api_key,
        ))
        .layer(middleware::from_fn(security::security_headers))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_config(api_keys: &str) -> Config {
        Config::from_lookup(|key| match key {
            "SECRET_KEY" => Some("test-secret".to_string()),
            "API_KEYS" => Some(api_keys.to_string()),
            _ => None,
        })
        .unwrap()
    }

    async fn test_app() -> Router {
        build_router(AppState::new(db::test_pool().await, test_config("")))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        send_request(app, builder.body(body).unwrap()).await
    }

    async fn send_request(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(request).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    fn order_body(firm_id: &str) -> Value {
        json!({
            "customer_id": "test_customer_123",
            "catering_firm_id": firm_id,
            "items": [{
                "menu_item_id": "item1",
                "menu_item_name": "Grilled Chicken Salad",
                "quantity": 2,
                "unit_price": 12.99
            }],
            "total_amount": 25.98,
            "delivery_address": "123 Test St"
        })
    }

    async fn create_order(app: &Router) -> Value {
        let (status, order) = send(app, "POST", "/api/v1/orders", Some(order_body("test_firm_456"))).await;
        assert_eq!(status, StatusCode::OK);
        order
    }

    fn firm_body(name: &str, cuisines: &[&str]) -> Value {
        json!({
            "name": name,
            "email": "contact@healthybites.com",
            "phone": "+1234567890",
            "address": "456 Food St",
            "cuisine_types": cuisines,
            "rating": 4.5
        })
    }

    // ── General ─────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn root_and_health() {
        let app = test_app().await;

        let (status, body) = send(&app, "GET", "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Welcome to HealthyFoods AI Agentic Platform");
        assert_eq!(body["status"], "operational");

        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "healthy", "service": "HealthyFoods", "version": "1.0.0"}));
    }

    #[tokio::test]
    async fn responses_carry_security_headers() {
        let app = test_app().await;
        let res = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(res.headers()["x-frame-options"], "DENY");
        assert_eq!(res.headers()["x-content-type-options"], "nosniff");
        assert_eq!(
            res.headers()["strict-transport-security"],
            "max-age=31536000; includeSubDomains"
        );
    }

    #[tokio::test]
    async fn api_keys_guard_the_api_when_configured() {
        let app = build_router(AppState::new(db::test_pool().await, test_config("secret-key")));

        let (status, body) = send(&app, "GET", "/api/v1/orders", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["detail"], "API key required");

        let (status, _) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);

        let res = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/orders")
                    .header("x-api-key", "secret-key")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    // ── Orders ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn order_is_validated_and_stored() {
        let app = test_app().await;
        let order = create_order(&app).await;

        assert_eq!(order["status"], "validated");
        assert_eq!(order["catering_firm_id"], "test_firm_456");
        let id = order["id"].as_str().unwrap();

        let (status, fetched) = send(&app, "GET", &format!("/api/v1/orders/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["items"][0]["menu_item_name"], "Grilled Chicken Salad");

        let (_, listed) = send(&app, "GET", "/api/v1/orders?customer_id=test_customer_123", None).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let (_, listed) = send(&app, "GET", "/api/v1/orders?status=delivered", None).await;
        assert!(listed.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn order_without_items_is_rejected() {
        let app = test_app().await;
        let mut body = order_body("test_firm_456");
        body["items"] = json!([]);

        let (status, res) = send(&app, "POST", "/api/v1/orders", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let detail = res["detail"].as_str().unwrap();
        assert!(detail.starts_with("Order validation failed"));
        assert!(detail.to_lowercase().contains("no items"));
    }

    #[tokio::test]
    async fn order_with_zero_amount_is_rejected() {
        let app = test_app().await;
        let mut body = order_body("test_firm_456");
        body["total_amount"] = json!(0.0);

        let (status, res) = send(&app, "POST", "/api/v1/orders", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(res["detail"], "Order validation failed: Invalid order amount");
    }

    #[tokio::test]
    async fn unknown_order_is_404() {
        let app = test_app().await;
        let (status, body) = send(&app, "GET", "/api/v1/orders/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Order not found");
    }

    #[tokio::test]
    async fn open_orders_are_routed_to_an_active_firm() {
        let app = test_app().await;

        let (status, body) = send(&app, "POST", "/api/v1/orders", Some(order_body(""))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "No catering firm available");

        let (_, firm) = send(&app, "POST", "/api/v1/catering-firms", Some(firm_body("Healthy Bites", &["Italian"]))).await;
        let (status, order) = send(&app, "POST", "/api/v1/orders", Some(order_body(""))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(order["catering_firm_id"], firm["id"]);
    }

    #[tokio::test]
    async fn cancel_and_track() {
        let app = test_app().await;
        let order = create_order(&app).await;
        let id = order["id"].as_str().unwrap();

        let (status, res) = send(&app, "PUT", &format!("/api/v1/orders/{id}/status?status=preparing"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(res["status"], "preparing");

        let (status, res) = send(&app, "POST", &format!("/api/v1/orders/{id}/cancel"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(res["status"], "cancelled");

        let (status, _) = send(&app, "POST", &format!("/api/v1/orders/{id}/cancel"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, track) = send(&app, "GET", &format!("/api/v1/orders/{id}/track"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(track["status"], "cancelled");
        let updates: Vec<&str> = track["updates"]
            .as_array()
            .unwrap()
            .iter()
            .map(|u| u["status"].as_str().unwrap())
            .collect();
        assert_eq!(updates, vec!["validated", "preparing", "cancelled"]);
    }

    fn sign(body: &str) -> String {
        use hmac::{Hmac, Mac};
        use sha2::Sha256;

        let mut mac = Hmac::<Sha256>::new_from_slice(b"test-secret").unwrap();
        mac.update(body.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn workflow_callback(body: &str, signature: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/webhooks/workflow")
            .header("x-signature", signature)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn signed_workflow_callbacks_update_orders() {
        let app = test_app().await;
        let order = create_order(&app).await;
        let id = order["id"].as_str().unwrap();

        let body = json!({"order_id": id, "status": "preparing"}).to_string();
        let good = sign(&body);

        let (status, res) = send_request(&app, workflow_callback(&body, "deadbeef")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(res["detail"], "Invalid webhook signature");

        let (status, res) = send_request(&app, workflow_callback(&body, &good)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(res["status"], "preparing");

        let (_, fetched) = send(&app, "GET", &format!("/api/v1/orders/{id}"), None).await;
        assert_eq!(fetched["status"], "preparing");
    }

    #[tokio::test]
    async fn signed_callbacks_with_bad_bodies_or_unknown_orders_fail() {
        let app = test_app().await;

        let malformed = r#"{"order_id": 7}"#;
        let (status, res) = send_request(&app, workflow_callback(malformed, &sign(malformed))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(res["detail"].is_string());

        let unknown = json!({"order_id": "ghost", "status": "preparing"}).to_string();
        let (status, res) = send_request(&app, workflow_callback(&unknown, &sign(&unknown))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(res["detail"], "Order not found");
    }

    #[tokio::test]
    async fn orders_past_the_kitchen_cannot_be_cancelled() {
        let app = test_app().await;

        for status in ["out_for_delivery", "delivered"] {
            let order = create_order(&app).await;
            let id = order["id"].as_str().unwrap();

            let (code, _) = send(&app, "PUT", &format!("/api/v1/orders/{id}/status?status={status}"), None).await;
            assert_eq!(code, StatusCode::OK);

            let (code, res) = send(&app, "POST", &format!("/api/v1/orders/{id}/cancel"), None).await;
            assert_eq!(code, StatusCode::CONFLICT, "{status}");
            assert!(res["detail"].as_str().unwrap().contains(status));

            let (_, fetched) = send(&app, "GET", &format!("/api/v1/orders/{id}"), None).await;
            assert_eq!(fetched["status"], status);
        }
    }

    // ── Rejections ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn extractor_rejections_use_the_detail_body() {
        let app = test_app().await;
        let order = create_order(&app).await;
        let id = order["id"].as_str().unwrap();

        let (status, body) = send(&app, "POST", "/api/v1/customers", Some(json!({"name": "A"}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().unwrap().contains("email"));

        for uri in [
            "/api/v1/orders?status=shipped".to_string(),
            "/api/v1/catering-firms/any/orders?status=shipped".to_string(),
        ] {
            let (status, body) = send(&app, "GET", &uri, None).await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{uri}");
            assert!(body["detail"].is_string(), "{uri}");
        }

        let (status, body) = send(&app, "PUT", &format!("/api/v1/orders/{id}/status?status=bogus"), None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].is_string());

        let malformed = Request::builder()
            .method("POST")
            .uri("/api/v1/orders")
            .header("content-type", "application/json")
            .body(Body::from("{\"customer_id\": "))
            .unwrap();
        let (status, body) = send_request(&app, malformed).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].is_string());

        let (status, body) = send(&app, "POST", "/api/v1/delivery/x/location?latitude=abc&longitude=1", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn oversized_bodies_fail_content_screening() {
        let app = test_app().await;
        let huge = Request::builder()
            .method("POST")
            .uri("/api/v1/orders")
            .header("content-type", "application/json")
            .body(Body::from(vec![b' '; security::MAX_SCREENED_BODY + 1]))
            .unwrap();

        let (status, body) = send_request(&app, huge).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Content safety validation failed");
    }

    // ── Payments ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn payment_lifecycle() {
        let app = test_app().await;
        let order = create_order(&app).await;
        let order_id = order["id"].as_str().unwrap();

        let (status, res) = send(
            &app,
            "POST",
            "/api/v1/payments",
            Some(json!({"order_id": order_id, "amount": 20.0, "payment_method": "credit_card"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(res["detail"], "Payment validation failed");

        let (status, payment) = send(
            &app,
            "POST",
            "/api/v1/payments",
            Some(json!({"order_id": order_id, "amount": 25.98, "payment_method": "credit_card"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payment["status"], "completed");
        assert!(payment["transaction_id"].as_str().unwrap().starts_with("txn_"));
        let payment_id = payment["id"].as_str().unwrap();

        let (_, listed) = send(&app, "GET", &format!("/api/v1/payments/order/{order_id}"), None).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let (status, _) = send(&app, "POST", &format!("/api/v1/payments/{payment_id}/refund?amount=30"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, refund) = send(&app, "POST", &format!("/api/v1/payments/{payment_id}/refund?amount=10.5"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(refund["status"], "refunded");
        assert_eq!(refund["refund_amount"], 10.5);

        let (status, _) = send(&app, "POST", &format!("/api/v1/payments/{payment_id}/refund"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, receipt) = send(&app, "GET", &format!("/api/v1/payments/{payment_id}/receipt"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            receipt["receipt_url"],
            format!("https://receipts.healthyfoods.com/{payment_id}")
        );
    }

    #[tokio::test]
    async fn full_refund_when_amount_is_absent() {
        let app = test_app().await;
        let (_, payment) = send(
            &app,
            "POST",
            "/api/v1/payments",
            Some(json!({"order_id": "external_order", "amount": 18.5, "payment_method": "paypal"})),
        )
        .await;
        let payment_id = payment["id"].as_str().unwrap();

        let (status, refund) = send(&app, "POST", &format!("/api/v1/payments/{payment_id}/refund"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(refund["status"], "refunded");
        assert_eq!(refund["refund_amount"], 18.5);
    }

    #[tokio::test]
    async fn non_positive_payments_are_rejected() {
        let app = test_app().await;

        for amount in [0.0, -50.0] {
            let (status, body) = send(
                &app,
                "POST",
                "/api/v1/payments",
                Some(json!({"order_id": "ext", "amount": amount, "payment_method": "credit_card"})),
            )
            .await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{amount}");
            assert_eq!(body["detail"], "amount must be greater than 0");
        }

        let (_, listed) = send(&app, "GET", "/api/v1/payments/order/ext", None).await;
        assert!(listed.as_array().unwrap().is_empty());
        let (_, metrics) = send(&app, "GET", "/api/v1/monitoring/metrics", None).await;
        assert_eq!(metrics["entry_count"], 0);
    }

    #[tokio::test]
    async fn payment_for_unknown_order_is_accepted() {
        let app = test_app().await;
        let (status, payment) = send(
            &app,
            "POST",
            "/api/v1/payments",
            Some(json!({"order_id": "external_order", "amount": 9.99, "payment_method": "paypal"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payment["status"], "completed");
    }

    // ── Deliveries ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn delivery_lifecycle() {
        let app = test_app().await;
        let order = create_order(&app).await;
        let order_id = order["id"].as_str().unwrap();

        let (status, delivery) = send(&app, "POST", "/api/v1/delivery", Some(json!({"order_id": order_id}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(delivery["status"], "assigned");
        assert_eq!(delivery["driver_id"], "driver1");
        let id = delivery["id"].as_str().unwrap();

        let (status, latest) = send(&app, "GET", &format!("/api/v1/delivery/order/{order_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(latest["id"], id);

        let (status, _) = send(&app, "POST", &format!("/api/v1/delivery/{id}/location?latitude=95&longitude=0"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, res) = send(
            &app,
            "POST",
            &format!("/api/v1/delivery/{id}/location?latitude=40.73&longitude=-73.99"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(res["current_location"], json!({"lat": 40.73, "lng": -73.99}));

        let (status, res) = send(&app, "PUT", &format!("/api/v1/delivery/{id}/status?status=picked_up"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(res["status"], "picked_up");

        let (_, track) = send(&app, "GET", &format!("/api/v1/delivery/{id}/track"), None).await;
        assert_eq!(track["driver"]["id"], "driver1");
        assert_eq!(track["current_location"]["lat"], 40.73);

        let (_, order_track) = send(&app, "GET", &format!("/api/v1/orders/{order_id}/track"), None).await;
        assert_eq!(order_track["current_location"]["lng"], -73.99);

        let (status, done) = send(&app, "POST", &format!("/api/v1/delivery/{id}/complete?signature=J.%20Doe"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(done["status"], "delivered");
        assert_eq!(done["signature_captured"], true);

        let (_, fetched) = send(&app, "GET", &format!("/api/v1/delivery/{id}"), None).await;
        assert_eq!(fetched["signature_blob"], format!("signatures/{id}"));

        let (status, signature) = send(&app, "GET", &format!("/api/v1/delivery/{id}/signature"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(signature["signature"], "J. Doe");

        let (_, order) = send(&app, "GET", &format!("/api/v1/orders/{order_id}"), None).await;
        assert_eq!(order["status"], "delivered");
    }

    #[tokio::test]
    async fn unsigned_delivery_has_no_signature() {
        let app = test_app().await;
        let (_, delivery) = send(&app, "POST", "/api/v1/delivery", Some(json!({"order_id": "external"}))).await;
        let id = delivery["id"].as_str().unwrap();

        let (status, done) = send(&app, "POST", &format!("/api/v1/delivery/{id}/complete"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(done["signature_captured"], false);

        let (status, body) = send(&app, "GET", &format!("/api/v1/delivery/{id}/signature"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Signature not found");
    }

    #[tokio::test]
    async fn missing_delivery_is_404() {
        let app = test_app().await;
        let (status, body) = send(&app, "GET", "/api/v1/delivery/order/none", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Delivery not found");

        let (status, body) = send(&app, "PUT", "/api/v1/delivery/none/status?status=picked_up", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Delivery not found");

        let (status, body) = send(&app, "POST", "/api/v1/delivery/none/location?latitude=40.7&longitude=-74.0", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Delivery not found");
    }

    // ── Customers ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn customer_crud() {
        let app = test_app().await;
        let body = json!({
            "name": "John Doe",
            "email": "john@example.com",
            "phone": "+1234567890",
            "address": "123 Main St",
            "preferences": {"dietary": ["vegetarian"]}
        });

        let (status, customer) = send(&app, "POST", "/api/v1/customers", Some(body.clone())).await;
        assert_eq!(status, StatusCode::OK);
        let id = customer["id"].as_str().unwrap();

        let mut update = body.clone();
        update["address"] = json!("9 New Rd");
        let (status, updated) = send(&app, "PUT", &format!("/api/v1/customers/{id}"), Some(update)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["address"], "9 New Rd");
        assert_eq!(updated["created_at"], customer["created_at"]);

        let (status, recs) = send(&app, "GET", &format!("/api/v1/customers/{id}/recommendations"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(recs["recommendations"][0]["menu_item"], "Popular dish of the day");

        let (status, res) = send(&app, "DELETE", &format!("/api/v1/customers/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(res["message"], "Customer deleted");

        let (status, res) = send(&app, "GET", &format!("/api/v1/customers/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(res["detail"], "Customer not found");
    }

    #[tokio::test]
    async fn invalid_customer_is_422() {
        let app = test_app().await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/customers",
            Some(json!({"name": "A", "email": "nope", "phone": "1", "address": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().unwrap().contains("email"));
    }

    // ── Catering firms ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn firm_menu_orders_and_analytics() {
        let app = test_app().await;
        let (status, firm) = send(&app, "POST", "/api/v1/catering-firms", Some(firm_body("Healthy Bites", &["Mediterranean"]))).await;
        assert_eq!(status, StatusCode::OK);
        let firm_id = firm["id"].as_str().unwrap();

        let (status, item) = send(
            &app,
            "POST",
            &format!("/api/v1/catering-firms/{firm_id}/menu"),
            Some(json!({
                "catering_firm_id": "ignored",
                "name": "Grilled Chicken Salad",
                "description": "Fresh",
                "price": 12.99,
                "category": "Main Course"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(item["catering_firm_id"], firm_id);

        let (_, fetched) = send(&app, "GET", &format!("/api/v1/catering-firms/{firm_id}"), None).await;
        assert_eq!(fetched["menu_items"].as_array().unwrap().len(), 1);

        let (_, found) = send(&app, "GET", "/api/v1/catering-firms?cuisine_type=mediterranean", None).await;
        assert_eq!(found.as_array().unwrap().len(), 1);
        let (_, none) = send(&app, "GET", "/api/v1/catering-firms?cuisine_type=Thai", None).await;
        assert!(none.as_array().unwrap().is_empty());

        let (status, _) = send(&app, "POST", "/api/v1/orders", Some(order_body(firm_id))).await;
        assert_eq!(status, StatusCode::OK);

        let (_, orders) = send(&app, "GET", &format!("/api/v1/catering-firms/{firm_id}/orders?status=validated"), None).await;
        assert_eq!(orders.as_array().unwrap().len(), 1);

        let (status, _) = send(&app, "GET", &format!("/api/v1/catering-firms/{firm_id}/orders?status=shipped"), None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, analytics) = send(&app, "GET", &format!("/api/v1/catering-firms/{firm_id}/analytics"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(analytics["total_orders"], 1);
        assert_eq!(analytics["revenue"], 25.98);
        assert_eq!(analytics["average_rating"], 4.5);
        assert_eq!(analytics["popular_items"][0]["quantity"], 2);
    }

    #[tokio::test]
    async fn menu_for_missing_firm_is_404() {
        let app = test_app().await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/catering-firms/ghost/menu",
            Some(json!({"name": "Soup", "description": "Hot", "price": 5.0, "category": "Starter"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Catering firm not found");
    }

    // ── Seed & monitoring ───────────────────────────────────────────────────

    #[tokio::test]
    async fn seed_then_list() {
        let app = test_app().await;
        let (status, res) = send(&app, "POST", "/api/v1/seed?count=4", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(res["seeded"], 4);

        let (_, firms) = send(&app, "GET", "/api/v1/catering-firms?limit=100", None).await;
        assert_eq!(firms.as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn business_metrics_are_recorded_and_exported() {
        let app = test_app().await;
        create_order(&app).await;
        create_order(&app).await;

        let (status, metrics) = send(&app, "GET", "/api/v1/monitoring/metrics", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(metrics["entry_count"], 2);
        assert_eq!(metrics["aggregated"][0]["name"], "orders.created");
        assert_eq!(metrics["aggregated"][0]["sample_count"], 2);

        let res = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/monitoring/metrics/csv")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.headers()["content-type"], "text/csv");
        let csv = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(String::from_utf8_lossy(&csv).lines().count(), 3);

        let (_, drained) = send(&app, "POST", "/api/v1/monitoring/queue/receive?max_messages=1", None).await;
        assert_eq!(drained["queue"], "orders-queue");
        assert_eq!(drained["messages"].as_array().unwrap().len(), 1);
        assert_eq!(drained["messages"][0]["body"]["type"], "order_created");

        let (_, cleared) = send(&app, "DELETE", "/api/v1/monitoring/metrics", None).await;
        assert_eq!(cleared["cleared"], 2);
        let (_, metrics) = send(&app, "GET", "/api/v1/monitoring/metrics", None).await;
        assert_eq!(metrics["entry_count"], 0);
    }
}
