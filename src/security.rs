//! Request hardening: response headers, content screening, API keys and
//! the hashing/signature helpers behind them.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::services::Integrations;

type HmacSha256 = Hmac<Sha256>;

/// Paths that bypass content screening and API-key checks.
const PUBLIC_PATHS: &[&str] = &["/health", "/", "/docs", "/openapi.json"];

/// Largest request body the content screen will buffer.
pub const MAX_SCREENED_BODY: usize = 2 * 1024 * 1024;

fn is_public(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path)
}

// ── Middleware ────────────────────────────────────────────────────────────────

pub async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        header::HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        header::X_FRAME_OPTIONS,
        header::HeaderValue::from_static("DENY"),
    );
    headers.insert(
        header::X_XSS_PROTECTION,
        header::HeaderValue::from_static("1; mode=block"),
    );
    headers.insert(
        header::STRICT_TRANSPORT_SECURITY,
        header::HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );

    response
}

/// Screens the text of `POST`/`PUT` bodies before they reach a handler.
pub async fn content_safety(
    State(integrations): State<Arc<Integrations>>,
    request: Request,
    next: Next,
) -> Response {
    let screened = *request.method() == Method::POST || *request.method() == Method::PUT;
    if !screened || is_public(request.uri().path()) {
        return next.run(request).await;
    }

    let (parts, body) = request.into_parts();
    let bytes = match to_bytes(body, MAX_SCREENED_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, path = %parts.uri.path(), "Could not buffer request body");
            return rejected();
        }
    };

    if !bytes.is_empty() {
        let text = screened_text(&bytes);
        let analysis = integrations.content_safety.analyze_text(&text).await;
        if !analysis.is_safe {
            warn!(path = %parts.uri.path(), severity = %analysis.severity, "Unsafe content rejected");
            return rejected();
        }
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

fn rejected() -> Response {
    AppError::BadRequest("Content safety validation failed".to_string()).into_response()
}

/// The string values of a JSON body, or the raw text when it is not JSON.
fn screened_text(bytes: &[u8]) -> String {
    match serde_json::from_slice::<serde_json::Value>(bytes) {
        Ok(value) => {
            let mut out = Vec::new();
            collect_strings(&value, &mut out);
            out.join(" ")
        }
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn collect_strings<'a>(value: &'a serde_json::Value, out: &mut Vec<&'a str>) {
    match value {
        serde_json::Value::String(s) => out.push(s),
        serde_json::Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        serde_json::Value::Object(map) => map.values().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}

/// Enforced only when API keys are configured.
pub async fn require_api_key(
    State(config): State<Arc<Config>>,
    request: Request,
    next: Next,
) -> Response {
    if config.api_keys.is_empty() || is_public(request.uri().path()) {
        return next.run(request).await;
    }

    match extract_api_key(request.headers()) {
        Some(key) if verify_api_key(&key, &config.api_keys) => next.run(request).await,
        Some(_) => {
            warn!(path = %request.uri().path(), "Unknown API key");
            AppError::Unauthorized("Invalid API key".to_string()).into_response()
        }
        None => {
            debug!(path = %request.uri().path(), "Missing API key");
            AppError::Unauthorized("API key required".to_string()).into_response()
        }
    }
}

fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    if let Some(raw) = headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        let key = raw.trim();
        if !key.is_empty() {
            return Some(key.to_string());
        }
    }

    if let Some(raw) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(bearer) = raw.trim().strip_prefix("Bearer ") {
            let key = bearer.trim();
            if !key.is_empty() {
                return Some(key.to_string());
            }
        }
    }

    None
}

// ── Helpers ───────────────────────────────────────────────────────────────────

pub fn verify_api_key(candidate: &str, configured: &[String]) -> bool {
    if candidate.is_empty() || configured.is_empty() {
        return false;
    }
    let digest = Sha256::digest(candidate.as_bytes());
    configured
        .iter()
        .any(|key| Sha256::digest(key.as_bytes()) == digest)
}

/// SHA-256 hex digest, for logging identifiers without exposing them.
pub fn hash_sensitive_data(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}

/// Checks a hex-encoded HMAC-SHA256 of `payload` keyed with `secret`.
pub fn verify_webhook_signature(payload: &[u8], signature_hex: &str, secret: &str) -> bool {
    let Ok(signature) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, middleware, routing::get, routing::post, Router};
    use tokio::sync::RwLock;
    use tower::ServiceExt;

    use crate::config::AzureConfig;
    use crate::metrics::MetricsStore;

    fn sign(payload: &[u8], secret: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    fn config_with_keys(keys: &[&str]) -> Arc<Config> {
        let keys = keys.join(",");
        Arc::new(
            Config::from_lookup(|k| match k {
                "SECRET_KEY" => Some("test-secret".to_string()),
                "API_KEYS" => Some(keys.clone()),
                _ => None,
            })
            .unwrap(),
        )
    }

    fn keyed_router(config: Arc<Config>) -> Router {
        Router::new()
            .route("/health", get(|| async { "ok" }))
            .route("/api/v1/orders", get(|| async { "orders" }))
            .layer(middleware::from_fn_with_state(config, require_api_key))
    }

    #[test]
    fn api_key_membership() {
        let keys = vec!["alpha".to_string(), "beta".to_string()];
        assert!(verify_api_key("beta", &keys));
        assert!(!verify_api_key("gamma", &keys));
        assert!(!verify_api_key("", &keys));
        assert!(!verify_api_key("alpha", &[]));
    }

    #[test]
    fn hashing_is_sha256_hex() {
        let h = hash_sensitive_data("test_data");
        assert_eq!(h.len(), 64);
        assert_eq!(h, hash_sensitive_data("test_data"));
        assert_ne!(h, hash_sensitive_data("other"));
        assert_eq!(
            hash_sensitive_data(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn webhook_signatures() {
        let payload = br#"{"event":"order.delivered"}"#;
        let good = sign(payload, "hook-secret");

        assert!(verify_webhook_signature(payload, &good, "hook-secret"));
        assert!(!verify_webhook_signature(payload, &good, "other-secret"));
        assert!(!verify_webhook_signature(b"tampered", &good, "hook-secret"));
        assert!(!verify_webhook_signature(payload, "not-hex", "hook-secret"));
        assert!(!verify_webhook_signature(payload, "", "hook-secret"));
    }

    #[test]
    fn screened_text_walks_json_strings() {
        let body = br#"{"name":"Ada","items":[{"note":"no onions","qty":2}],"ok":true}"#;
        let text = screened_text(body);
        assert!(text.contains("Ada"));
        assert!(text.contains("no onions"));
        assert!(!text.contains("qty"));

        assert_eq!(screened_text(b"plain words"), "plain words");
    }

    #[tokio::test]
    async fn headers_are_added() {
        let app = Router::new()
            .route("/", get(|| async { "hi" }))
            .layer(middleware::from_fn(security_headers));

        let res = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let h = res.headers();
        assert_eq!(h["x-content-type-options"], "nosniff");
        assert_eq!(h["x-frame-options"], "DENY");
        assert_eq!(h["x-xss-protection"], "1; mode=block");
        assert!(h.contains_key("strict-transport-security"));
    }

    #[tokio::test]
    async fn screened_body_reaches_handler_intact() {
        let metrics = Arc::new(RwLock::new(MetricsStore::new()));
        let integrations = Arc::new(Integrations::from_config(&AzureConfig::default(), metrics));
        let app = Router::new()
            .route("/echo", post(|body: String| async move { body }))
            .layer(middleware::from_fn_with_state(integrations, content_safety));

        let res = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/echo")
                    .body(Body::from(r#"{"note":"extra greens"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], br#"{"note":"extra greens"}"#);
    }

    #[tokio::test]
    async fn keys_not_enforced_when_unconfigured() {
        let app = keyed_router(config_with_keys(&[]));
        let res = app
            .oneshot(Request::builder().uri("/api/v1/orders").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn configured_keys_are_enforced() {
        let config = config_with_keys(&["k1", "k2"]);

        let missing = keyed_router(config.clone())
            .oneshot(Request::builder().uri("/api/v1/orders").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let wrong = keyed_router(config.clone())
            .oneshot(
                Request::builder()
                    .uri("/api/v1/orders")
                    .header("X-API-Key", "nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

        let header_key = keyed_router(config.clone())
            .oneshot(
                Request::builder()
                    .uri("/api/v1/orders")
                    .header("X-API-Key", "k2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(header_key.status(), StatusCode::OK);

        let bearer = keyed_router(config.clone())
            .oneshot(
                Request::builder()
                    .uri("/api/v1/orders")
                    .header("Authorization", "Bearer k1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(bearer.status(), StatusCode::OK);

        let public = keyed_router(config)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(public.status(), StatusCode::OK);
    }
}
