//! Tests for the HTTP surface: routing, response shapes, and error mapping.

use axum::body::Body;
use axum::http::Request;
use tower::ServiceExt;

use super::*;
use crate::test_keys::TEST_PKCS8_KEY;

// ============================================================================
// Helpers
// ============================================================================

/// Application state wired against unreachable backends.
///
/// Good enough for requests that fail or finish before any outbound call.
fn test_state() -> AppState {
    test_state_with(|_| {})
}

/// Application state with configuration tweaks applied before the pipeline
/// is built.
fn test_state_with(mutate: impl FnOnce(&mut RelayConfig)) -> AppState {
    let mut config = RelayConfig::default();
    config.webhook.secret = "test-webhook-secret".to_string();
    config.github.app_id = 99;
    config.github.private_key = Some(TEST_PKCS8_KEY.to_string());
    config.github.organization = "acme".to_string();
    config.registry.base_url = "http://127.0.0.1:9".to_string();
    config.registry.credential = "unused".to_string();
    config.dispatch.repository = "acme/relay-target".to_string();
    mutate(&mut config);

    let pipeline = Arc::new(RelayPipeline::from_config(&config).unwrap());
    AppState { config, pipeline }
}

async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ============================================================================
// Routing
// ============================================================================

/// Verify GET /health reports the service healthy with its version.
#[tokio::test]
async fn test_health_endpoint_reports_healthy() {
    let app = create_router(test_state());

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

/// Verify GET /ready reports readiness.
#[tokio::test]
async fn test_readiness_endpoint_reports_ready() {
    let app = create_router(test_state());

    let request = Request::builder()
        .method("GET")
        .uri("/ready")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["ready"], true);
}

/// Verify GET on the webhook path is rejected; only POST is routed.
#[tokio::test]
async fn test_webhook_get_method_not_allowed() {
    let app = create_router(test_state());

    let request = Request::builder()
        .method("GET")
        .uri("/")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

/// Verify unknown paths return 404.
#[tokio::test]
async fn test_unknown_path_returns_404() {
    let app = create_router(test_state());

    let request = Request::builder()
        .method("POST")
        .uri("/unknown")
        .body(Body::from("{}"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Verify the webhook endpoint follows the configured path.
#[tokio::test]
async fn test_custom_webhook_path_is_served() {
    let app = create_router(test_state_with(|config| {
        config.webhook.path = "/hooks/github".to_string();
    }));

    let on_custom_path = Request::builder()
        .method("POST")
        .uri("/hooks/github")
        .body(Body::from("{}"))
        .unwrap();
    let response = app.clone().oneshot(on_custom_path).await.unwrap();
    // Routed: the unsigned request makes it to the signature check.
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let on_root = Request::builder()
        .method("POST")
        .uri("/")
        .body(Body::from("{}"))
        .unwrap();
    let response = app.oneshot(on_root).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Webhook handler
// ============================================================================

/// Verify a request without a signature header is rejected before the
/// payload is interpreted.
#[tokio::test]
async fn test_webhook_without_signature_is_unauthorized() {
    let app = create_router(test_state());

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json")
        .header("x-github-event", "push")
        .body(Body::from(r#"{"anything": true}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "invalid-signature");
    assert_eq!(body["status"], 401);
}

/// Verify bodies over the configured cap are refused outright.
#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let app = create_router(test_state_with(|config| {
        config.server.max_body_size = 1024;
    }));

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("x-github-event", "push")
        .header("x-hub-signature-256", "sha256=00")
        .body(Body::from(vec![b'x'; 4096]))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

// ============================================================================
// Response shapes
// ============================================================================

/// Verify ignored responses carry only the status, reason, and delivery id.
#[test]
fn test_ignored_response_omits_dispatch_fields() {
    let response = WebhookResponse::from_outcome(
        PipelineOutcome::Ignored {
            reason: "no tracked file changed".to_string(),
        },
        Some("delivery-42".to_string()),
    );

    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(value["status"], "ignored");
    assert_eq!(value["reason"], "no tracked file changed");
    assert_eq!(value["delivery_id"], "delivery-42");
    assert!(value.get("repository").is_none());
    assert!(value.get("commit_sha").is_none());
}

/// Verify processed responses describe what was relayed.
#[test]
fn test_processed_response_carries_dispatch_fields() {
    let response = WebhookResponse::from_outcome(
        PipelineOutcome::Dispatched {
            repository: "acme/widgets".to_string(),
            commit_sha: "0a1b2c3d".to_string(),
        },
        None,
    );

    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(value["status"], "processed");
    assert_eq!(value["repository"], "acme/widgets");
    assert_eq!(value["commit_sha"], "0a1b2c3d");
    assert!(value.get("reason").is_none());
    assert!(value.get("delivery_id").is_none());
}

// ============================================================================
// Error mapping
// ============================================================================

/// Verify the signature failure maps to 401 with its category and nothing
/// else.
#[tokio::test]
async fn test_unauthorized_error_maps_to_401() {
    let response = RelayError::Unauthorized.into_response();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "invalid-signature");
}

/// Verify credential failures map to 500 with a stable category and no key
/// material in the body.
#[tokio::test]
async fn test_auth_error_maps_to_500_with_category() {
    let error = RelayError::from(AuthError::UnsupportedKeyFormat {
        message: "PKCS#1 framing".to_string(),
    });
    let response = error.into_response();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], "key-import-failure");
    assert_eq!(body["status"], 500);
}

/// Verify a dispatch coverage failure surfaces its category.
#[tokio::test]
async fn test_dispatch_error_category_is_exposed() {
    let error = RelayError::from(ApiError::RepositoryNotCovered {
        repository: "acme/relay-target".to_string(),
    });
    let response = error.into_response();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "repository-not-covered-by-installation");
}

/// Verify categories stay stable; downstream consumers match on them.
#[test]
fn test_error_categories_are_stable() {
    assert_eq!(RelayError::Unauthorized.error_category(), "invalid-signature");
    assert_eq!(
        RelayError::Internal {
            message: "x".to_string()
        }
        .error_category(),
        "internal"
    );
    assert_eq!(
        RelayError::from(ApiError::TokenRejected).error_category(),
        "invalid-token"
    );
    assert_eq!(
        RelayError::from(AuthError::SigningFailed {
            message: "x".to_string()
        })
        .error_category(),
        "jwt-minting-failure"
    );
}
