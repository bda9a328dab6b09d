//! # Push-Relay Service
//!
//! HTTP surface of the push-relay gateway. The service exposes a single
//! webhook endpoint plus health probes, hands each delivery to the
//! [`pipeline::RelayPipeline`], and maps pipeline outcomes onto HTTP
//! responses:
//!
//! - every filtering outcome is a `200` carrying a machine-readable reason,
//!   so the producer treats understood-but-skipped deliveries as done
//! - a failed signature check is a `401` with no detail beyond the category
//! - credential and downstream failures are `500`s carrying a stable,
//!   non-sensitive error category
//!
//! Webhook secrets, private keys, and tokens never appear in responses or
//! logs at any level.

// Public modules
pub mod config;
pub mod pipeline;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing::{error, info, instrument, warn};

use github_app_client::{ApiError, AuthError};

use crate::config::RelayConfig;
use crate::pipeline::{PipelineOutcome, RelayPipeline};

/// Shared application state for HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration
    pub config: RelayConfig,

    /// The relay pipeline handling each delivery
    pub pipeline: Arc<RelayPipeline>,
}

/// Create the application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let max_body_size = state.config.server.max_body_size;

    Router::new()
        .route(&state.config.webhook.path, post(handle_webhook))
        .route("/health", get(handle_health_check))
        .route("/ready", get(handle_readiness_check))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(DefaultBodyLimit::max(max_body_size))
                .into_inner(),
        )
        .with_state(state)
}

/// Handle an inbound GitHub webhook delivery.
///
/// The raw body is handed to the pipeline untouched: signature verification
/// must see the exact bytes the producer signed.
#[instrument(skip(state, headers, body), fields(delivery_id))]
async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, RelayError> {
    let delivery_id = header_value(&headers, "x-github-delivery");
    if let Some(id) = &delivery_id {
        tracing::Span::current().record("delivery_id", id.as_str());
    }

    let event_type = header_value(&headers, "x-github-event");
    let signature = header_value(&headers, "x-hub-signature-256");

    let outcome = state
        .pipeline
        .handle(event_type.as_deref(), signature.as_deref(), &body)
        .await?;

    Ok(Json(WebhookResponse::from_outcome(outcome, delivery_id)))
}

/// Read a header as a UTF-8 string, treating unrepresentable values as
/// absent.
fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Liveness probe.
async fn handle_health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Readiness probe.
///
/// Configuration is validated before the server binds, so a serving process
/// is a ready process.
async fn handle_readiness_check() -> Json<ReadinessResponse> {
    Json(ReadinessResponse { ready: true })
}

/// Webhook processing response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookResponse {
    /// `"processed"` when a dispatch was sent, `"ignored"` otherwise
    pub status: String,

    /// Why the delivery was skipped, for ignored deliveries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Source repository, for processed deliveries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,

    /// Head commit that was relayed, for processed deliveries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,

    /// Delivery identifier echoed back from `X-GitHub-Delivery`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_id: Option<String>,
}

impl WebhookResponse {
    /// Build the response body for a pipeline outcome.
    fn from_outcome(outcome: PipelineOutcome, delivery_id: Option<String>) -> Self {
        match outcome {
            PipelineOutcome::Dispatched {
                repository,
                commit_sha,
            } => Self {
                status: "processed".to_string(),
                reason: None,
                repository: Some(repository),
                commit_sha: Some(commit_sha),
                delivery_id,
            },
            PipelineOutcome::Ignored { reason } => Self {
                status: "ignored".to_string(),
                reason: Some(reason),
                repository: None,
                commit_sha: None,
                delivery_id,
            },
        }
    }
}

/// Health check response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Readiness response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
}

/// Errors that abort webhook processing with a non-2xx response.
///
/// Filtering outcomes are not errors; they complete with a 200 so the
/// producer treats the delivery as handled. What remains is a failed
/// signature check and failures in the credential exchange or the
/// downstream dispatch.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The signature header is missing, malformed, or does not match.
    #[error("webhook signature verification failed")]
    Unauthorized,

    /// App credential handling or the token exchange failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The downstream dispatch call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Internal serialization failure.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl RelayError {
    /// Stable kebab-case category for error bodies and log fields.
    pub fn error_category(&self) -> &'static str {
        match self {
            Self::Unauthorized => "invalid-signature",
            Self::Auth(e) => e.error_category(),
            Self::Api(e) => e.error_category(),
            Self::Internal { .. } => "internal",
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        match &self {
            Self::Unauthorized => warn!("rejecting webhook delivery with invalid signature"),
            other => error!(
                error = %other,
                category = other.error_category(),
                "webhook processing failed"
            ),
        }

        // The category is the whole public story; details stay in the logs.
        let body = serde_json::json!({
            "error": self.error_category(),
            "status": status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        (status, Json(body)).into_response()
    }
}

/// Service-level errors for server startup and shutdown.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Failed to bind to the configured address.
    #[error("Failed to bind to {address}: {message}")]
    BindFailed { address: String, message: String },

    /// The server failed while running.
    #[error("Server error: {message}")]
    ServerFailed { message: String },
}

/// Start the HTTP server and block until shutdown.
///
/// Binds the configured address and drains in-flight requests when the
/// process receives ctrl-c or, on Unix, `SIGTERM`.
pub async fn start_server(
    config: RelayConfig,
    pipeline: Arc<RelayPipeline>,
) -> Result<(), ServiceError> {
    let address = format!("{}:{}", config.server.host, config.server.port);
    let addr: SocketAddr = address
        .parse()
        .map_err(|e: std::net::AddrParseError| ServiceError::BindFailed {
            address: address.clone(),
            message: e.to_string(),
        })?;

    let state = AppState { config, pipeline };
    let app = create_router(state);

    let listener =
        tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServiceError::BindFailed {
                address: address.clone(),
                message: e.to_string(),
            })?;

    info!(address = %address, "HTTP server listening");

    let shutdown_signal = async {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C signal handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
            _ = terminate => info!("Received SIGTERM, shutting down"),
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| ServiceError::ServerFailed {
            message: e.to_string(),
        })?;

    info!("HTTP server shutdown complete");
    Ok(())
}

#[cfg(test)]
mod test_keys;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
