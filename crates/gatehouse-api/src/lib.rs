//! # Gatehouse HTTP Service
//!
//! HTTP surface of the Gatehouse webhook gateway.
//!
//! Routes:
//! - `POST /webhooks/pull_request`: deliveries classified as `pull_request`
//! - `POST /webhooks/issue_comment`: deliveries classified as `issue_comment`
//! - `POST /webhooks/integration`: deliveries classified by `X-GitHub-Event`
//! - `GET /health`: liveness
//! - `GET /metrics`: Prometheus counters
//!
//! All webhook routes share one handler; the route only selects the
//! [`SourceRoute`] handed to the [`WebhookProcessor`].

pub mod config;
pub mod errors;
pub mod metrics;
pub mod responses;

pub use config::{
    JobBackend, JobsConfig, LoggingConfig, ServerConfig, ServiceConfig, WebhookConfig,
};
pub use errors::{ConfigError, ServiceError, WebhookHandlerError};
pub use metrics::GatewayMetrics;
pub use responses::{HealthResponse, WebhookResponse};

use axum::{
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use gatehouse_core::{
    webhook::{WebhookError, WebhookHeaders, WebhookProcessor, WebhookRequest},
    SourceRoute,
};
use std::{collections::HashMap, future::IntoFuture, sync::Arc, time::Duration};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{debug, error, info, instrument, warn};

/// Header used to correlate a request with its log lines
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration for the service
    pub config: Arc<ServiceConfig>,

    /// Authentication, admission and dispatch for every delivery
    pub processor: Arc<dyn WebhookProcessor>,

    /// Gateway counters
    pub metrics: Arc<GatewayMetrics>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        config: ServiceConfig,
        processor: Arc<dyn WebhookProcessor>,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            processor,
            metrics,
        }
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Create HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let webhook_routes = SourceRoute::ALL
        .into_iter()
        .fold(Router::<AppState>::new(), |router, route| {
            router.route(
                route.path(),
                post(
                    move |state: State<AppState>,
                          headers: HeaderMap,
                          body: Result<Bytes, BytesRejection>| {
                        handle_webhook(route, state, headers, body)
                    },
                ),
            )
        });

    let observability_routes = Router::<AppState>::new()
        .route("/health", get(handle_health_check))
        .route("/metrics", get(metrics_endpoint));

    let max_body_size = state.config.server.max_body_size;
    let request_timeout = state.config.server.request_timeout();

    Router::new()
        .merge(webhook_routes)
        .merge(observability_routes)
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(request_logging_middleware))
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    request_timeout,
                ))
                .into_inner(),
        )
        .with_state(state)
}

/// Start HTTP server and run until SIGINT or SIGTERM.
///
/// In-flight requests get `server.shutdown_timeout_seconds` to complete
/// after the signal.
pub async fn start_server(
    config: ServiceConfig,
    processor: Arc<dyn WebhookProcessor>,
) -> Result<(), ServiceError> {
    let metrics = GatewayMetrics::new()?;
    let address = config.server.bind_address();
    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);

    let app = create_router(AppState::new(config, processor, metrics));

    let listener =
        tokio::net::TcpListener::bind(&address)
            .await
            .map_err(|e| ServiceError::BindFailed {
                address: address.clone(),
                message: e.to_string(),
            })?;

    info!(address = %address, "Starting HTTP server");

    let (signalled_tx, signalled_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        let _ = signalled_tx.send(());
    });

    let drain_deadline = async move {
        if signalled_rx.await.is_ok() {
            tokio::time::sleep(shutdown_timeout).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = server.into_future() => {
            result.map_err(|e| ServiceError::ServerFailed {
                message: e.to_string(),
            })?;
        }
        _ = drain_deadline => {
            warn!(
                timeout_seconds = shutdown_timeout.as_secs(),
                "Graceful shutdown timed out; abandoning in-flight requests"
            );
        }
    }

    info!("HTTP server shutdown complete");
    Ok(())
}

/// Resolves on SIGINT (Ctrl+C) or, on unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C), initiating graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}

// ============================================================================
// Webhook Handlers
// ============================================================================

/// Handle a webhook delivery on any ingestion route.
///
/// - `202 Accepted`: authenticated and processed, whether or not a job was
///   enqueued
/// - `200 OK`: authenticated, sent by the bot account, not processed
/// - errors map through [`WebhookHandlerError`]
#[instrument(skip_all, fields(route = %route))]
pub async fn handle_webhook(
    route: SourceRoute,
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, WebhookHandlerError> {
    state.metrics.record_received(route);

    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            WebhookHandlerError::PayloadTooLarge {
                max_size: state.config.server.max_body_size,
            }
        } else {
            WebhookHandlerError::MalformedPayload {
                message: rejection.body_text(),
            }
        }
    })?;

    let header_map: HashMap<String, String> = headers
        .iter()
        .map(|(k, v)| {
            (
                k.as_str().to_lowercase(),
                v.to_str().unwrap_or("").to_string(),
            )
        })
        .collect();

    let request = WebhookRequest::new(route, WebhookHeaders::from_http_headers(&header_map), body);

    let outcome = match state.processor.process_webhook(request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            debug!(category = ?e.error_category(), error = %e, "Webhook processing failed");
            match &e {
                WebhookError::Unauthorized => state.metrics.webhooks_unauthorized_total.inc(),
                WebhookError::Dispatch(_) => state.metrics.job_submission_failures_total.inc(),
                WebhookError::MalformedPayload { .. } => {}
            }
            return Err(e.into());
        }
    };

    state.metrics.record_outcome(&outcome);

    let status = if outcome.is_bot_sender() {
        StatusCode::OK
    } else {
        StatusCode::ACCEPTED
    };

    Ok((status, Json(WebhookResponse::from(&outcome))).into_response())
}

// ============================================================================
// Observability Handlers
// ============================================================================

/// Liveness check
async fn handle_health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Prometheus metrics endpoint
#[instrument(skip_all)]
async fn metrics_endpoint(State(state): State<AppState>) -> Result<String, StatusCode> {
    state.metrics.encode().map_err(|e| {
        error!(error = %e, "Failed to encode metrics");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

// ============================================================================
// Middleware
// ============================================================================

/// Request logging middleware with correlation ID tracking
///
/// Reuses the caller's `x-correlation-id` when present and generates a UUID
/// otherwise. The ID is recorded on the request span, stored in the request
/// extensions and echoed on the response.
#[instrument(skip(request, next), fields(
    method = %request.method(),
    uri = %request.uri(),
    correlation_id
))]
async fn request_logging_middleware(
    mut request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let start = std::time::Instant::now();

    let correlation_id = request
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    tracing::Span::current().record("correlation_id", correlation_id.as_str());
    request.extensions_mut().insert(correlation_id.clone());

    let mut response = next.run(request).await;
    let duration_ms = start.elapsed().as_millis();

    if let Ok(header_value) = HeaderValue::from_str(&correlation_id) {
        response
            .headers_mut()
            .insert(CORRELATION_ID_HEADER, header_value);
    }

    let status = response.status();
    if status.is_server_error() {
        error!(status = %status, duration_ms = %duration_ms, "Request completed with server error");
    } else if status.is_client_error() {
        warn!(status = %status, duration_ms = %duration_ms, "Request completed with client error");
    } else {
        info!(status = %status, duration_ms = %duration_ms, "Request completed");
    }

    response
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
