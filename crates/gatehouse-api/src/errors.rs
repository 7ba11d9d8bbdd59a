//! Error types for the HTTP service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use gatehouse_core::{DispatchError, WebhookError};
use tracing::{error, warn};

/// Webhook handler errors with HTTP status code mapping
///
/// - `401 Unauthorized`: signature verification failed; nothing was parsed
/// - `400 Bad Request`: the body is not a JSON object
/// - `413 Payload Too Large`: the body exceeds the configured limit
/// - `500 Internal Server Error`: the job could not be submitted
///
/// Messages returned to clients are sanitized. Details are logged
/// server-side and can be matched through the `x-correlation-id` header.
#[derive(Debug, thiserror::Error)]
pub enum WebhookHandlerError {
    /// Maps to: `401 Unauthorized`
    #[error("Webhook signature verification failed")]
    Unauthorized,

    /// Maps to: `400 Bad Request`
    #[error("Malformed payload: {message}")]
    MalformedPayload { message: String },

    /// Maps to: `413 Payload Too Large`
    #[error("Payload too large (max: {max_size} bytes)")]
    PayloadTooLarge { max_size: usize },

    /// Maps to: `500 Internal Server Error`
    ///
    /// The provider redelivers failed webhooks; the gateway does not retry.
    #[error("Job submission failed: {0}")]
    SubmissionFailed(#[source] DispatchError),
}

impl WebhookHandlerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::MalformedPayload { .. } => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::SubmissionFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<WebhookError> for WebhookHandlerError {
    fn from(error: WebhookError) -> Self {
        match error {
            WebhookError::Unauthorized => Self::Unauthorized,
            WebhookError::MalformedPayload { message } => Self::MalformedPayload { message },
            WebhookError::Dispatch(e) => Self::SubmissionFailed(e),
        }
    }
}

impl IntoResponse for WebhookHandlerError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            Self::Unauthorized => {
                warn!("Rejected webhook with invalid signature");
                self.to_string()
            }
            Self::MalformedPayload { message } => {
                warn!(error = %message, "Rejected malformed webhook payload");
                "Malformed payload: expected a JSON object".to_string()
            }
            Self::PayloadTooLarge { max_size } => {
                warn!(max_size = max_size, "Payload too large");
                self.to_string()
            }
            Self::SubmissionFailed(e) => {
                // Log detailed error server-side but return generic message to client
                error!(error = %e, transient = e.is_transient(), "Job submission failed");
                "Job submission failed. The delivery can be retried.".to_string()
            }
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        (status, Json(body)).into_response()
    }
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Metrics initialization failed: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Failed to load configuration: {message}")]
    Load { message: String },
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;
