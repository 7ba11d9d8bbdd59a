//! Response types for the API.

use gatehouse_core::{EventType, Timestamp, WebhookOutcome};
use serde::Serialize;

/// Body returned for an authenticated webhook delivery.
///
/// Informational only; GitHub ignores response bodies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookResponse {
    pub event_type: EventType,
    /// `enqueued`, `ignored` or `bot_sender`
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

impl From<&WebhookOutcome> for WebhookResponse {
    fn from(outcome: &WebhookOutcome) -> Self {
        Self {
            event_type: outcome.event_type(),
            outcome: outcome.label().to_string(),
            job_id: outcome.receipt().map(|receipt| receipt.job_id.to_string()),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: Timestamp,
    pub version: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: Timestamp::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
