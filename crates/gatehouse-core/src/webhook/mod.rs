//! # Webhook Intake Module
//!
//! Request model for incoming GitHub webhooks, the read-only [`EventPayload`]
//! view built from it, event classification, and the processing pipeline that
//! ties authentication, admission and dispatch together.

use crate::{
    admission::RejectReason, dispatch::DispatchError, ErrorCategory, EventType, JobReceipt,
    SourceRoute, UserId,
};
use bytes::Bytes;
use serde_json::{Map, Value};
use std::collections::HashMap;

mod classifier;
mod pipeline;

pub use classifier::classify;
pub use pipeline::{WebhookPipeline, WebhookProcessor};

/// Header carrying the provider event name
pub const EVENT_HEADER: &str = "x-github-event";

/// Header carrying the unique delivery identifier
pub const DELIVERY_HEADER: &str = "x-github-delivery";

/// Header carrying the HMAC-SHA256 signature (`sha256=<hex>`)
pub const SIGNATURE_256_HEADER: &str = "x-hub-signature-256";

/// Legacy header carrying the HMAC-SHA1 signature (`sha1=<hex>`)
pub const SIGNATURE_SHA1_HEADER: &str = "x-hub-signature";

// ============================================================================
// Core Types
// ============================================================================

/// Raw HTTP request data for one webhook delivery
#[derive(Debug, Clone)]
pub struct WebhookRequest {
    pub route: SourceRoute,
    pub headers: WebhookHeaders,
    pub body: Bytes,
}

impl WebhookRequest {
    /// Create new webhook request
    pub fn new(route: SourceRoute, headers: WebhookHeaders, body: Bytes) -> Self {
        Self {
            route,
            headers,
            body,
        }
    }

    /// Declared event type header, if present
    pub fn event_header(&self) -> Option<&str> {
        self.headers.event_type.as_deref()
    }

    /// Delivery ID header, if present
    pub fn delivery_id(&self) -> Option<&str> {
        self.headers.delivery_id.as_deref()
    }
}

/// GitHub-specific HTTP headers used by the gateway.
///
/// None of them is required at this level: a missing signature fails
/// authentication, a missing event header classifies as unknown.
#[derive(Debug, Clone, Default)]
pub struct WebhookHeaders {
    pub event_type: Option<String>,     // X-GitHub-Event
    pub delivery_id: Option<String>,    // X-GitHub-Delivery
    pub signature_256: Option<String>,  // X-Hub-Signature-256
    pub signature_sha1: Option<String>, // X-Hub-Signature
}

impl WebhookHeaders {
    /// Parse headers from an HTTP header map.
    ///
    /// Header names are matched case-insensitively.
    pub fn from_http_headers(headers: &HashMap<String, String>) -> Self {
        let lookup = |name: &str| -> Option<String> {
            headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.clone())
        };

        Self {
            event_type: lookup(EVENT_HEADER),
            delivery_id: lookup(DELIVERY_HEADER),
            signature_256: lookup(SIGNATURE_256_HEADER),
            signature_sha1: lookup(SIGNATURE_SHA1_HEADER),
        }
    }
}

/// Parsed, read-only view of a webhook delivery.
///
/// Built once per request. The event type is derived from the route and the
/// declared header at construction and cannot change afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct EventPayload {
    event_type: EventType,
    raw_body: Map<String, Value>,
    sender_id: Option<UserId>,
    source_route: SourceRoute,
    declared_event_header: Option<String>,
    delivery_id: Option<String>,
}

impl EventPayload {
    /// Build a payload from an already parsed JSON object.
    ///
    /// The declared header is kept only for the unified integration route.
    pub fn new(
        source_route: SourceRoute,
        declared_event_header: Option<String>,
        delivery_id: Option<String>,
        raw_body: Map<String, Value>,
    ) -> Self {
        let declared_event_header =
            declared_event_header.filter(|_| source_route.reads_event_header());
        let event_type = classify(source_route, declared_event_header.as_deref());
        let sender_id = raw_body
            .get("sender")
            .and_then(|sender| sender.get("id"))
            .and_then(Value::as_u64)
            .map(UserId::new);

        Self {
            event_type,
            raw_body,
            sender_id,
            source_route,
            declared_event_header,
            delivery_id,
        }
    }

    /// Parse the request body and build the payload.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::MalformedPayload`] if the body is not valid JSON
    /// or is not a JSON object.
    pub fn from_request(request: &WebhookRequest) -> Result<Self, WebhookError> {
        let body: Value =
            serde_json::from_slice(&request.body).map_err(|e| WebhookError::MalformedPayload {
                message: e.to_string(),
            })?;

        let Value::Object(raw_body) = body else {
            return Err(WebhookError::MalformedPayload {
                message: "expected a JSON object".to_string(),
            });
        };

        Ok(Self::new(
            request.route,
            request.headers.event_type.clone(),
            request.headers.delivery_id.clone(),
            raw_body,
        ))
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn raw_body(&self) -> &Map<String, Value> {
        &self.raw_body
    }

    pub fn sender_id(&self) -> Option<UserId> {
        self.sender_id
    }

    pub fn source_route(&self) -> SourceRoute {
        self.source_route
    }

    pub fn declared_event_header(&self) -> Option<&str> {
        self.declared_event_header.as_deref()
    }

    pub fn delivery_id(&self) -> Option<&str> {
        self.delivery_id.as_deref()
    }

    /// Value at a nested path, e.g. `["installation", "id"]`
    pub fn field(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        rest.iter()
            .try_fold(self.raw_body.get(*first)?, |value, key| value.get(*key))
    }

    /// Top-level string field
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.raw_body.get(key).and_then(Value::as_str)
    }

    /// The whole body as a JSON value
    pub fn body_value(&self) -> Value {
        Value::Object(self.raw_body.clone())
    }
}

/// Result of processing a delivery that passed authentication
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    /// A job was submitted to the job sink
    Enqueued {
        event_type: EventType,
        receipt: JobReceipt,
    },
    /// The event was not admitted; not an error
    Ignored {
        event_type: EventType,
        reason: RejectReason,
    },
    /// The event was sent by the service's own bot account
    BotSender { event_type: EventType },
}

impl WebhookOutcome {
    pub fn event_type(&self) -> EventType {
        match self {
            Self::Enqueued { event_type, .. } => *event_type,
            Self::Ignored { event_type, .. } => *event_type,
            Self::BotSender { event_type } => *event_type,
        }
    }

    pub fn receipt(&self) -> Option<&JobReceipt> {
        match self {
            Self::Enqueued { receipt, .. } => Some(receipt),
            _ => None,
        }
    }

    pub fn is_bot_sender(&self) -> bool {
        matches!(self, Self::BotSender { .. })
    }

    /// Short label for logs and responses
    pub fn label(&self) -> &'static str {
        match self {
            Self::Enqueued { .. } => "enqueued",
            Self::Ignored { .. } => "ignored",
            Self::BotSender { .. } => "bot_sender",
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Top-level error for webhook processing failures.
///
/// A non-admitted event is not an error; see [`WebhookOutcome::Ignored`].
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Webhook signature verification failed")]
    Unauthorized,

    #[error("Malformed payload: {message}")]
    MalformedPayload { message: String },

    #[error("Dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),
}

impl WebhookError {
    /// Check if a redelivery of the same webhook could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unauthorized => false,
            Self::MalformedPayload { .. } => false,
            Self::Dispatch(e) => e.is_transient(),
        }
    }

    /// Get error category for monitoring
    pub fn error_category(&self) -> ErrorCategory {
        match self {
            Self::Unauthorized => ErrorCategory::Security,
            Self::MalformedPayload { .. } => ErrorCategory::Permanent,
            Self::Dispatch(e) if e.is_transient() => ErrorCategory::Transient,
            Self::Dispatch(_) => ErrorCategory::Permanent,
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
