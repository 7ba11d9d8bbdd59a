//! # Gatehouse Core
//!
//! Core logic for the Gatehouse webhook ingestion gateway.
//!
//! This crate authenticates, classifies, filters and dispatches GitHub webhook
//! deliveries. It never interprets the business meaning of an event: admitted
//! events are handed to a [`jobs::JobSink`] as jobs and processed elsewhere.
//!
//! ## Architecture
//!
//! - [`webhook::classify`] maps an ingestion route (and, on the unified route,
//!   the `X-GitHub-Event` header) to an [`EventType`]
//! - [`admission::AdmissionPolicy`] decides whether an event produces work
//! - [`dispatch::Dispatcher`] turns an admitted decision into exactly one job
//!   submission
//! - [`webhook::WebhookPipeline`] runs the whole sequence behind the
//!   [`webhook::WebhookProcessor`] trait
//!
//! External collaborators ([`signature::SignatureVerifier`],
//! [`jobs::JobSink`]) are trait objects injected at runtime.
//!
//! ## Usage
//!
//! ```rust
//! use gatehouse_core::{webhook::classify, EventType, SourceRoute};
//!
//! assert_eq!(classify(SourceRoute::PullRequest, None), EventType::PullRequest);
//! assert_eq!(
//!     classify(SourceRoute::Integration, Some("push")),
//!     EventType::Push
//! );
//! assert_eq!(
//!     classify(SourceRoute::Integration, Some("deployment")),
//!     EventType::Unknown
//! );
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use ulid::Ulid;

// ============================================================================
// Event Classification Types
// ============================================================================

/// Logical category of a webhook delivery.
///
/// The set is closed: any header value outside it classifies as
/// [`EventType::Unknown`], which is never admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PullRequest,
    IssueComment,
    InstallationRepositories,
    Push,
    PullRequestReview,
    Unknown,
}

impl EventType {
    /// Every recognised event type, in declaration order.
    pub const KNOWN: [EventType; 5] = [
        Self::PullRequest,
        Self::IssueComment,
        Self::InstallationRepositories,
        Self::Push,
        Self::PullRequestReview,
    ];

    /// Match a provider event name exactly.
    ///
    /// Returns [`EventType::Unknown`] for anything that is not one of the
    /// [`EventType::KNOWN`] names. Matching is case-sensitive.
    pub fn from_event_name(name: &str) -> Self {
        Self::KNOWN
            .into_iter()
            .find(|known| known.as_str() == name)
            .unwrap_or(Self::Unknown)
    }

    /// Provider event name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PullRequest => "pull_request",
            Self::IssueComment => "issue_comment",
            Self::InstallationRepositories => "installation_repositories",
            Self::Push => "push",
            Self::PullRequestReview => "pull_request_review",
            Self::Unknown => "unknown",
        }
    }

    /// Whether this is one of the recognised types
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ingestion path a delivery arrived on.
///
/// Dedicated routes imply a fixed event type. The unified integration route
/// relies on the `X-GitHub-Event` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceRoute {
    PullRequest,
    IssueComment,
    Integration,
}

impl SourceRoute {
    /// All ingestion routes
    pub const ALL: [SourceRoute; 3] = [Self::PullRequest, Self::IssueComment, Self::Integration];

    /// HTTP path served for this route
    pub fn path(&self) -> &'static str {
        match self {
            Self::PullRequest => "/webhooks/pull_request",
            Self::IssueComment => "/webhooks/issue_comment",
            Self::Integration => "/webhooks/integration",
        }
    }

    /// Short label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PullRequest => "pull_request",
            Self::IssueComment => "issue_comment",
            Self::Integration => "integration",
        }
    }

    /// Whether the event type is derived from the request headers
    pub fn reads_event_header(&self) -> bool {
        matches!(self, Self::Integration)
    }
}

impl fmt::Display for SourceRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Domain Identifier Types
// ============================================================================

/// GitHub account identifier (numeric ID from the GitHub API)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(u64);

impl UserId {
    /// Create new user ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a submitted job
///
/// Uses ULID so identifiers sort by submission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(Ulid);

impl JobId {
    /// Generate a new unique job ID
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Time Types
// ============================================================================

/// UTC timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create timestamp for current moment
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Convert to RFC3339 string
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// High-level error categorization for alerting decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Temporary failures that may succeed on redelivery
    Transient,
    /// Permanent failures that won't succeed on redelivery
    Permanent,
    /// Security-related failures
    Security,
}

// ============================================================================
// Module declarations
// ============================================================================

/// Webhook intake: request model, classification and the processing pipeline
pub mod webhook;

/// Per-event-type admission rules
pub mod admission;

/// Job submission for admitted events
pub mod dispatch;

/// Job model and the job sink collaborator interface
pub mod jobs;

/// Webhook authenticity checks
pub mod signature;

/// Concrete job sink implementations
pub mod adapters;

pub use adapters::{HttpJobSink, InMemoryJobSink};
pub use admission::{AdmissionConfig, AdmissionDecision, AdmissionPolicy, RejectReason};
pub use dispatch::{DispatchError, DispatchOutcome, Dispatcher};
pub use jobs::{Job, JobKind, JobReceipt, JobSink, JobSinkError};
pub use signature::{AcceptAllVerifier, HmacSignatureVerifier, SignatureVerifier, WebhookSecret};
pub use webhook::{
    EventPayload, WebhookError, WebhookOutcome, WebhookPipeline, WebhookProcessor, WebhookRequest,
};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
