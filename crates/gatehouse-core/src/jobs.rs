//! # Jobs
//!
//! The job model handed to the asynchronous execution runtime, and the
//! [`JobSink`] interface used to enqueue it.
//!
//! A job is identified by its [`JobKind`] (the job class the runtime executes)
//! and carries an ordered list of JSON arguments extracted from the webhook
//! payload. The gateway never waits for a job to run; a successful
//! [`JobSink::submit`] only means the runtime acknowledged the enqueue.

use crate::{JobId, Timestamp};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// ============================================================================
// Core Types
// ============================================================================

/// Job class executed by the runtime for an admitted event.
///
/// Each recognised [`EventType`](crate::EventType) is bound to exactly one
/// kind by the admission rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobKind {
    ReceivePullRequestEvent,
    ReceiveIssueCommentEvent,
    ReceiveInstallationRepositoriesEvent,
    ReceivePushEvent,
    ReceivePullRequestReviewEvent,
}

impl JobKind {
    /// Job class name as known by the runtime
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReceivePullRequestEvent => "ReceivePullRequestEvent",
            Self::ReceiveIssueCommentEvent => "ReceiveIssueCommentEvent",
            Self::ReceiveInstallationRepositoriesEvent => "ReceiveInstallationRepositoriesEvent",
            Self::ReceivePushEvent => "ReceivePushEvent",
            Self::ReceivePullRequestReviewEvent => "ReceivePullRequestReviewEvent",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of asynchronous work submitted to the job runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub kind: JobKind,
    pub arguments: Vec<Value>,
    /// `X-GitHub-Delivery` of the originating webhook, when known
    pub delivery_id: Option<String>,
    pub submitted_at: Timestamp,
}

impl Job {
    /// Create a new job with a fresh identifier
    pub fn new(kind: JobKind, arguments: Vec<Value>, delivery_id: Option<String>) -> Self {
        Self {
            id: JobId::new(),
            kind,
            arguments,
            delivery_id,
            submitted_at: Timestamp::now(),
        }
    }
}

/// Acknowledgement returned by a sink for an accepted job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReceipt {
    pub job_id: JobId,
    pub kind: JobKind,
}

impl From<&Job> for JobReceipt {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id,
            kind: job.kind,
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors reported by a job sink
#[derive(Debug, thiserror::Error)]
pub enum JobSinkError {
    #[error("Job rejected by runtime: {message}")]
    Rejected { message: String },

    #[error("Job runtime unavailable: {message}")]
    Unavailable { message: String },

    #[error("Job runtime returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Invalid job sink configuration: {message}")]
    Configuration { message: String },
}

impl JobSinkError {
    /// Check if a later redelivery could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Rejected { .. } => false,
            Self::Unavailable { .. } => true,
            Self::Http { status, .. } => *status >= 500 || *status == 429,
            Self::Configuration { .. } => false,
        }
    }
}

// ============================================================================
// Collaborator Interface
// ============================================================================

/// Enqueue API of the asynchronous job runtime.
///
/// Implementations must be safe to share between concurrent requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobSink: Send + Sync {
    /// Submit a job for later execution.
    ///
    /// # Errors
    ///
    /// Returns [`JobSinkError`] when the runtime does not acknowledge the job.
    async fn submit(&self, job: Job) -> Result<JobReceipt, JobSinkError>;
}

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod tests;
