//! # Dispatch
//!
//! Turns an admission decision into at most one job submission.
//!
//! The dispatcher never retries: a failed submission is reported to the
//! caller, which answers the webhook with a server error so the provider's
//! own redelivery can take over.

use crate::{
    admission::{AdmissionDecision, RejectReason},
    jobs::{Job, JobKind, JobReceipt, JobSink, JobSinkError},
    EventType,
};
use std::sync::Arc;
use tracing::{error, info, instrument};

/// What the dispatcher did with a decision
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Exactly one job was submitted and acknowledged
    Submitted(JobReceipt),
    /// The decision was a rejection; nothing was submitted
    Skipped(RejectReason),
}

/// Job submission failure
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Failed to submit {kind} job: {source}")]
    Submission {
        kind: JobKind,
        #[source]
        source: JobSinkError,
    },
}

impl DispatchError {
    /// Check if a later redelivery could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Submission { source, .. } => source.is_transient(),
        }
    }
}

/// Submits admitted events to the job sink
#[derive(Clone)]
pub struct Dispatcher {
    sink: Arc<dyn JobSink>,
}

impl Dispatcher {
    pub fn new(sink: Arc<dyn JobSink>) -> Self {
        Self { sink }
    }

    /// Act on an admission decision.
    ///
    /// An `Admit` decision results in exactly one [`JobSink::submit`] call
    /// carrying the decision's job kind and arguments in order. A `Reject`
    /// decision touches nothing.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Submission`] when the sink fails.
    #[instrument(skip_all, fields(event_type = %event_type, delivery_id = ?delivery_id))]
    pub async fn dispatch(
        &self,
        event_type: EventType,
        decision: AdmissionDecision,
        delivery_id: Option<&str>,
    ) -> Result<DispatchOutcome, DispatchError> {
        let (kind, arguments) = match decision {
            AdmissionDecision::Admit { job, arguments } => (job, arguments),
            AdmissionDecision::Reject { reason } => {
                return Ok(DispatchOutcome::Skipped(reason));
            }
        };

        let job = Job::new(kind, arguments, delivery_id.map(String::from));
        let job_id = job.id;

        match self.sink.submit(job).await {
            Ok(receipt) => {
                info!(
                    job_id = %receipt.job_id,
                    job_kind = %receipt.kind,
                    "Job submitted"
                );
                Ok(DispatchOutcome::Submitted(receipt))
            }
            Err(source) => {
                error!(
                    job_id = %job_id,
                    job_kind = %kind,
                    error = %source,
                    "Job submission failed"
                );
                Err(DispatchError::Submission { kind, source })
            }
        }
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
