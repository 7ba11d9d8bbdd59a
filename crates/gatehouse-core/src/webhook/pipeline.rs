//! Webhook processing pipeline.
//!
//! [`WebhookPipeline`] runs every delivery through the same sequence:
//!
//! 1. Authenticate the raw body against the signature headers
//! 2. Parse the body into an [`EventPayload`] and classify it
//! 3. Evaluate the admission policy
//! 4. Dispatch at most one job
//!
//! Nothing is parsed before authentication succeeds.

use super::{EventPayload, WebhookError, WebhookOutcome, WebhookRequest};
use crate::{
    admission::{AdmissionPolicy, RejectReason},
    dispatch::{DispatchOutcome, Dispatcher},
    jobs::JobSink,
    signature::SignatureVerifier,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument, warn};

// ============================================================================
// Core Operations (Traits)
// ============================================================================

/// Entry point used by the HTTP layer for every ingestion route
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WebhookProcessor: Send + Sync {
    /// Process one webhook delivery end to end.
    ///
    /// # Errors
    ///
    /// - [`WebhookError::Unauthorized`] when the signature does not verify
    /// - [`WebhookError::MalformedPayload`] when the body is not a JSON object
    /// - [`WebhookError::Dispatch`] when the job sink fails
    ///
    /// A non-admitted event is reported as an [`WebhookOutcome`], not an error.
    async fn process_webhook(&self, request: WebhookRequest)
        -> Result<WebhookOutcome, WebhookError>;
}

// ============================================================================
// WebhookPipeline
// ============================================================================

/// Default [`WebhookProcessor`] implementation
pub struct WebhookPipeline {
    verifier: Arc<dyn SignatureVerifier>,
    policy: AdmissionPolicy,
    dispatcher: Dispatcher,
}

impl WebhookPipeline {
    pub fn new(
        verifier: Arc<dyn SignatureVerifier>,
        policy: AdmissionPolicy,
        sink: Arc<dyn JobSink>,
    ) -> Self {
        Self {
            verifier,
            policy,
            dispatcher: Dispatcher::new(sink),
        }
    }

    pub fn policy(&self) -> &AdmissionPolicy {
        &self.policy
    }
}

#[async_trait]
impl WebhookProcessor for WebhookPipeline {
    #[instrument(skip_all, fields(
        route = %request.route,
        event_header = ?request.event_header(),
        delivery_id = ?request.delivery_id(),
    ))]
    async fn process_webhook(
        &self,
        request: WebhookRequest,
    ) -> Result<WebhookOutcome, WebhookError> {
        if !self.verifier.verify(&request).await {
            warn!(body_size = request.body.len(), "Webhook signature rejected");
            return Err(WebhookError::Unauthorized);
        }

        let payload = EventPayload::from_request(&request)?;
        let event_type = payload.event_type();

        let decision = self.policy.evaluate(&payload);

        let outcome = match self
            .dispatcher
            .dispatch(event_type, decision, payload.delivery_id())
            .await?
        {
            DispatchOutcome::Submitted(receipt) => WebhookOutcome::Enqueued {
                event_type,
                receipt,
            },
            DispatchOutcome::Skipped(RejectReason::BotSender) => {
                WebhookOutcome::BotSender { event_type }
            }
            DispatchOutcome::Skipped(reason) => WebhookOutcome::Ignored { event_type, reason },
        };

        info!(
            event_type = %event_type,
            outcome = outcome.label(),
            "Webhook processed"
        );

        Ok(outcome)
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
