//! Prometheus counters for the gateway.
//!
//! Counters live in a registry owned by [`GatewayMetrics`] rather than the
//! process-wide default registry, so several routers can coexist in one
//! process.

use gatehouse_core::{RejectReason, SourceRoute, WebhookOutcome};
use prometheus::{IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Gateway metrics
#[derive(Clone)]
pub struct GatewayMetrics {
    registry: Registry,

    pub webhooks_received_total: IntCounterVec,
    pub webhooks_unauthorized_total: IntCounter,
    pub events_admitted_total: IntCounterVec,
    pub events_rejected_total: IntCounterVec,
    pub job_submission_failures_total: IntCounter,
}

impl GatewayMetrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        let webhooks_received_total = IntCounterVec::new(
            Opts::new(
                "gatehouse_webhooks_received_total",
                "Webhook deliveries received, by ingestion route",
            ),
            &["route"],
        )?;
        let webhooks_unauthorized_total = IntCounter::new(
            "gatehouse_webhooks_unauthorized_total",
            "Webhook deliveries rejected by signature verification",
        )?;
        let events_admitted_total = IntCounterVec::new(
            Opts::new(
                "gatehouse_events_admitted_total",
                "Events admitted and submitted as jobs, by event type",
            ),
            &["event_type"],
        )?;
        let events_rejected_total = IntCounterVec::new(
            Opts::new(
                "gatehouse_events_rejected_total",
                "Authenticated events not admitted, by reason",
            ),
            &["reason"],
        )?;
        let job_submission_failures_total = IntCounter::new(
            "gatehouse_job_submission_failures_total",
            "Job submissions that failed",
        )?;

        registry.register(Box::new(webhooks_received_total.clone()))?;
        registry.register(Box::new(webhooks_unauthorized_total.clone()))?;
        registry.register(Box::new(events_admitted_total.clone()))?;
        registry.register(Box::new(events_rejected_total.clone()))?;
        registry.register(Box::new(job_submission_failures_total.clone()))?;

        Ok(Arc::new(Self {
            registry,
            webhooks_received_total,
            webhooks_unauthorized_total,
            events_admitted_total,
            events_rejected_total,
            job_submission_failures_total,
        }))
    }

    pub fn record_received(&self, route: SourceRoute) {
        self.webhooks_received_total
            .with_label_values(&[route.as_str()])
            .inc();
    }

    pub fn record_outcome(&self, outcome: &WebhookOutcome) {
        match outcome {
            WebhookOutcome::Enqueued { event_type, .. } => self
                .events_admitted_total
                .with_label_values(&[event_type.as_str()])
                .inc(),
            WebhookOutcome::Ignored { reason, .. } => self
                .events_rejected_total
                .with_label_values(&[reason.label()])
                .inc(),
            WebhookOutcome::BotSender { .. } => self
                .events_rejected_total
                .with_label_values(&[RejectReason::BotSender.label()])
                .inc(),
        }
    }

    /// Prometheus text exposition of every gateway counter
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
