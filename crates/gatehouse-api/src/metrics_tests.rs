use super::*;
use gatehouse_core::{EventType, JobId, JobKind, JobReceipt};

#[test]
fn test_independent_instances_do_not_conflict() {
    let first = GatewayMetrics::new().unwrap();
    let second = GatewayMetrics::new().unwrap();

    first.record_received(SourceRoute::Integration);

    assert_eq!(
        first
            .webhooks_received_total
            .with_label_values(&["integration"])
            .get(),
        1
    );
    assert_eq!(
        second
            .webhooks_received_total
            .with_label_values(&["integration"])
            .get(),
        0
    );
}

#[test]
fn test_outcomes_are_counted_by_label() {
    let metrics = GatewayMetrics::new().unwrap();

    metrics.record_outcome(&WebhookOutcome::Enqueued {
        event_type: EventType::Push,
        receipt: JobReceipt {
            job_id: JobId::new(),
            kind: JobKind::ReceivePushEvent,
        },
    });
    metrics.record_outcome(&WebhookOutcome::Ignored {
        event_type: EventType::PullRequest,
        reason: RejectReason::ActionNotAdmitted {
            action: Some("labeled".to_string()),
        },
    });
    metrics.record_outcome(&WebhookOutcome::BotSender {
        event_type: EventType::Unknown,
    });

    assert_eq!(
        metrics.events_admitted_total.with_label_values(&["push"]).get(),
        1
    );
    assert_eq!(
        metrics
            .events_rejected_total
            .with_label_values(&["action_not_admitted"])
            .get(),
        1
    );
    assert_eq!(
        metrics
            .events_rejected_total
            .with_label_values(&["bot_sender"])
            .get(),
        1
    );
}

#[test]
fn test_encode_exposes_counter_names() {
    let metrics = GatewayMetrics::new().unwrap();
    metrics.record_received(SourceRoute::PullRequest);
    metrics.webhooks_unauthorized_total.inc();
    metrics.job_submission_failures_total.inc();

    let text = metrics.encode().unwrap();

    assert!(text.contains("gatehouse_webhooks_received_total{route=\"pull_request\"} 1"));
    assert!(text.contains("gatehouse_webhooks_unauthorized_total 1"));
    assert!(text.contains("gatehouse_job_submission_failures_total 1"));
}
