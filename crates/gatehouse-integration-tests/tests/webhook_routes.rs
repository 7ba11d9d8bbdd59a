//! End-to-end behavior of the webhook routes: classification, admission and
//! dispatch through the real pipeline with an in-memory job sink.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, build_router, fixture, fixture_json, signed_post, test_app,
    test_app_with_admission, FailingJobSink, BOT_USER_ID,
};
use gatehouse_core::{AdmissionConfig, JobKind};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

// ============================================================================
// Dedicated routes
// ============================================================================

#[tokio::test]
async fn test_opened_pull_request_enqueues_one_job() {
    let app = test_app();
    let body = fixture("pull_request_opened");

    let response = app
        .router
        .oneshot(signed_post("/webhooks/pull_request", None, &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    assert_eq!(json["outcome"], "enqueued");
    assert_eq!(json["event_type"], "pull_request");

    let jobs = app.sink.jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].kind, JobKind::ReceivePullRequestEvent);
    assert_eq!(jobs[0].arguments, vec![fixture_json("pull_request_opened")]);
    assert_eq!(json["job_id"], jobs[0].id.to_string());
}

#[tokio::test]
async fn test_labeled_pull_request_is_accepted_without_job() {
    let app = test_app();
    let body = fixture("pull_request_labeled");

    let response = app
        .router
        .oneshot(signed_post("/webhooks/pull_request", None, &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(body_json(response).await["outcome"], "ignored");
    assert!(app.sink.is_empty());
}

/// Verify that the dedicated route ignores a conflicting event header.
#[tokio::test]
async fn test_dedicated_route_ignores_event_header() {
    let app = test_app();
    let body = fixture("issue_comment");

    let response = app
        .router
        .oneshot(signed_post("/webhooks/issue_comment", Some("push"), &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let jobs = app.sink.jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].kind, JobKind::ReceiveIssueCommentEvent);
}

// ============================================================================
// Unified integration route
// ============================================================================

#[tokio::test]
async fn test_installation_repositories_passes_two_arguments() {
    let app = test_app();
    let body = fixture("installation_repositories");
    let payload = fixture_json("installation_repositories");

    let response = app
        .router
        .oneshot(signed_post(
            "/webhooks/integration",
            Some("installation_repositories"),
            &body,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let jobs = app.sink.jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].kind, JobKind::ReceiveInstallationRepositoriesEvent);
    assert_eq!(
        jobs[0].arguments,
        vec![payload["repositories_added"].clone(), json!(2)]
    );
}

#[tokio::test]
async fn test_push_to_master_enqueues_job() {
    let app = test_app();
    let body = fixture("push_master");

    let response = app
        .router
        .oneshot(signed_post("/webhooks/integration", Some("push"), &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let jobs = app.sink.jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].kind, JobKind::ReceivePushEvent);
}

#[tokio::test]
async fn test_push_to_other_branch_is_accepted_without_job() {
    let app = test_app();
    let mut payload = fixture_json("push_master");
    payload["ref"] = json!("refs/heads/feature");
    let body = payload.to_string();

    let response = app
        .router
        .oneshot(signed_post("/webhooks/integration", Some("push"), &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(app.sink.is_empty());
}

#[tokio::test]
async fn test_pull_request_review_enqueues_job() {
    let app = test_app();
    let body = fixture("pull_request_review");

    let response = app
        .router
        .oneshot(signed_post(
            "/webhooks/integration",
            Some("pull_request_review"),
            &body,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(app.sink.jobs()[0].kind, JobKind::ReceivePullRequestReviewEvent);
}

#[tokio::test]
async fn test_unrecognized_event_is_accepted_without_job() {
    let app = test_app();
    let body = json!({ "action": "created", "sender": { "id": 99 } }).to_string();

    let response = app
        .router
        .oneshot(signed_post("/webhooks/integration", Some("deployment"), &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    assert_eq!(json["event_type"], "unknown");
    assert_eq!(json["outcome"], "ignored");
    assert!(app.sink.is_empty());
}

// ============================================================================
// Bot sender
// ============================================================================

/// Verify that a delivery from the bot account answers 200 and does nothing,
/// even without an event header.
#[tokio::test]
async fn test_bot_sender_is_ok_without_job() {
    let app = test_app();
    let body = json!({ "sender": { "id": BOT_USER_ID } }).to_string();

    let response = app
        .router
        .oneshot(signed_post("/webhooks/integration", None, &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["outcome"], "bot_sender");
    assert!(app.sink.is_empty());
}

#[tokio::test]
async fn test_same_sender_without_bot_configured_is_accepted() {
    let app = test_app_with_admission(AdmissionConfig::default());
    let body = json!({ "sender": { "id": BOT_USER_ID } }).to_string();

    let response = app
        .router
        .oneshot(signed_post("/webhooks/integration", None, &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(app.sink.is_empty());
}

#[tokio::test]
async fn test_bot_sender_dominates_admissible_event() {
    let app = test_app();
    let mut payload = fixture_json("pull_request_opened");
    payload["sender"]["id"] = json!(BOT_USER_ID);
    let body = payload.to_string();

    let response = app
        .router
        .oneshot(signed_post("/webhooks/pull_request", None, &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(app.sink.is_empty());
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_non_object_body_is_bad_request() {
    let app = test_app();

    let response = app
        .router
        .oneshot(signed_post("/webhooks/pull_request", None, "[1, 2, 3]"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["status"], 400);
    assert!(app.sink.is_empty());
}

/// Verify that a sink failure answers 500 after exactly one attempt.
#[tokio::test]
async fn test_sink_failure_is_internal_error() {
    let sink = Arc::new(FailingJobSink::default());
    let (router, metrics) = build_router(common::bot_admission(), sink.clone());
    let body = fixture("push_master");

    let response = router
        .oneshot(signed_post("/webhooks/integration", Some("push"), &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(sink.attempts(), 1);
    assert_eq!(metrics.job_submission_failures_total.get(), 1);

    let json = body_json(response).await;
    let message = json["error"].as_str().unwrap();
    assert!(!message.contains("unreachable"));
}
