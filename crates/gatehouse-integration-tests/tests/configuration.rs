//! Integration tests for configuration defaults, validation and the effect
//! of admission settings on the running router

mod common;

use axum::http::StatusCode;
use common::{fixture_json, signed_post, test_app_with_admission};
use gatehouse_api::{ConfigError, JobBackend, ServiceConfig};
use gatehouse_core::{AdmissionConfig, JobKind, UserId};
use serde_json::json;
use tower::ServiceExt;

/// Verify that ServiceConfig has the documented defaults
#[test]
fn test_service_config_defaults() {
    let config = ServiceConfig::default();

    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.host, "0.0.0.0");
    assert!(config.webhooks.require_signature);
    assert_eq!(config.admission.push_ref, "refs/heads/master");
    assert_eq!(config.admission.pull_request_actions, vec!["opened"]);
    assert_eq!(config.admission.bot_user_id, None);
    assert_eq!(config.jobs.backend, JobBackend::Http);
    assert!(!config.jobs.allow_memory_backend);
}

/// Verify that a partial document fills the remaining fields from defaults
#[test]
fn test_partial_document_deserializes() {
    let config: ServiceConfig = serde_json::from_value(json!({
        "webhooks": { "secret": "s3cret" },
        "admission": { "bot_user_id": 1234 },
        "jobs": { "backend": "http", "endpoint": "https://jobs.internal/enqueue" }
    }))
    .unwrap();

    assert_eq!(config.admission.bot_user_id, Some(UserId::new(1234)));
    assert_eq!(config.jobs.backend, JobBackend::Http);
    assert_eq!(config.server.port, 8080);
    assert!(config.validate().is_ok());
}

/// Verify that the secret never appears in serialized or debug output
#[test]
fn test_secret_is_not_exposed() {
    let mut config = ServiceConfig::default();
    config.webhooks.secret = Some("super-secret-value".to_string());

    let serialized = serde_json::to_string(&config).unwrap();
    let debug = format!("{config:?}");

    assert!(!serialized.contains("super-secret-value"));
    assert!(!debug.contains("super-secret-value"));
}

#[test]
fn test_defaults_require_a_secret() {
    let result = ServiceConfig::default().validate();
    assert!(matches!(result, Err(ConfigError::Missing { .. })));
}

#[test]
fn test_signature_can_be_disabled_without_secret() {
    let mut config = ServiceConfig::default();
    config.webhooks.require_signature = false;
    config.jobs.endpoint = Some("http://jobs.internal/enqueue".to_string());
    assert!(config.validate().is_ok());
}

/// Verify that a config without a job runtime is refused unless the
/// development memory backend is explicitly allowed
#[test]
fn test_memory_backend_is_development_opt_in() {
    let mut config: ServiceConfig = serde_json::from_value(json!({
        "webhooks": { "secret": "s3cret" },
        "jobs": { "backend": "memory" }
    }))
    .unwrap();
    assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));

    config.jobs.allow_memory_backend = true;
    assert!(config.validate().is_ok());
}

// ============================================================================
// Admission settings on the live router
// ============================================================================

#[tokio::test]
async fn test_configured_push_ref_is_admitted() {
    let app = test_app_with_admission(AdmissionConfig {
        push_ref: "refs/heads/main".to_string(),
        ..AdmissionConfig::default()
    });

    let mut payload = fixture_json("push_master");
    payload["ref"] = json!("refs/heads/main");
    let main = payload.to_string();
    let master = fixture_json("push_master").to_string();

    let first = app
        .router
        .clone()
        .oneshot(signed_post("/webhooks/integration", Some("push"), &main))
        .await
        .unwrap();
    let second = app
        .router
        .oneshot(signed_post("/webhooks/integration", Some("push"), &master))
        .await
        .unwrap();

    assert_eq!(first.status(), StatusCode::ACCEPTED);
    assert_eq!(second.status(), StatusCode::ACCEPTED);
    let jobs = app.sink.jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].kind, JobKind::ReceivePushEvent);
    assert_eq!(jobs[0].arguments[0]["ref"], "refs/heads/main");
}

#[tokio::test]
async fn test_configured_pull_request_actions_are_admitted() {
    let app = test_app_with_admission(AdmissionConfig {
        pull_request_actions: vec!["opened".to_string(), "reopened".to_string()],
        ..AdmissionConfig::default()
    });

    for action in ["opened", "reopened", "closed"] {
        let mut payload = fixture_json("pull_request_opened");
        payload["action"] = json!(action);

        let response = app
            .router
            .clone()
            .oneshot(signed_post("/webhooks/pull_request", None, &payload.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    assert_eq!(app.sink.len(), 2);
}
