//! Common test utilities for gatehouse integration tests
//!
//! This module provides:
//! - A fully wired router backed by an in-memory job sink
//! - Request builders that sign bodies the way GitHub does
//! - Failing and counting job sinks
//! - Fixture loading

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, Response},
    Router,
};
use gatehouse_api::{create_router, AppState, GatewayMetrics, ServiceConfig};
use gatehouse_core::{
    AdmissionConfig, AdmissionPolicy, HmacSignatureVerifier, InMemoryJobSink, Job, JobReceipt,
    JobSink, JobSinkError, UserId, WebhookPipeline, WebhookSecret,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

pub const TEST_SECRET: &str = "integration-test-secret";
pub const BOT_USER_ID: u64 = 1234;

// ============================================================================
// Application builder
// ============================================================================

/// Router plus handles on its collaborators
#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub sink: InMemoryJobSink,
    pub metrics: Arc<GatewayMetrics>,
}

/// Admission config with the bot guard enabled for [`BOT_USER_ID`]
#[allow(dead_code)]
pub fn bot_admission() -> AdmissionConfig {
    AdmissionConfig {
        bot_user_id: Some(UserId::new(BOT_USER_ID)),
        ..AdmissionConfig::default()
    }
}

/// App with HMAC verification against [`TEST_SECRET`] and the bot guard on
#[allow(dead_code)]
pub fn test_app() -> TestApp {
    test_app_with_admission(bot_admission())
}

#[allow(dead_code)]
pub fn test_app_with_admission(admission: AdmissionConfig) -> TestApp {
    let sink = InMemoryJobSink::new();
    let (router, metrics) = build_router(admission, Arc::new(sink.clone()));
    TestApp {
        router,
        sink,
        metrics,
    }
}

/// Router submitting to an arbitrary sink
#[allow(dead_code)]
pub fn build_router(
    admission: AdmissionConfig,
    sink: Arc<dyn JobSink>,
) -> (Router, Arc<GatewayMetrics>) {
    let mut config = ServiceConfig::default();
    config.webhooks.secret = Some(TEST_SECRET.to_string());
    config.admission = admission.clone();

    let verifier = Arc::new(HmacSignatureVerifier::new(WebhookSecret::new(TEST_SECRET)));
    let pipeline = WebhookPipeline::new(verifier, AdmissionPolicy::new(admission), sink);

    let metrics = GatewayMetrics::new().unwrap();
    let state = AppState::new(config, Arc::new(pipeline), metrics.clone());
    (create_router(state), metrics)
}

// ============================================================================
// Job sinks
// ============================================================================

/// Sink that counts attempts and always reports the runtime as unavailable
#[derive(Default)]
#[allow(dead_code)]
pub struct FailingJobSink {
    attempts: AtomicUsize,
}

#[allow(dead_code)]
impl FailingJobSink {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobSink for FailingJobSink {
    async fn submit(&self, _job: Job) -> Result<JobReceipt, JobSinkError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(JobSinkError::Unavailable {
            message: "job runtime unreachable".to_string(),
        })
    }
}

// ============================================================================
// Requests
// ============================================================================

/// `sha256=<hex>` signature of `body` under `secret`
#[allow(dead_code)]
pub fn sign_with(secret: &str, body: &[u8]) -> String {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

#[allow(dead_code)]
pub fn sign(body: &[u8]) -> String {
    sign_with(TEST_SECRET, body)
}

/// POST signed with [`TEST_SECRET`]
#[allow(dead_code)]
pub fn signed_post(path: &str, event: Option<&str>, body: &str) -> Request<Body> {
    post_with_signature(path, event, body, Some(sign(body.as_bytes())))
}

/// POST with an arbitrary signature header, or none
#[allow(dead_code)]
pub fn post_with_signature(
    path: &str,
    event: Option<&str>,
    body: &str,
    signature: Option<String>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .header("x-github-delivery", uuid::Uuid::new_v4().to_string());

    if let Some(event) = event {
        builder = builder.header("x-github-event", event);
    }
    if let Some(signature) = signature {
        builder = builder.header("x-hub-signature-256", signature);
    }

    builder.body(Body::from(body.to_string())).unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ============================================================================
// Fixtures
// ============================================================================

/// Raw contents of `tests/fixtures/<name>.json`
#[allow(dead_code)]
pub fn fixture(name: &str) -> String {
    let path = format!(
        "{}/tests/fixtures/{}.json",
        env!("CARGO_MANIFEST_DIR"),
        name
    );
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("fixture {path}: {e}"))
}

#[allow(dead_code)]
pub fn fixture_json(name: &str) -> serde_json::Value {
    serde_json::from_str(&fixture(name)).unwrap()
}
