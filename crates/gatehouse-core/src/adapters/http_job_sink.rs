//! # HTTP Job Sink
//!
//! Submits jobs to an external job runtime by POSTing them as JSON to its
//! enqueue endpoint. Any 2xx response is an acknowledgement.
//!
//! Status mapping:
//!
//! | Response | Error |
//! |----------|-------|
//! | 2xx | none |
//! | 400, 422 | [`JobSinkError::Rejected`] |
//! | other status | [`JobSinkError::Http`] |
//! | connect failure, timeout | [`JobSinkError::Unavailable`] |

use crate::jobs::{Job, JobReceipt, JobSink, JobSinkError};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use std::time::Duration;
use tracing::{debug, instrument};

/// Job sink backed by an HTTP enqueue endpoint
#[derive(Debug, Clone)]
pub struct HttpJobSink {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpJobSink {
    /// Create a sink posting to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`JobSinkError::Configuration`] if the endpoint is not an
    /// absolute http(s) URL or the HTTP client cannot be built.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, JobSinkError> {
        let endpoint = Url::parse(endpoint).map_err(|e| JobSinkError::Configuration {
            message: format!("invalid endpoint '{}': {}", endpoint, e),
        })?;

        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(JobSinkError::Configuration {
                message: format!("endpoint scheme must be http or https, got '{}'", endpoint.scheme()),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| JobSinkError::Configuration {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl JobSink for HttpJobSink {
    #[instrument(skip_all, fields(job_id = %job.id, job_kind = %job.kind))]
    async fn submit(&self, job: Job) -> Result<JobReceipt, JobSinkError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&job)
            .send()
            .await
            .map_err(|e| JobSinkError::Unavailable {
                message: format!("HTTP request failed: {}", e),
            })?;

        let status = response.status();
        if status.is_success() {
            debug!(status = status.as_u16(), "Job acknowledged by runtime");
            return Ok(JobReceipt::from(&job));
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error body".to_string());

        Err(match status {
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                JobSinkError::Rejected { message }
            }
            _ => JobSinkError::Http {
                status: status.as_u16(),
                message,
            },
        })
    }
}

#[cfg(test)]
#[path = "http_job_sink_tests.rs"]
mod tests;
