//! Configuration types for the HTTP service

use crate::errors::ConfigError;
use gatehouse_core::AdmissionConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Webhook authentication settings
    pub webhooks: WebhookConfig,

    /// Admission rules
    pub admission: AdmissionConfig,

    /// Job runtime connection
    pub jobs: JobsConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Check the configuration for values the service cannot start with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] or [`ConfigError::Missing`] for the
    /// first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid {
                message: "server.port must be greater than 0".to_string(),
            });
        }

        if self.server.max_body_size == 0 {
            return Err(ConfigError::Invalid {
                message: "server.max_body_size must be greater than 0".to_string(),
            });
        }

        if self.server.timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                message: "server.timeout_seconds must be greater than 0".to_string(),
            });
        }

        if self.webhooks.require_signature
            && self.webhooks.secret.as_deref().map_or(true, str::is_empty)
        {
            return Err(ConfigError::Missing {
                key: "webhooks.secret".to_string(),
            });
        }

        if self.admission.push_ref.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "admission.push_ref must not be empty".to_string(),
            });
        }

        if self.admission.pull_request_actions.is_empty() {
            return Err(ConfigError::Invalid {
                message: "admission.pull_request_actions must list at least one action"
                    .to_string(),
            });
        }

        if self.jobs.backend == JobBackend::Memory {
            if !self.jobs.allow_memory_backend {
                return Err(ConfigError::Invalid {
                    message: "jobs.backend = memory never delivers jobs; set \
                              jobs.allow_memory_backend = true to use it for development"
                        .to_string(),
                });
            }
            if self.jobs.memory_capacity == 0 {
                return Err(ConfigError::Invalid {
                    message: "jobs.memory_capacity must be greater than 0".to_string(),
                });
            }
        }

        if self.jobs.backend == JobBackend::Http {
            let endpoint = self.jobs.endpoint.as_deref().unwrap_or("").trim();
            if endpoint.is_empty() {
                return Err(ConfigError::Missing {
                    key: "jobs.endpoint".to_string(),
                });
            }
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(ConfigError::Invalid {
                    message: format!("jobs.endpoint must be an http(s) URL, got '{}'", endpoint),
                });
            }
            if self.jobs.timeout_seconds == 0 {
                return Err(ConfigError::Invalid {
                    message: "jobs.timeout_seconds must be greater than 0".to_string(),
                });
            }
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Request timeout in seconds
    pub timeout_seconds: u64,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,

    /// Maximum request body size in bytes
    pub max_body_size: usize,
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            timeout_seconds: 30,
            shutdown_timeout_seconds: 30,
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Webhook authentication configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Shared webhook secret configured on the GitHub side
    #[serde(skip_serializing)]
    pub secret: Option<String>,

    /// Require a valid signature on every delivery
    pub require_signature: bool,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            secret: None,
            require_signature: true,
        }
    }
}

impl fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("secret", &self.secret.as_ref().map(|_| "<REDACTED>"))
            .field("require_signature", &self.require_signature)
            .finish()
    }
}

/// Job sink implementation to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JobBackend {
    /// POST jobs to an external job runtime
    #[default]
    Http,
    /// Keep the most recent jobs in process memory; development only
    Memory,
}

/// Job runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    pub backend: JobBackend,

    /// Enqueue endpoint of the job runtime (http backend only)
    pub endpoint: Option<String>,

    /// Per-submission timeout in seconds
    pub timeout_seconds: u64,

    /// Opt-in required for the memory backend, which never runs a job
    pub allow_memory_backend: bool,

    /// Number of jobs the memory backend retains before dropping the oldest
    pub memory_capacity: usize,
}

impl JobsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            backend: JobBackend::Http,
            endpoint: None,
            timeout_seconds: 10,
            allow_memory_backend: false,
            memory_capacity: 1000,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
