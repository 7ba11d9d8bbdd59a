//! Startup wiring: configuration loading, logging and collaborator
//! construction.

use gatehouse_api::{
    ConfigError, JobBackend, JobsConfig, LoggingConfig, ServiceConfig, WebhookConfig,
};
use gatehouse_core::{
    AcceptAllVerifier, AdmissionPolicy, HmacSignatureVerifier, HttpJobSink, InMemoryJobSink,
    JobSink, SignatureVerifier, WebhookPipeline, WebhookProcessor, WebhookSecret,
};
use std::{path::Path, sync::Arc};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Prefix of configuration environment variables, e.g. `GATEHOUSE__SERVER__PORT`
pub const CONFIG_ENV_PREFIX: &str = "GATEHOUSE";

const SYSTEM_CONFIG_FILE: &str = "/etc/gatehouse/service";
const LOCAL_CONFIG_FILE: &str = "config/service";

// ============================================================================
// Configuration
// ============================================================================

/// Load and validate the service configuration.
///
/// Sources, later ones override earlier ones:
///
/// 1. `/etc/gatehouse/service.yaml` (optional)
/// 2. `./config/service.yaml` (optional)
/// 3. `explicit_path` (required when given)
/// 4. `GATEHOUSE__SECTION__KEY` environment variables
///
/// Every field has a default, so no source is mandatory. A malformed file or
/// a value of the wrong type is an error.
pub fn load_config(explicit_path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let mut builder = config::Config::builder()
        .add_source(
            config::File::with_name(SYSTEM_CONFIG_FILE)
                .required(false)
                .format(config::FileFormat::Yaml),
        )
        .add_source(
            config::File::with_name(LOCAL_CONFIG_FILE)
                .required(false)
                .format(config::FileFormat::Yaml),
        );

    if let Some(path) = explicit_path {
        builder = builder.add_source(
            config::File::from(path.to_path_buf())
                .required(true)
                .format(config::FileFormat::Yaml),
        );
    }

    let service_config: ServiceConfig = builder
        .add_source(
            config::Environment::with_prefix(CONFIG_ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("admission.pull_request_actions"),
        )
        .build()
        .and_then(|config| config.try_deserialize())
        .map_err(|e| ConfigError::Load {
            message: e.to_string(),
        })?;

    service_config.validate()?;
    Ok(service_config)
}

// ============================================================================
// Logging
// ============================================================================

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `logging.level`.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let json_layer = config
        .json_format
        .then(|| tracing_subscriber::fmt::layer().json());
    let text_layer = (!config.json_format).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()?;

    Ok(())
}

// ============================================================================
// Collaborators
// ============================================================================

/// Signature verifier for the configured webhook secret
pub fn build_verifier(config: &WebhookConfig) -> Result<Arc<dyn SignatureVerifier>, ConfigError> {
    if !config.require_signature {
        return Ok(Arc::new(AcceptAllVerifier::new()));
    }

    match config.secret.as_deref() {
        Some(secret) if !secret.is_empty() => Ok(Arc::new(HmacSignatureVerifier::new(
            WebhookSecret::new(secret),
        ))),
        _ => Err(ConfigError::Missing {
            key: "webhooks.secret".to_string(),
        }),
    }
}

/// Job sink for the configured backend
pub fn build_job_sink(config: &JobsConfig) -> Result<Arc<dyn JobSink>, ConfigError> {
    match config.backend {
        JobBackend::Memory => {
            error!(
                capacity = config.memory_capacity,
                "Using in-memory job sink for development; submitted jobs are never run"
            );
            Ok(Arc::new(InMemoryJobSink::with_capacity(
                config.memory_capacity,
            )))
        }
        JobBackend::Http => {
            let endpoint = config.endpoint.as_deref().ok_or_else(|| ConfigError::Missing {
                key: "jobs.endpoint".to_string(),
            })?;
            let sink = HttpJobSink::new(endpoint, config.timeout()).map_err(|e| {
                ConfigError::Invalid {
                    message: e.to_string(),
                }
            })?;
            info!(endpoint = %sink.endpoint(), "Using HTTP job sink");
            Ok(Arc::new(sink))
        }
    }
}

/// Webhook pipeline wired from configuration and the given sink
pub fn build_processor(
    config: &ServiceConfig,
    sink: Arc<dyn JobSink>,
) -> Result<Arc<dyn WebhookProcessor>, ConfigError> {
    let verifier = build_verifier(&config.webhooks)?;
    let policy = AdmissionPolicy::new(config.admission.clone());

    match policy.config().bot_user_id {
        Some(bot) => info!(bot_user_id = %bot, "Bot-sender guard enabled"),
        None => warn!("No bot_user_id configured; the bot-sender guard is disabled"),
    }

    Ok(Arc::new(WebhookPipeline::new(verifier, policy, sink)))
}

#[cfg(test)]
#[path = "bootstrap_tests.rs"]
mod tests;
