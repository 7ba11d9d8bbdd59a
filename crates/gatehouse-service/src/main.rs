//! # Gatehouse Service
//!
//! Binary entry point for the Gatehouse webhook gateway.
//!
//! This executable:
//! - Loads configuration from files and `GATEHOUSE__*` environment variables
//! - Initializes logging
//! - Builds the signature verifier, admission policy and job sink
//! - Starts the HTTP server from gatehouse-api

mod bootstrap;

use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

/// Exit code for configuration that cannot be loaded or is invalid
const EXIT_CONFIG_ERROR: i32 = 3;

#[derive(Debug, Parser)]
#[command(name = "gatehouse", version, about = "GitHub webhook ingestion gateway")]
struct Args {
    /// YAML configuration file applied on top of the default locations
    #[arg(long, short, env = "GATEHOUSE_CONFIG_FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logging depends on configuration, so load failures go to stderr.
    let service_config = match bootstrap::load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("gatehouse: {e}; aborting");
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };

    bootstrap::init_logging(&service_config.logging)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        address = %service_config.server.bind_address(),
        config_file = ?args.config,
        backend = ?service_config.jobs.backend,
        "Starting Gatehouse service"
    );

    let processor = bootstrap::build_job_sink(&service_config.jobs)
        .and_then(|sink| bootstrap::build_processor(&service_config, sink));
    let processor = match processor {
        Ok(processor) => processor,
        Err(e) => {
            error!(error = %e, "Failed to build webhook pipeline; aborting");
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };

    gatehouse_api::start_server(service_config, processor)
        .await
        .map_err(|e| {
            error!(error = %e, "HTTP server failed");
            anyhow::anyhow!("HTTP server failed: {e}")
        })?;

    info!("Gatehouse service stopped");
    Ok(())
}
