//! Push-relay service binary.
//!
//! Loads layered configuration, validates it, builds the delivery pipeline,
//! and serves until shutdown. Startup failures exit with distinct codes so
//! supervisors can tell them apart: 1 for unloadable configuration, 2 for
//! invalid configuration, 3 for a server that could not bind or died.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use push_relay_service::config::RelayConfig;
use push_relay_service::pipeline::RelayPipeline;
use push_relay_service::{start_server, ServiceError};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match RelayConfig::load() {
        Ok(config) => config,
        Err(e) => {
            // The subscriber is not up yet; stderr is all we have.
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&config);

    if let Err(e) = config.validate() {
        error!(error = %e, "Configuration is invalid");
        std::process::exit(2);
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        organization = %config.github.organization,
        dispatch_repository = %config.dispatch.repository,
        tracked_pattern = %config.filter.tracked_pattern,
        "Starting push-relay service"
    );

    let pipeline = match RelayPipeline::from_config(&config) {
        Ok(pipeline) => Arc::new(pipeline),
        Err(e) => {
            error!(error = %e, "Failed to build the relay pipeline");
            std::process::exit(2);
        }
    };

    if let Err(e) = start_server(config, pipeline).await {
        match &e {
            ServiceError::BindFailed { address, message } => {
                error!(address = %address, message = %message, "Failed to bind HTTP server");
            }
            ServiceError::ServerFailed { message } => {
                error!(message = %message, "HTTP server failed");
            }
        }
        std::process::exit(3);
    }

    Ok(())
}

/// Initialize the tracing subscriber from logging configuration.
///
/// A `RUST_LOG` environment filter overrides the configured level when set.
fn init_tracing(config: &RelayConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.json_format {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
