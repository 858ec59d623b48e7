//! Forecast API - demand and weekly-sales prediction service
//!
//! Binds the HTTP listener first, then loads every artifact off the request
//! path so that failing strategies surface in health instead of stopping
//! the process.

use anyhow::Result;
use forecast_api::{api, config::ForecastConfig};
use forecast_lib::{health::components, HealthRegistry, PredictionService, StructuredLogger};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting forecast-api");

    let config = ForecastConfig::load()?;
    info!(
        instance = %config.instance_name,
        demand_model_dir = %config.demand_model_dir.display(),
        price_model_dir = %config.price_model_dir.display(),
        data_dir = %config.data_dir.display(),
        "Service configured"
    );

    let logger = StructuredLogger::new(&config.instance_name);
    let service = Arc::new(
        PredictionService::from_artifacts(&config.artifacts())?.with_logger(logger.clone()),
    );

    // One component per strategy plus the shared artifacts
    let health_registry = HealthRegistry::new();
    for (name, _) in service.component_health() {
        health_registry.register(&name).await;
    }
    health_registry.register(components::WARM_UP).await;

    let app_state = Arc::new(api::AppState::new(service, health_registry.clone()));

    let listener = api::bind(config.api_port).await?;
    logger.log_startup(SERVICE_VERSION, config.api_port);

    if config.warm_up {
        tokio::spawn(warm_up(app_state.clone()));
    } else {
        health_registry.set_ready(true).await;
    }

    api::serve(listener, app_state, shutdown_signal()).await?;

    logger.log_shutdown("SIGINT received");
    info!("Shutting down");

    Ok(())
}

/// Load every artifact on the blocking pool, then report ready
async fn warm_up(state: Arc<api::AppState>) {
    let service = state.service.clone();
    match tokio::task::spawn_blocking(move || service.warm_up()).await {
        Ok(report) => {
            let failures = report.failures();
            if failures == 0 {
                info!("All artifacts loaded");
            } else {
                warn!(failures, "Warm-up finished with failed components");
            }
        }
        Err(e) => {
            state
                .health_registry
                .set_unhealthy(components::WARM_UP, format!("Warm-up task failed: {}", e))
                .await;
        }
    }

    state.refresh_health().await;
    state.health_registry.set_ready(true).await;
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install shutdown handler");
        std::future::pending::<()>().await;
    }
}
