//! # thermohubd: thermohub daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Load configuration (TOML file, env overrides)
//! - Initialise structured logging
//! - Open the gateway link (Modbus TCP, serial RTU or the simulated gateway)
//! - Discover zones and construct the application services
//! - Build the axum router and serve until SIGINT
//! - Close the gateway link on shutdown
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer, no domain logic belongs here.

mod config;
mod gateway;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use thermohub_adapter_forecast_file::FileForecastProvider;
use thermohub_adapter_http_axum::state::AppState;
use thermohub_app::event_bus::{EventFilter, InProcessEventBus, Subscription};
use thermohub_app::hub::Hub;
use thermohub_app::services::auto_schedule::AutoScheduleEngine;
use thermohub_app::services::zone_controller::ZoneController;

use crate::config::Config;
use crate::gateway::GatewayTransport;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    // Gateway
    let transport = GatewayTransport::from_config(&config.hub)?;
    tracing::info!(hub = %config.hub.name, transport = transport.kind(), "gateway configured");
    let hub = Arc::new(Hub::new(
        config.hub.name.clone(),
        transport,
        config.hub.retry_policy(),
        config.hub.message_delay(),
    ));
    match hub.health_check().await {
        Ok(devices) => tracing::info!(devices, "gateway reachable"),
        Err(err) => tracing::warn!(error = %err, "gateway health check failed"),
    }

    // Event bus
    let event_bus = Arc::new(InProcessEventBus::new(256));
    tokio::spawn(log_events(event_bus.subscribe(EventFilter::default())));

    // Services
    let zones = Arc::new(ZoneController::new(Arc::clone(&hub), Arc::clone(&event_bus)));
    let discovered = zones.discover().await?;
    tracing::info!(zones = discovered.len(), "zone discovery finished");

    let forecast = FileForecastProvider::new(&config.forecast);
    tracing::info!(path = %forecast.path().display(), "forecast snapshot source");
    let auto_schedule = Arc::new(AutoScheduleEngine::new(
        Arc::clone(&zones),
        forecast,
        event_bus,
        config.auto_schedule.clone(),
    ));

    // HTTP
    let app = thermohub_adapter_http_axum::router::build(AppState::new(zones, auto_schedule));

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("thermohubd listening on http://{bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    hub.close().await?;
    tracing::info!("thermohubd stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}

async fn log_events(mut events: Subscription) {
    while let Some(event) = events.next().await {
        tracing::info!(
            event_type = ?event.event_type,
            zone = ?event.zone_id,
            data = %event.data,
            "event"
        );
    }
}
