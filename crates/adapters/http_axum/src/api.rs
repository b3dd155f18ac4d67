//! JSON API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod appliance;
#[allow(clippy::missing_errors_doc)]
pub mod services;
#[allow(clippy::missing_errors_doc)]
pub mod zones;

use axum::Router;
use axum::routing::{get, post, put};

use thermohub_app::ports::{EventPublisher, ForecastProvider, RegisterTransport};

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<T, EP, F>() -> Router<AppState<T, EP, F>>
where
    T: RegisterTransport + 'static,
    EP: EventPublisher + Send + Sync + 'static,
    F: ForecastProvider + Send + Sync + 'static,
{
    Router::new()
        // Zones
        .route("/zones", get(zones::list::<T, EP, F>))
        .route("/zones/{id}", get(zones::get::<T, EP, F>))
        .route("/zones/{id}/refresh", post(zones::refresh::<T, EP, F>))
        .route("/zones/{id}/preset", put(zones::set_preset::<T, EP, F>))
        .route("/zones/{id}/hvac_mode", put(zones::set_hvac_mode::<T, EP, F>))
        .route(
            "/zones/{id}/temperature",
            put(zones::set_temperature::<T, EP, F>),
        )
        .route(
            "/zones/{id}/schedules/{slot}/{weekday}",
            get(zones::schedule::<T, EP, F>).put(zones::import_schedule::<T, EP, F>),
        )
        // Appliance
        .route("/devices", get(appliance::devices::<T, EP, F>))
        .route("/appliance", get(appliance::status::<T, EP, F>))
        // Services
        .route(
            "/services/dhw_auto_schedule",
            get(services::auto_schedule_status::<T, EP, F>)
                .post(services::dhw_auto_schedule::<T, EP, F>),
        )
        .route(
            "/services/read_registers",
            post(services::read_registers::<T, EP, F>),
        )
}
