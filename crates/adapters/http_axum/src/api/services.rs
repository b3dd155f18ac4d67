//! JSON handlers for service calls.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use thermohub_app::ports::{EventPublisher, ForecastProvider, RegisterTransport};
use thermohub_app::services::auto_schedule::RunStatus;
use thermohub_domain::planning::SchedulePlan;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for `POST /api/services/read_registers`.
#[derive(Deserialize)]
pub struct ReadRegistersRequest {
    pub address: u16,
    pub count: u16,
}

#[derive(Serialize)]
pub struct ReadRegistersResponse {
    pub address: u16,
    pub count: u16,
    pub values: Vec<u16>,
}

/// `POST /api/services/dhw_auto_schedule`
pub async fn dhw_auto_schedule<T, EP, F>(
    State(state): State<AppState<T, EP, F>>,
) -> Result<Json<SchedulePlan>, ApiError>
where
    T: RegisterTransport + 'static,
    EP: EventPublisher + Send + Sync + 'static,
    F: ForecastProvider + Send + Sync + 'static,
{
    let plan = state.auto_schedule.run().await?;
    Ok(Json(plan))
}

/// `GET /api/services/dhw_auto_schedule`
pub async fn auto_schedule_status<T, EP, F>(
    State(state): State<AppState<T, EP, F>>,
) -> Json<RunStatus>
where
    T: RegisterTransport + 'static,
    EP: EventPublisher + Send + Sync + 'static,
    F: ForecastProvider + Send + Sync + 'static,
{
    Json(state.auto_schedule.status())
}

/// `POST /api/services/read_registers`
pub async fn read_registers<T, EP, F>(
    State(state): State<AppState<T, EP, F>>,
    Json(req): Json<ReadRegistersRequest>,
) -> Result<Json<ReadRegistersResponse>, ApiError>
where
    T: RegisterTransport + 'static,
    EP: EventPublisher + Send + Sync + 'static,
    F: ForecastProvider + Send + Sync + 'static,
{
    let values = state.zones.read_registers(req.address, req.count).await?;
    Ok(Json(ReadRegistersResponse {
        address: req.address,
        count: req.count,
        values,
    }))
}
