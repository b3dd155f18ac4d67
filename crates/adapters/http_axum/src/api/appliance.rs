//! JSON handlers for the appliance boards and status.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use thermohub_app::ports::{EventPublisher, ForecastProvider, RegisterTransport};
use thermohub_domain::appliance::{Appliance, DeviceInstance};

use crate::error::ApiError;
use crate::state::AppState;

/// One board, with its printable identifiers.
#[derive(Debug, Serialize)]
pub struct DeviceView {
    #[serde(flatten)]
    pub device: DeviceInstance,
    pub name: String,
    pub sw_version_label: String,
    pub hw_version_label: String,
    pub mainboard: bool,
}

impl From<DeviceInstance> for DeviceView {
    fn from(device: DeviceInstance) -> Self {
        Self {
            name: device.board.to_string(),
            sw_version_label: device.sw_version.to_string(),
            hw_version_label: device.hw_version.to_string(),
            mainboard: device.is_mainboard(),
            device,
        }
    }
}

/// Appliance status with the manual's error code.
#[derive(Debug, Serialize)]
pub struct ApplianceView {
    #[serde(flatten)]
    pub appliance: Appliance,
    pub error_code: String,
}

/// `GET /api/devices`
pub async fn devices<T, EP, F>(
    State(state): State<AppState<T, EP, F>>,
) -> Result<Json<Vec<DeviceView>>, ApiError>
where
    T: RegisterTransport + 'static,
    EP: EventPublisher + Send + Sync + 'static,
    F: ForecastProvider + Send + Sync + 'static,
{
    let devices = state.zones.read_device_instances().await?;
    Ok(Json(devices.into_iter().map(DeviceView::from).collect()))
}

/// `GET /api/appliance`
pub async fn status<T, EP, F>(
    State(state): State<AppState<T, EP, F>>,
) -> Result<Json<ApplianceView>, ApiError>
where
    T: RegisterTransport + 'static,
    EP: EventPublisher + Send + Sync + 'static,
    F: ForecastProvider + Send + Sync + 'static,
{
    let appliance = state.zones.read_appliance().await?;
    Ok(Json(ApplianceView {
        error_code: appliance.error_code(),
        appliance,
    }))
}
