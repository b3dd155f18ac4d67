//! JSON handlers for climate zones.

use std::str::FromStr;

use axum::Json;
use axum::extract::{Path, State};
use chrono::Weekday;
use serde::{Deserialize, Serialize};

use thermohub_app::ports::{EventPublisher, ForecastProvider, RegisterTransport};
use thermohub_domain::error::{NotFoundError, ThermoHubError, ValidationError};
use thermohub_domain::schedule::{Schedule, ScheduleId, TimeSlot};
use thermohub_domain::zone::{
    HeatingMode, HvacMode, Preset, TemperatureUnit, Zone, ZoneMode, ZoneType,
};

use crate::error::ApiError;
use crate::state::AppState;

/// Climate entity surface of one zone.
#[derive(Debug, Serialize)]
pub struct ZoneView {
    pub id: u8,
    pub name: String,
    pub zone_type: ZoneType,
    pub mode: ZoneMode,
    pub preset_mode: Option<Preset>,
    pub preset_modes: &'static [Preset],
    pub hvac_mode: HvacMode,
    pub hvac_modes: &'static [HvacMode],
    pub target_temperature: Option<f64>,
    pub current_temperature: Option<f64>,
    pub temperature_unit: TemperatureUnit,
    pub min_temp: f64,
    pub max_temp: f64,
    pub heating_mode: Option<HeatingMode>,
    pub pump_running: bool,
}

impl From<&Zone> for ZoneView {
    fn from(zone: &Zone) -> Self {
        let capability = zone.capability();
        let (min_temp, max_temp) = zone.zone_type.temperature_range();
        Self {
            id: zone.id,
            name: zone.short_name.clone(),
            zone_type: zone.zone_type,
            mode: zone.mode,
            preset_mode: zone.preset_mode(),
            preset_modes: capability.presets,
            hvac_mode: zone.hvac_mode(),
            hvac_modes: capability.hvac_modes,
            target_temperature: zone.target_temperature(),
            current_temperature: zone.current_temperature,
            temperature_unit: TemperatureUnit::Celsius,
            min_temp,
            max_temp,
            heating_mode: zone.heating_mode,
            pump_running: zone.pump_running,
        }
    }
}

/// Request body for `PUT /api/zones/{id}/preset`.
#[derive(Deserialize)]
pub struct PresetRequest {
    pub preset: String,
}

/// Request body for `PUT /api/zones/{id}/hvac_mode`.
#[derive(Deserialize)]
pub struct HvacModeRequest {
    pub hvac_mode: String,
}

/// Request body for `PUT /api/zones/{id}/temperature`.
#[derive(Deserialize)]
pub struct TemperatureRequest {
    pub temperature: f64,
    pub unit: String,
}

/// Request body for `PUT /api/zones/{id}/schedules/{slot}/{weekday}`.
#[derive(Deserialize)]
pub struct ScheduleRequest {
    pub slots: Vec<TimeSlot>,
    /// Read the program back after writing it.
    #[serde(default)]
    pub verify: bool,
}

fn parse_weekday(weekday: &str) -> Result<Weekday, ThermoHubError> {
    Weekday::from_str(weekday).map_err(|_| {
        ValidationError::UnknownValue {
            kind: "weekday",
            value: weekday.to_string(),
        }
        .into()
    })
}

fn parse_zone_id(id: &str) -> Result<u8, ApiError> {
    id.parse().map_err(|_| {
        ApiError::from(NotFoundError {
            entity: "Zone",
            id: id.to_string(),
        })
    })
}

/// `GET /api/zones`
pub async fn list<T, EP, F>(State(state): State<AppState<T, EP, F>>) -> Json<Vec<ZoneView>>
where
    T: RegisterTransport + 'static,
    EP: EventPublisher + Send + Sync + 'static,
    F: ForecastProvider + Send + Sync + 'static,
{
    let zones = state.zones.zones().await;
    Json(zones.iter().map(ZoneView::from).collect())
}

/// `GET /api/zones/{id}`
pub async fn get<T, EP, F>(
    State(state): State<AppState<T, EP, F>>,
    Path(id): Path<String>,
) -> Result<Json<ZoneView>, ApiError>
where
    T: RegisterTransport + 'static,
    EP: EventPublisher + Send + Sync + 'static,
    F: ForecastProvider + Send + Sync + 'static,
{
    let zone = state.zones.zone(parse_zone_id(&id)?).await?;
    Ok(Json(ZoneView::from(&zone)))
}

/// `POST /api/zones/{id}/refresh`
pub async fn refresh<T, EP, F>(
    State(state): State<AppState<T, EP, F>>,
    Path(id): Path<String>,
) -> Result<Json<ZoneView>, ApiError>
where
    T: RegisterTransport + 'static,
    EP: EventPublisher + Send + Sync + 'static,
    F: ForecastProvider + Send + Sync + 'static,
{
    let zone = state.zones.refresh(parse_zone_id(&id)?).await?;
    Ok(Json(ZoneView::from(&zone)))
}

/// `PUT /api/zones/{id}/preset`
pub async fn set_preset<T, EP, F>(
    State(state): State<AppState<T, EP, F>>,
    Path(id): Path<String>,
    Json(req): Json<PresetRequest>,
) -> Result<Json<ZoneView>, ApiError>
where
    T: RegisterTransport + 'static,
    EP: EventPublisher + Send + Sync + 'static,
    F: ForecastProvider + Send + Sync + 'static,
{
    let id = parse_zone_id(&id)?;
    let preset = Preset::from_str(&req.preset)?;
    let zone = state.zones.set_preset(id, preset).await?;
    Ok(Json(ZoneView::from(&zone)))
}

/// `PUT /api/zones/{id}/hvac_mode`
pub async fn set_hvac_mode<T, EP, F>(
    State(state): State<AppState<T, EP, F>>,
    Path(id): Path<String>,
    Json(req): Json<HvacModeRequest>,
) -> Result<Json<ZoneView>, ApiError>
where
    T: RegisterTransport + 'static,
    EP: EventPublisher + Send + Sync + 'static,
    F: ForecastProvider + Send + Sync + 'static,
{
    let id = parse_zone_id(&id)?;
    let mode = HvacMode::from_str(&req.hvac_mode)?;
    let zone = state.zones.set_hvac_mode(id, mode).await?;
    Ok(Json(ZoneView::from(&zone)))
}

/// `PUT /api/zones/{id}/temperature`
pub async fn set_temperature<T, EP, F>(
    State(state): State<AppState<T, EP, F>>,
    Path(id): Path<String>,
    Json(req): Json<TemperatureRequest>,
) -> Result<Json<ZoneView>, ApiError>
where
    T: RegisterTransport + 'static,
    EP: EventPublisher + Send + Sync + 'static,
    F: ForecastProvider + Send + Sync + 'static,
{
    let id = parse_zone_id(&id)?;
    let zone = state
        .zones
        .set_temperature(id, req.temperature, &req.unit)
        .await?;
    Ok(Json(ZoneView::from(&zone)))
}

/// `GET /api/zones/{id}/schedules/{slot}/{weekday}`
pub async fn schedule<T, EP, F>(
    State(state): State<AppState<T, EP, F>>,
    Path((id, slot, weekday)): Path<(String, String, String)>,
) -> Result<Json<Schedule>, ApiError>
where
    T: RegisterTransport + 'static,
    EP: EventPublisher + Send + Sync + 'static,
    F: ForecastProvider + Send + Sync + 'static,
{
    let id = parse_zone_id(&id)?;
    let slot = ScheduleId::from_str(&slot)?;
    let weekday = parse_weekday(&weekday)?;
    let schedule = state.zones.read_schedule(id, slot, weekday).await?;
    Ok(Json(schedule))
}

/// `PUT /api/zones/{id}/schedules/{slot}/{weekday}`
pub async fn import_schedule<T, EP, F>(
    State(state): State<AppState<T, EP, F>>,
    Path((id, slot, weekday)): Path<(String, String, String)>,
    Json(req): Json<ScheduleRequest>,
) -> Result<Json<Schedule>, ApiError>
where
    T: RegisterTransport + 'static,
    EP: EventPublisher + Send + Sync + 'static,
    F: ForecastProvider + Send + Sync + 'static,
{
    let id = parse_zone_id(&id)?;
    let slot = ScheduleId::from_str(&slot)?;
    let weekday = parse_weekday(&weekday)?;
    let schedule = state
        .zones
        .import_schedule(id, slot, weekday, req.slots, req.verify)
        .await?;
    Ok(Json(schedule))
}
