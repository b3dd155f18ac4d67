//! Zone controller: use-cases for the climate zones behind the gateway.
//!
//! Commands are validated against the zone's capability and current preset
//! before any I/O. The planned writes are encoded up front, sent under one
//! hub session, and each one is committed to the local zone mirror only
//! after the gateway acknowledged it.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Weekday;
use tokio::sync::RwLock;

use thermohub_domain::appliance::{Appliance, ApplianceStatus, DeviceInstance};
use thermohub_domain::error::{NotFoundError, ProtocolError, ThermoHubError, ValidationError};
use thermohub_domain::event::{Event, EventType};
use thermohub_domain::register::{
    self, APPLIANCE_STATUS_1, APPLIANCE_STATUS_2, COOLING_FORCED, CURRENT_ERROR,
    DEVICE_ARTICLE_NUMBER, DEVICE_BOARD, DEVICE_HW_VERSION, DEVICE_SW_VERSION,
    DHW_COMFORT_SETPOINT, DHW_REDUCED_SETPOINT, DHW_TANK_TEMPERATURE, ERROR_PRIORITY, Field,
    HEATING_MODE, NUMBER_OF_DEVICES, NUMBER_OF_ZONES, PUMP_RUNNING, ROOM_MANUAL_SETPOINT,
    ROOM_TEMPERATURE, SEASON_MODE, SELECTED_TIME_PROGRAM, Scaled, ZONE_FUNCTION, ZONE_MODE,
    ZONE_SHORT_NAME, ZONE_TYPE,
};
use thermohub_domain::schedule::{Schedule, ScheduleId, TimeSlot};
use thermohub_domain::zone::{
    HvacMode, Preset, SetpointTarget, TemperatureUnit, Zone, ZoneFunction, ZoneType, ZoneWrite,
};

use crate::hub::{Hub, HubSession};
use crate::ports::{EventPublisher, RegisterTransport};

/// Most registers one diagnostic read may span.
pub const MAX_READ_COUNT: u16 = 125;

/// Application service owning the zone mirror of one hub.
pub struct ZoneController<T, EP> {
    hub: Arc<Hub<T>>,
    publisher: EP,
    zones: RwLock<BTreeMap<u8, Zone>>,
}

impl<T: RegisterTransport, EP: EventPublisher> ZoneController<T, EP> {
    /// Create a controller with no known zones; call
    /// [`discover`](Self::discover) before issuing commands.
    pub fn new(hub: Arc<Hub<T>>, publisher: EP) -> Self {
        Self {
            hub,
            publisher,
            zones: RwLock::new(BTreeMap::new()),
        }
    }

    #[must_use]
    pub fn hub(&self) -> &Arc<Hub<T>> {
        &self.hub
    }

    /// Read the zone table from the gateway and replace the mirror.
    ///
    /// Zones that are neither DHW nor CH are skipped.
    ///
    /// # Errors
    ///
    /// Returns a connection or protocol error; the previous mirror is kept.
    #[tracing::instrument(skip(self), fields(hub = %self.hub.name()))]
    pub async fn discover(&self) -> Result<Vec<Zone>, ThermoHubError> {
        let mut session = self.hub.session().await;
        let count = session.read_field(&NUMBER_OF_ZONES).await?;
        let mut found = BTreeMap::new();
        for id in 1..=count {
            let code = session.read_field(&ZONE_TYPE.for_zone(id)).await?;
            let function = session.read_field(&ZONE_FUNCTION.for_zone(id)).await?;
            let Some(zone_type) = ZoneType::classify(code, function) else {
                tracing::debug!(zone_id = id, ?code, ?function, "skipping unsupported zone");
                continue;
            };
            let zone = read_zone(&mut session, id, zone_type, function).await?;
            found.insert(id, zone);
        }
        drop(session);

        let zones: Vec<Zone> = found.values().cloned().collect();
        tracing::info!(count = zones.len(), "zones discovered");
        *self.zones.write().await = found;
        Ok(zones)
    }

    /// All known zones, by id.
    pub async fn zones(&self) -> Vec<Zone> {
        self.zones.read().await.values().cloned().collect()
    }

    /// Look up a zone by id.
    ///
    /// # Errors
    ///
    /// Returns [`ThermoHubError::NotFound`] for an unknown id.
    pub async fn zone(&self, id: u8) -> Result<Zone, ThermoHubError> {
        self.zones.read().await.get(&id).cloned().ok_or_else(|| {
            NotFoundError {
                entity: "Zone",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// The lowest-numbered DHW zone, if any.
    pub async fn dhw_zone(&self) -> Option<Zone> {
        self.zones
            .read()
            .await
            .values()
            .find(|zone| zone.zone_type == ZoneType::Dhw)
            .cloned()
    }

    /// Switch a zone to `preset`.
    ///
    /// # Errors
    ///
    /// Returns [`ThermoHubError::Validation`] without I/O when the zone type
    /// does not support `preset`, or the hub's error when a write fails.
    #[tracing::instrument(skip(self))]
    pub async fn set_preset(&self, id: u8, preset: Preset) -> Result<Zone, ThermoHubError> {
        self.run_plan(id, |zone| zone.plan_preset(preset)).await
    }

    /// Switch a zone to HVAC `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`ThermoHubError::Validation`] without I/O when the zone type
    /// does not support `mode`, or the hub's error when a write fails.
    #[tracing::instrument(skip(self))]
    pub async fn set_hvac_mode(&self, id: u8, mode: HvacMode) -> Result<Zone, ThermoHubError> {
        self.run_plan(id, |zone| zone.plan_hvac_mode(mode)).await
    }

    /// Set the target temperature, given in `unit`.
    ///
    /// The value is converted to °C and rounded to the setpoint register's
    /// resolution.
    ///
    /// # Errors
    ///
    /// Returns [`ThermoHubError::Validation`] without I/O for an unknown
    /// unit, a preset that takes no direct setpoint, or an out-of-range
    /// value; the hub's error when the write fails.
    #[tracing::instrument(skip(self))]
    pub async fn set_temperature(
        &self,
        id: u8,
        value: f64,
        unit: &str,
    ) -> Result<Zone, ThermoHubError> {
        let unit: TemperatureUnit = unit.parse()?;
        let celsius = unit.to_celsius(value);
        self.run_plan(id, |zone| {
            let write = match zone.plan_temperature(celsius)? {
                ZoneWrite::Setpoint { target, celsius } => ZoneWrite::Setpoint {
                    target,
                    celsius: setpoint_field(target).codec.quantize(celsius),
                },
                other => other,
            };
            Ok(vec![write])
        })
        .await
    }

    /// Re-read one zone from the gateway.
    ///
    /// # Errors
    ///
    /// Returns [`ThermoHubError::NotFound`] for an unknown id, or a
    /// connection or protocol error.
    #[tracing::instrument(skip(self))]
    pub async fn refresh(&self, id: u8) -> Result<Zone, ThermoHubError> {
        let mut session = self.hub.session().await;
        let known = self.zone(id).await?;
        let fresh = read_zone(&mut session, id, known.zone_type, known.function).await?;
        drop(session);

        self.zones.write().await.insert(id, fresh.clone());
        if fresh != known {
            tracing::info!(zone_id = id, "zone state changed on device");
            self.publish_zone(&fresh).await;
        }
        Ok(fresh)
    }

    /// Read the day program of a zone's schedule slot.
    ///
    /// # Errors
    ///
    /// Returns [`ThermoHubError::NotFound`] for an unknown zone, a
    /// connection or protocol error, or [`ThermoHubError::Validation`] when
    /// the program holds no switch points.
    #[tracing::instrument(skip(self))]
    pub async fn read_schedule(
        &self,
        id: u8,
        schedule: ScheduleId,
        weekday: Weekday,
    ) -> Result<Schedule, ThermoHubError> {
        self.zone(id).await?;
        let field = register::time_program(id, schedule, weekday);
        let points = self.hub.session().await.read_field(&field).await?;
        Ok(Schedule::from_switch_points(schedule, weekday, &points)?)
    }

    /// Write a day program into a zone's schedule slot.
    ///
    /// With `verify`, the program is read back in the same session and
    /// compared word by word.
    ///
    /// # Errors
    ///
    /// Returns [`ThermoHubError::Validation`] before any I/O when the
    /// program's activity does not match the zone type,
    /// [`ThermoHubError::Protocol`] when the schedule does not fit a device
    /// program, or
    /// [`ProtocolError::VerificationMismatch`] when the read-back differs;
    /// the hub's error when a request fails.
    #[tracing::instrument(skip(self, schedule), fields(slot = %schedule.id(), weekday = %schedule.weekday()))]
    pub async fn write_schedule(
        &self,
        id: u8,
        schedule: &Schedule,
        verify: bool,
    ) -> Result<(), ThermoHubError> {
        let zone = self.zone(id).await?;
        if schedule.activity() != zone.zone_type.activity() {
            return Err(ValidationError::InvalidSchedule {
                reason: format!(
                    "{:?} program cannot run on {} zone {id}",
                    schedule.activity(),
                    zone.zone_type
                ),
            }
            .into());
        }
        let field = register::time_program(id, schedule.id(), schedule.weekday());
        let expected = field.encode(&schedule.switch_points())?;

        let mut session = self.hub.session().await;
        session.write(field.address, &expected).await?;
        if verify {
            let actual = session.read(field.address, field.count()).await?;
            if actual != expected {
                return Err(ProtocolError::VerificationMismatch {
                    address: field.address,
                    expected,
                    actual,
                }
                .into());
            }
        }
        tracing::info!(zone_id = id, address = field.address, verified = verify, "schedule written");
        Ok(())
    }

    /// Replace a zone's day program with externally edited `slots`.
    ///
    /// The program runs the activity of the zone's type.
    ///
    /// # Errors
    ///
    /// Returns [`ThermoHubError::NotFound`] for an unknown zone,
    /// [`ThermoHubError::Validation`] when the slots do not tile the day,
    /// or the errors of [`write_schedule`](Self::write_schedule).
    #[tracing::instrument(skip(self, slots), fields(slots = slots.len()))]
    pub async fn import_schedule(
        &self,
        id: u8,
        slot: ScheduleId,
        weekday: Weekday,
        slots: Vec<TimeSlot>,
        verify: bool,
    ) -> Result<Schedule, ThermoHubError> {
        let zone = self.zone(id).await?;
        let schedule = Schedule::new(slot, weekday, zone.zone_type.activity(), slots)?;
        self.write_schedule(id, &schedule, verify).await?;
        Ok(schedule)
    }

    /// Read every board registered on the appliance.
    ///
    /// # Errors
    ///
    /// Returns a connection or protocol error, including an unknown board
    /// type.
    #[tracing::instrument(skip(self), fields(hub = %self.hub.name()))]
    pub async fn read_device_instances(&self) -> Result<Vec<DeviceInstance>, ThermoHubError> {
        let mut session = self.hub.session().await;
        let count = session.read_field(&NUMBER_OF_DEVICES).await?;
        let mut devices = Vec::with_capacity(usize::from(count));
        for id in 0..count {
            let device = DeviceInstance {
                id,
                board: session.read_field(&DEVICE_BOARD.for_device(id)).await?,
                sw_version: session.read_field(&DEVICE_SW_VERSION.for_device(id)).await?,
                hw_version: session.read_field(&DEVICE_HW_VERSION.for_device(id)).await?,
                article_number: session
                    .read_field(&DEVICE_ARTICLE_NUMBER.for_device(id))
                    .await?,
            };
            tracing::debug!(device_id = id, board = %device.board, sw = %device.sw_version, "device instance");
            devices.push(device);
        }
        Ok(devices)
    }

    /// Read the appliance status, active error and season.
    ///
    /// # Errors
    ///
    /// Returns a connection or protocol error.
    #[tracing::instrument(skip(self), fields(hub = %self.hub.name()))]
    pub async fn read_appliance(&self) -> Result<Appliance, ThermoHubError> {
        let mut session = self.hub.session().await;
        let appliance = Appliance {
            current_error: session.read_field(&CURRENT_ERROR).await?,
            error_priority: session.read_field(&ERROR_PRIORITY).await?,
            status: ApplianceStatus::from_bytes(
                session.read_field(&APPLIANCE_STATUS_1).await?,
                session.read_field(&APPLIANCE_STATUS_2).await?,
            ),
            season_mode: session.read_field(&SEASON_MODE).await?,
        };
        if appliance.error_priority.is_some() {
            tracing::warn!(error = %appliance.error_code(), "appliance reports an error");
        }
        Ok(appliance)
    }

    /// Raw holding registers, for diagnostics.
    ///
    /// # Errors
    ///
    /// Returns [`ThermoHubError::Validation`] when `count` is zero or above
    /// [`MAX_READ_COUNT`], or the hub's error.
    #[tracing::instrument(skip(self))]
    pub async fn read_registers(&self, address: u16, count: u16) -> Result<Vec<u16>, ThermoHubError> {
        if !(1..=MAX_READ_COUNT).contains(&count) {
            return Err(ValidationError::InvalidConfig {
                field: "count",
                reason: format!("must be within [1, {MAX_READ_COUNT}], got {count}"),
            }
            .into());
        }
        self.hub.read(address, count).await
    }

    /// Validate `plan` against the mirror, then send it under a hub session.
    ///
    /// The plan is rebuilt once the session is held, since another command
    /// may have changed the zone while this one waited.
    async fn run_plan<P>(&self, id: u8, plan: P) -> Result<Zone, ThermoHubError>
    where
        P: Fn(&Zone) -> Result<Vec<ZoneWrite>, ValidationError>,
    {
        plan(&self.zone(id).await?)?;
        let mut session = self.hub.session().await;
        let zone = self.zone(id).await?;
        let writes = plan(&zone)?;
        self.commit(&mut session, zone, writes).await
    }

    async fn commit(
        &self,
        session: &mut HubSession<'_, T>,
        zone: Zone,
        writes: Vec<ZoneWrite>,
    ) -> Result<Zone, ThermoHubError> {
        if writes.is_empty() {
            tracing::debug!(zone_id = zone.id, "zone already in requested state");
            return Ok(zone);
        }
        let encoded = writes
            .into_iter()
            .map(|write| encode_write(zone.id, &write).map(|(address, words)| (address, words, write)))
            .collect::<Result<Vec<_>, ProtocolError>>()?;

        for (address, words, write) in encoded {
            if let Err(err) = session.write(address, &words).await {
                tracing::warn!(
                    zone_id = zone.id,
                    address,
                    error = %err,
                    "zone write failed, keeping last confirmed state"
                );
                return Err(err);
            }
            let mut zones = self.zones.write().await;
            if matches!(write, ZoneWrite::CoolingForced(_)) {
                // One appliance register, shared by every zone.
                zones.values_mut().for_each(|mirror| mirror.apply(&write));
            } else if let Some(mirror) = zones.get_mut(&zone.id) {
                mirror.apply(&write);
            }
        }

        let updated = self.zone(zone.id).await?;
        tracing::info!(
            zone_id = updated.id,
            preset = ?updated.preset_mode(),
            hvac_mode = %updated.hvac_mode(),
            "zone updated"
        );
        self.publish_zone(&updated).await;
        Ok(updated)
    }

    async fn publish_zone(&self, zone: &Zone) {
        let data = serde_json::json!({
            "preset_mode": zone.preset_mode(),
            "hvac_mode": zone.hvac_mode(),
            "target_temperature": zone.target_temperature(),
            "current_temperature": zone.current_temperature,
        });
        let event = Event::new(EventType::ZoneUpdated, Some(zone.id), data);
        if let Err(err) = self.publisher.publish(event).await {
            tracing::warn!(zone_id = zone.id, error = %err, "failed to publish zone event");
        }
    }
}

fn setpoint_field(target: SetpointTarget) -> Field<Scaled> {
    match target {
        SetpointTarget::RoomManual => ROOM_MANUAL_SETPOINT,
        SetpointTarget::DhwComfort => DHW_COMFORT_SETPOINT,
        SetpointTarget::DhwReduced => DHW_REDUCED_SETPOINT,
    }
}

fn encode_write(zone_id: u8, write: &ZoneWrite) -> Result<(u16, Vec<u16>), ProtocolError> {
    match *write {
        ZoneWrite::SelectSchedule(schedule) => {
            let field = SELECTED_TIME_PROGRAM.for_zone(zone_id);
            Ok((field.address, field.encode(&Some(schedule))?))
        }
        ZoneWrite::Mode(mode) => {
            let field = ZONE_MODE.for_zone(zone_id);
            Ok((field.address, field.encode(&mode)?))
        }
        // Appliance-wide, not part of a zone window.
        ZoneWrite::CoolingForced(on) => Ok((COOLING_FORCED.address, COOLING_FORCED.encode(&on)?)),
        ZoneWrite::Setpoint { target, celsius } => {
            let field = setpoint_field(target).for_zone(zone_id);
            Ok((field.address, field.encode(&Some(celsius))?))
        }
    }
}

async fn read_zone<T: RegisterTransport>(
    session: &mut HubSession<'_, T>,
    id: u8,
    zone_type: ZoneType,
    function: ZoneFunction,
) -> Result<Zone, ThermoHubError> {
    let mut zone = Zone::new(id, zone_type);
    zone.function = function;
    zone.short_name = session.read_field(&ZONE_SHORT_NAME.for_zone(id)).await?;
    zone.mode = session.read_field(&ZONE_MODE.for_zone(id)).await?;
    zone.selected_schedule = session
        .read_field(&SELECTED_TIME_PROGRAM.for_zone(id))
        .await?;
    zone.cooling_forced = session.read_field(&COOLING_FORCED).await?;
    match zone_type {
        ZoneType::Dhw => {
            zone.dhw_comfort_setpoint = session
                .read_field(&DHW_COMFORT_SETPOINT.for_zone(id))
                .await?;
            zone.dhw_reduced_setpoint = session
                .read_field(&DHW_REDUCED_SETPOINT.for_zone(id))
                .await?;
            zone.current_temperature = session
                .read_field(&DHW_TANK_TEMPERATURE.for_zone(id))
                .await?;
        }
        ZoneType::Ch => {
            zone.room_setpoint = session
                .read_field(&ROOM_MANUAL_SETPOINT.for_zone(id))
                .await?;
            zone.current_temperature = session.read_field(&ROOM_TEMPERATURE.for_zone(id)).await?;
        }
    }
    zone.heating_mode = session.read_field(&HEATING_MODE.for_zone(id)).await?;
    zone.pump_running = session.read_field(&PUMP_RUNNING.for_zone(id)).await?;
    Ok(zone)
}
