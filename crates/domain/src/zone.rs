//! Zone: one climate circuit behind the gateway.
//!
//! A zone is either a domestic hot water circuit or a central heating
//! circuit. Its type is fixed at discovery and selects a static
//! [`Capability`] that bounds the HVAC modes and presets it accepts.
//!
//! The current preset and HVAC mode are never stored: they are derived from
//! the device registers mirrored on [`Zone`], so they cannot leave the
//! capability table. Commands are planned as a list of [`ZoneWrite`]s that
//! the caller sends to the device and then commits one by one with
//! [`Zone::apply`] once acknowledged.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::schedule::{Activity, ScheduleId};

/// Central heating room setpoint bounds, °C.
pub const CH_TEMPERATURE_RANGE: (f64, f64) = (6.0, 30.0);
/// Domestic hot water setpoint bounds, °C.
pub const DHW_TEMPERATURE_RANGE: (f64, f64) = (10.0, 65.0);

/// Kind of climate zone, fixed once discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneType {
    /// Domestic hot water.
    Dhw,
    /// Central heating, optionally with cooling.
    Ch,
}

impl ZoneType {
    /// The static capability set of this zone type.
    #[must_use]
    pub fn capability(self) -> &'static Capability {
        match self {
            Self::Dhw => &DHW_CAPABILITY,
            Self::Ch => &CH_CAPABILITY,
        }
    }

    /// Legal setpoint range in °C.
    #[must_use]
    pub fn temperature_range(self) -> (f64, f64) {
        match self {
            Self::Dhw => DHW_TEMPERATURE_RANGE,
            Self::Ch => CH_TEMPERATURE_RANGE,
        }
    }

    /// Activity code carried by this zone type's time programs.
    #[must_use]
    pub fn activity(self) -> Activity {
        match self {
            Self::Dhw => Activity::Dhw,
            Self::Ch => Activity::HeatCool,
        }
    }

    /// Classify a zone from its raw type and function codes.
    ///
    /// Returns `None` for zones this controller does not drive.
    #[must_use]
    pub fn classify(code: ZoneTypeCode, function: ZoneFunction) -> Option<Self> {
        match code {
            ZoneTypeCode::ChOnly | ZoneTypeCode::ChAndCooling => Some(Self::Ch),
            ZoneTypeCode::Dhw => Some(Self::Dhw),
            ZoneTypeCode::Other if function == ZoneFunction::MixingCircuit => Some(Self::Ch),
            ZoneTypeCode::Other if function.is_dhw() => Some(Self::Dhw),
            _ => None,
        }
    }
}

impl fmt::Display for ZoneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Dhw => "dhw",
            Self::Ch => "ch",
        };
        f.write_str(s)
    }
}

/// Allowed HVAC modes and presets of a zone type.
#[derive(Debug, PartialEq, Eq)]
pub struct Capability {
    pub hvac_modes: &'static [HvacMode],
    pub presets: &'static [Preset],
}

impl Capability {
    #[must_use]
    pub fn allows_preset(&self, preset: Preset) -> bool {
        self.presets.contains(&preset)
    }

    #[must_use]
    pub fn allows_hvac_mode(&self, mode: HvacMode) -> bool {
        self.hvac_modes.contains(&mode)
    }
}

static DHW_CAPABILITY: Capability = Capability {
    hvac_modes: &[HvacMode::Off, HvacMode::Heat, HvacMode::Auto],
    presets: &[
        Preset::Schedule1,
        Preset::Schedule2,
        Preset::Schedule3,
        Preset::Comfort,
        Preset::Eco,
    ],
};

static CH_CAPABILITY: Capability = Capability {
    hvac_modes: &[
        HvacMode::Off,
        HvacMode::HeatCool,
        HvacMode::Cool,
        HvacMode::Auto,
    ],
    presets: &[
        Preset::Schedule1,
        Preset::Schedule2,
        Preset::Schedule3,
        Preset::Manual,
        Preset::AntiFrost,
    ],
};

/// HVAC mode exposed on the climate surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HvacMode {
    Off,
    Heat,
    HeatCool,
    Cool,
    Auto,
}

impl HvacMode {
    fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Heat => "heat",
            Self::HeatCool => "heat_cool",
            Self::Cool => "cool",
            Self::Auto => "auto",
        }
    }
}

impl fmt::Display for HvacMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HvacMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Off, Self::Heat, Self::HeatCool, Self::Cool, Self::Auto]
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownValue {
                kind: "hvac mode",
                value: s.to_string(),
            })
    }
}

/// Named operating profile of a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    Manual,
    AntiFrost,
    Comfort,
    Eco,
    #[serde(rename = "schedule_1")]
    Schedule1,
    #[serde(rename = "schedule_2")]
    Schedule2,
    #[serde(rename = "schedule_3")]
    Schedule3,
}

impl Preset {
    /// The device time program this preset follows, if schedule-driven.
    #[must_use]
    pub fn schedule(self) -> Option<ScheduleId> {
        match self {
            Self::Schedule1 => Some(ScheduleId::Schedule1),
            Self::Schedule2 => Some(ScheduleId::Schedule2),
            Self::Schedule3 => Some(ScheduleId::Schedule3),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::AntiFrost => "anti_frost",
            Self::Comfort => "comfort",
            Self::Eco => "eco",
            Self::Schedule1 => "schedule_1",
            Self::Schedule2 => "schedule_2",
            Self::Schedule3 => "schedule_3",
        }
    }
}

impl From<ScheduleId> for Preset {
    fn from(id: ScheduleId) -> Self {
        match id {
            ScheduleId::Schedule1 => Self::Schedule1,
            ScheduleId::Schedule2 => Self::Schedule2,
            ScheduleId::Schedule3 => Self::Schedule3,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Self::Manual,
            Self::AntiFrost,
            Self::Comfort,
            Self::Eco,
            Self::Schedule1,
            Self::Schedule2,
            Self::Schedule3,
        ]
        .into_iter()
        .find(|preset| preset.as_str() == s)
        .ok_or_else(|| ValidationError::UnknownValue {
            kind: "preset",
            value: s.to_string(),
        })
    }
}

/// Operating mode stored on the device for a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneMode {
    Scheduling,
    Manual,
    AntiFrost,
}

/// Raw zone type as reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneTypeCode {
    NotPresent,
    ChOnly,
    ChAndCooling,
    Dhw,
    ProcessHeat,
    SwimmingPool,
    Other,
}

/// Raw zone function as reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneFunction {
    Disabled,
    Direct,
    MixingCircuit,
    SwimmingPool,
    HighTemperature,
    FanConvector,
    DhwTank,
    ElectricalDhwTank,
    TimeProgram,
    ProcessHeat,
    DhwLayered,
    DhwBic,
    DhwCommercialTank,
    DhwPrimary,
}

impl ZoneFunction {
    /// Whether this function heats domestic hot water.
    #[must_use]
    pub fn is_dhw(self) -> bool {
        matches!(
            self,
            Self::DhwTank
                | Self::ElectricalDhwTank
                | Self::DhwLayered
                | Self::DhwBic
                | Self::DhwCommercialTank
                | Self::DhwPrimary
        )
    }
}

/// What the zone pump is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeatingMode {
    Standby,
    Heating,
    Cooling,
}

/// Unit a target temperature is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemperatureUnit {
    #[serde(rename = "°C")]
    Celsius,
    #[serde(rename = "°F")]
    Fahrenheit,
    #[serde(rename = "K")]
    Kelvin,
}

impl TemperatureUnit {
    /// Convert `value` in this unit to degrees Celsius.
    #[must_use]
    pub fn to_celsius(self, value: f64) -> f64 {
        match self {
            Self::Celsius => value,
            Self::Fahrenheit => (value - 32.0) * 5.0 / 9.0,
            Self::Kelvin => value - 273.15,
        }
    }
}

impl FromStr for TemperatureUnit {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "°C" | "C" | "celsius" => Ok(Self::Celsius),
            "°F" | "F" | "fahrenheit" => Ok(Self::Fahrenheit),
            "K" | "kelvin" => Ok(Self::Kelvin),
            other => Err(ValidationError::UnsupportedTemperatureUnit {
                unit: other.to_string(),
            }),
        }
    }
}

/// Setpoint register targeted by a temperature command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetpointTarget {
    RoomManual,
    DhwComfort,
    DhwReduced,
}

/// One register-level change needed to reach a requested zone state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZoneWrite {
    SelectSchedule(ScheduleId),
    Mode(ZoneMode),
    CoolingForced(bool),
    Setpoint { target: SetpointTarget, celsius: f64 },
}

/// Mirror of a zone's device state, as last confirmed by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    /// One-based zone number on the gateway.
    pub id: u8,
    pub zone_type: ZoneType,
    pub function: ZoneFunction,
    pub short_name: String,
    pub mode: ZoneMode,
    pub selected_schedule: Option<ScheduleId>,
    pub cooling_forced: bool,
    pub room_setpoint: Option<f64>,
    pub dhw_comfort_setpoint: Option<f64>,
    pub dhw_reduced_setpoint: Option<f64>,
    pub current_temperature: Option<f64>,
    pub heating_mode: Option<HeatingMode>,
    pub pump_running: bool,
}

impl Zone {
    /// Create a zone in scheduling mode with no readings.
    #[must_use]
    pub fn new(id: u8, zone_type: ZoneType) -> Self {
        let function = match zone_type {
            ZoneType::Dhw => ZoneFunction::DhwPrimary,
            ZoneType::Ch => ZoneFunction::MixingCircuit,
        };
        Self {
            id,
            zone_type,
            function,
            short_name: String::new(),
            mode: ZoneMode::Scheduling,
            selected_schedule: Some(ScheduleId::Schedule1),
            cooling_forced: false,
            room_setpoint: None,
            dhw_comfort_setpoint: None,
            dhw_reduced_setpoint: None,
            current_temperature: None,
            heating_mode: None,
            pump_running: false,
        }
    }

    #[must_use]
    pub fn capability(&self) -> &'static Capability {
        self.zone_type.capability()
    }

    /// Current preset, or `None` when scheduling without a selected program.
    #[must_use]
    pub fn preset_mode(&self) -> Option<Preset> {
        match (self.zone_type, self.mode) {
            (_, ZoneMode::Scheduling) => self.selected_schedule.map(Preset::from),
            (ZoneType::Dhw, ZoneMode::Manual) => Some(Preset::Comfort),
            (ZoneType::Dhw, ZoneMode::AntiFrost) => Some(Preset::Eco),
            (ZoneType::Ch, ZoneMode::Manual) => Some(Preset::Manual),
            (ZoneType::Ch, ZoneMode::AntiFrost) => Some(Preset::AntiFrost),
        }
    }

    #[must_use]
    pub fn hvac_mode(&self) -> HvacMode {
        match (self.zone_type, self.mode) {
            (_, ZoneMode::AntiFrost) => HvacMode::Off,
            (_, ZoneMode::Scheduling) => HvacMode::Auto,
            (ZoneType::Dhw, ZoneMode::Manual) => HvacMode::Heat,
            (ZoneType::Ch, ZoneMode::Manual) if self.cooling_forced => HvacMode::Cool,
            (ZoneType::Ch, ZoneMode::Manual) => HvacMode::HeatCool,
        }
    }

    /// Setpoint the zone is currently steering to, in °C.
    #[must_use]
    pub fn target_temperature(&self) -> Option<f64> {
        match self.zone_type {
            ZoneType::Dhw if self.mode == ZoneMode::AntiFrost => self.dhw_reduced_setpoint,
            ZoneType::Dhw => self.dhw_comfort_setpoint,
            ZoneType::Ch => self.room_setpoint,
        }
    }

    /// Plan the writes that switch this zone to `preset`.
    ///
    /// An empty plan means the zone already runs that preset.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnsupportedPreset`] if the zone type does
    /// not allow `preset`.
    pub fn plan_preset(&self, preset: Preset) -> Result<Vec<ZoneWrite>, ValidationError> {
        if !self.capability().allows_preset(preset) {
            return Err(ValidationError::UnsupportedPreset {
                zone_id: self.id,
                zone_type: self.zone_type,
                preset,
            });
        }
        if self.preset_mode() == Some(preset) {
            return Ok(Vec::new());
        }
        let writes = match preset {
            Preset::Schedule1 | Preset::Schedule2 | Preset::Schedule3 => {
                let mut writes = Vec::with_capacity(2);
                if let Some(id) = preset.schedule() {
                    writes.push(ZoneWrite::SelectSchedule(id));
                }
                if self.mode != ZoneMode::Scheduling {
                    writes.push(ZoneWrite::Mode(ZoneMode::Scheduling));
                }
                writes
            }
            Preset::Comfort | Preset::Manual => vec![ZoneWrite::Mode(ZoneMode::Manual)],
            Preset::Eco | Preset::AntiFrost => vec![ZoneWrite::Mode(ZoneMode::AntiFrost)],
        };
        Ok(writes)
    }

    /// Plan the writes that switch this zone to `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnsupportedHvacMode`] if the zone type does
    /// not allow `mode`.
    pub fn plan_hvac_mode(&self, mode: HvacMode) -> Result<Vec<ZoneWrite>, ValidationError> {
        if !self.capability().allows_hvac_mode(mode) {
            return Err(ValidationError::UnsupportedHvacMode {
                zone_id: self.id,
                zone_type: self.zone_type,
                mode,
            });
        }
        if self.hvac_mode() == mode {
            return Ok(Vec::new());
        }
        let (zone_mode, cooling) = match mode {
            HvacMode::Off => (ZoneMode::AntiFrost, false),
            HvacMode::Heat | HvacMode::HeatCool => (ZoneMode::Manual, false),
            HvacMode::Cool => (ZoneMode::Manual, true),
            HvacMode::Auto => (ZoneMode::Scheduling, false),
        };
        let mut writes = Vec::with_capacity(2);
        if self.zone_type == ZoneType::Ch && self.cooling_forced != cooling {
            writes.push(ZoneWrite::CoolingForced(cooling));
        }
        if self.mode != zone_mode {
            writes.push(ZoneWrite::Mode(zone_mode));
        }
        Ok(writes)
    }

    /// Plan the write that sets the target temperature, given in °C.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidOperationInContext`] if the current
    /// preset does not take a direct setpoint, or
    /// [`ValidationError::TemperatureOutOfRange`] if `celsius` falls outside
    /// the zone type's range.
    pub fn plan_temperature(&self, celsius: f64) -> Result<ZoneWrite, ValidationError> {
        let preset = self.preset_mode();
        let target = match (self.zone_type, preset) {
            (ZoneType::Dhw, Some(Preset::Comfort)) => SetpointTarget::DhwComfort,
            (ZoneType::Dhw, Some(Preset::Eco)) => SetpointTarget::DhwReduced,
            (ZoneType::Ch, Some(Preset::Manual)) => SetpointTarget::RoomManual,
            _ => {
                return Err(ValidationError::InvalidOperationInContext {
                    zone_id: self.id,
                    operation: "set temperature",
                    preset,
                });
            }
        };
        let (min, max) = self.zone_type.temperature_range();
        if !celsius.is_finite() || celsius < min || celsius > max {
            return Err(ValidationError::TemperatureOutOfRange {
                zone_id: self.id,
                value: celsius,
                min,
                max,
            });
        }
        Ok(ZoneWrite::Setpoint { target, celsius })
    }

    /// Commit one write the device has acknowledged.
    pub fn apply(&mut self, write: &ZoneWrite) {
        match *write {
            ZoneWrite::SelectSchedule(id) => self.selected_schedule = Some(id),
            ZoneWrite::Mode(mode) => self.mode = mode,
            ZoneWrite::CoolingForced(on) => self.cooling_forced = on,
            ZoneWrite::Setpoint { target, celsius } => match target {
                SetpointTarget::RoomManual => self.room_setpoint = Some(celsius),
                SetpointTarget::DhwComfort => self.dhw_comfort_setpoint = Some(celsius),
                SetpointTarget::DhwReduced => self.dhw_reduced_setpoint = Some(celsius),
            },
        }
    }
}
