//! Error conventions shared by every layer.
//!
//! Each variant of [`ThermoHubError`] is one fault class. Callers decide on
//! retries and re-verification by matching on the class, never on the message.

use chrono::Weekday;

use crate::schedule::ScheduleId;
use crate::time::Timestamp;
use crate::zone::{HvacMode, Preset, ZoneType};

/// Top-level error type for thermohub.
#[derive(Debug, thiserror::Error)]
pub enum ThermoHubError {
    /// Transport-level fault: timeout, unreachable gateway, malformed frame.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Malformed or out-of-range register content.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A command or configuration value rejected before any device I/O.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A scheduling run could not start.
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    /// A scheduling run failed while committing to the device.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    /// Another scheduling run is in flight.
    #[error("an auto schedule run is already in progress")]
    Busy,

    /// The forecast provider failed to hand back a snapshot.
    #[error("forecast provider error: {0}")]
    Provider(Box<dyn std::error::Error + Send + Sync>),
}

impl ThermoHubError {
    /// Whether the hub should retry the request that produced this error.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

/// Transport-level faults.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("connection to modbus device lost")]
    NotConnected,

    #[error("failed to connect to {target}: {reason}")]
    Connect { target: String, reason: String },

    #[error("request at register {address} timed out after {timeout_ms} ms")]
    Timeout { address: u16, timeout_ms: u64 },

    #[error("transport failure at register {address}: {reason}")]
    Transport { address: u16, reason: String },

    #[error("giving up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<ConnectionError>,
    },
}

/// Faults decoding or encoding register content.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("unknown code {code} for field `{field}`")]
    UnknownCode { field: &'static str, code: u16 },

    #[error("value {value} for field `{field}` is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("value {value} for field `{field}` is not a multiple of {scale}")]
    NotRepresentable {
        field: &'static str,
        value: f64,
        scale: f64,
    },

    #[error("field `{field}` expects {expected} registers, got {actual}")]
    WordCount {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("field `{field}` is not valid ascii text")]
    InvalidText { field: &'static str },

    #[error("time program holds {count} switch points, at most {max} are allowed")]
    TooManySwitchPoints { count: usize, max: usize },

    #[error("switch time {minute} is not on a 10 minute boundary within the day")]
    InvalidSwitchTime { minute: u16 },

    #[error("device answered register {address} with exception: {code}")]
    DeviceException { address: u16, code: String },

    #[error("register {address} read back {actual:?}, expected {expected:?}")]
    VerificationMismatch {
        address: u16,
        expected: Vec<u16>,
        actual: Vec<u16>,
    },
}

/// Domain validation faults, raised before any device I/O.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{what} must not be empty")]
    EmptyName { what: &'static str },

    #[error("preset `{preset}` is not supported by {zone_type} zone {zone_id}")]
    UnsupportedPreset {
        zone_id: u8,
        zone_type: ZoneType,
        preset: Preset,
    },

    #[error("hvac mode `{mode}` is not supported by {zone_type} zone {zone_id}")]
    UnsupportedHvacMode {
        zone_id: u8,
        zone_type: ZoneType,
        mode: HvacMode,
    },

    #[error("cannot {operation} on zone {zone_id} while preset is `{}`", display_preset(.preset))]
    InvalidOperationInContext {
        zone_id: u8,
        operation: &'static str,
        preset: Option<Preset>,
    },

    #[error("unsupported temperature unit `{unit}`")]
    UnsupportedTemperatureUnit { unit: String },

    #[error("temperature {value} °C for zone {zone_id} is outside [{min}, {max}]")]
    TemperatureOutOfRange {
        zone_id: u8,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("unknown {kind} `{value}`")]
    UnknownValue { kind: &'static str, value: String },

    #[error("invalid `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("invalid schedule: {reason}")]
    InvalidSchedule { reason: String },

    #[error("heating power {available_w} W does not exceed the standby loss of {loss_w} W")]
    InsufficientHeatingPower { available_w: f64, loss_w: f64 },
}

fn display_preset(preset: &Option<Preset>) -> String {
    preset.map_or_else(|| "none".to_string(), |p| p.to_string())
}

/// Scheduling preconditions that failed before any computation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PreconditionError {
    #[error("no domestic hot water zone was discovered")]
    NoDhwZone,

    #[error("the weather provider returned no forecasts")]
    NoForecasts,

    #[error("forecast sample at {timestamp} lacks the `{field}` field")]
    MissingIrradiance {
        field: &'static str,
        timestamp: Timestamp,
    },

    #[error("forecast sample at {timestamp} has invalid irradiance {value}")]
    InvalidIrradiance { timestamp: Timestamp, value: f64 },

    #[error("forecast ends at {actual}, but must reach at least {required}")]
    InsufficientHorizon {
        actual: Timestamp,
        required: Timestamp,
    },
}

/// A schedule commit that failed part-way.
///
/// The device program for `schedule` may be partially overwritten.
#[derive(Debug, thiserror::Error)]
#[error(
    "failed to write {schedule} ({weekday}) for zone {zone_id}: {source}; \
     the on-device schedule is now unknown, re-read the zone and retry later"
)]
pub struct ExecutionError {
    pub zone_id: u8,
    pub schedule: ScheduleId,
    pub weekday: Weekday,
    #[source]
    pub source: Box<ThermoHubError>,
}

/// Requested item does not exist.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{entity} not found: {id}")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}
