//! Appliance: the boards on the heat generator and its overall status.
//!
//! Unlike zones, these values are read-only and scoped to the whole
//! appliance. Each electronic board is a [`DeviceInstance`] with its own
//! register window; the appliance status, error and season live in a
//! handful of shared registers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of electronic board on a device instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardType {
    /// Central heating boiler mainboard.
    CuGh,
    /// Condensing oil boiler mainboard.
    CuOh,
    /// (Hybrid) heat pump mainboard.
    Ehc,
    /// Appliance control panel.
    Mk,
    /// Circuit control board.
    Scb,
    /// Gas boiler mainboard.
    Eec,
    /// Modbus gateway.
    Gateway,
}

impl BoardType {
    #[must_use]
    pub fn is_mainboard(self) -> bool {
        matches!(self, Self::CuGh | Self::CuOh | Self::Ehc | Self::Eec)
    }

    fn label(self) -> &'static str {
        match self {
            Self::CuGh => "CU-GH",
            Self::CuOh => "CU-OH",
            Self::Ehc => "EHC",
            Self::Mk => "MK",
            Self::Scb => "SCB",
            Self::Eec => "EEC",
            Self::Gateway => "GTW",
        }
    }
}

/// Board type together with its hardware generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardCategory {
    pub board_type: BoardType,
    pub generation: u8,
}

impl fmt::Display for BoardCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.board_type.label(), self.generation)
    }
}

/// A `major.minor` firmware or hardware revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}.{:02}", self.major, self.minor)
    }
}

/// One electronic board on the appliance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInstance {
    /// Zero-based instance number.
    pub id: u8,
    pub board: BoardCategory,
    pub sw_version: Version,
    pub hw_version: Version,
    pub article_number: Option<u32>,
}

impl DeviceInstance {
    #[must_use]
    pub fn is_mainboard(&self) -> bool {
        self.board.board_type.is_mainboard()
    }
}

/// Seasonal operating mode of the appliance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonalMode {
    Winter,
    WinterFrostProtection,
    SummerNeutralBand,
    Summer,
}

/// Severity of the active appliance error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPriority {
    /// Locked on a physical defect or a missing configuration unit.
    Locking,
    /// Blocked after repeated warnings.
    Blocking,
    Warning,
}

impl ErrorPriority {
    fn prefix(self) -> char {
        match self {
            Self::Locking => 'E',
            Self::Blocking => 'H',
            Self::Warning => 'A',
        }
    }
}

/// Status bits reported in two consecutive byte registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct ApplianceStatus {
    pub flame_on: bool,
    pub heat_pump_on: bool,
    pub electrical_backup_on: bool,
    pub electrical_backup2_on: bool,
    pub dhw_electrical_backup_on: bool,
    pub service_required: bool,
    /// Power down for at least 20 seconds, then reset.
    pub power_down_reset_needed: bool,
    pub water_pressure_low: bool,
    pub appliance_pump_on: bool,
    pub three_way_valve_open: bool,
    pub three_way_valve: bool,
    pub three_way_valve_closed: bool,
    pub dhw_active: bool,
    pub ch_active: bool,
    pub cooling_active: bool,
}

impl ApplianceStatus {
    /// Decode the low (`status_1`) and high (`status_2`) status bytes.
    #[must_use]
    pub fn from_bytes(status_1: u8, status_2: u8) -> Self {
        let bits = u16::from_le_bytes([status_1, status_2]);
        let bit = |index: u8| (bits >> index) & 1 == 1;
        Self {
            flame_on: bit(0),
            heat_pump_on: bit(1),
            electrical_backup_on: bit(2),
            electrical_backup2_on: bit(3),
            dhw_electrical_backup_on: bit(4),
            service_required: bit(5),
            power_down_reset_needed: bit(6),
            water_pressure_low: bit(7),
            appliance_pump_on: bit(8),
            three_way_valve_open: bit(9),
            three_way_valve: bit(10),
            three_way_valve_closed: bit(11),
            dhw_active: bit(12),
            ch_active: bit(13),
            cooling_active: bit(14),
        }
    }
}

/// Appliance-wide state that belongs to no zone or board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appliance {
    /// Raw error, major code in the high byte; `None` when clear.
    pub current_error: Option<u16>,
    /// `None` when no error is active.
    pub error_priority: Option<ErrorPriority>,
    pub status: ApplianceStatus,
    pub season_mode: SeasonalMode,
}

impl Appliance {
    /// Error as printed in the appliance manual, e.g. `H02.07`, or `OK`.
    #[must_use]
    pub fn error_code(&self) -> String {
        match (self.error_priority, self.current_error) {
            (Some(priority), Some(error)) => {
                let [major, minor] = error.to_be_bytes();
                format!("{}{major:02}.{minor:02}", priority.prefix())
            }
            _ => "OK".to_string(),
        }
    }
}
