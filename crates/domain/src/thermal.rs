//! Thermal model of a domestic hot water boiler.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Specific heat capacity of water, J/(kg·K).
pub const WATER_SPECIFIC_HEAT: f64 = 4180.0;
/// Mass of one litre of water, kg.
pub const WATER_DENSITY: f64 = 1.0;

/// Energy efficiency label of a hot water storage tank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnergyLabel {
    #[serde(rename = "A+")]
    APlus,
    A,
    B,
    C,
    D,
    E,
    F,
    G,
}

impl EnergyLabel {
    /// Typical standby loss of a tank carrying this label, W.
    #[must_use]
    pub fn standby_watts(self) -> f64 {
        match self {
            Self::APlus => 30.0,
            Self::A => 40.0,
            Self::B => 55.0,
            Self::C => 80.0,
            Self::D => 100.0,
            Self::E => 120.0,
            Self::F => 145.0,
            Self::G => 170.0,
        }
    }
}

impl fmt::Display for EnergyLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::APlus => "A+",
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::E => "E",
            Self::F => "F",
            Self::G => "G",
        };
        f.write_str(s)
    }
}

impl FromStr for EnergyLabel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A+" => Ok(Self::APlus),
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            "D" => Ok(Self::D),
            "E" => Ok(Self::E),
            "F" => Ok(Self::F),
            "G" => Ok(Self::G),
            other => Err(ValidationError::UnknownValue {
                kind: "energy label",
                value: other.to_string(),
            }),
        }
    }
}

/// Physical parameters of the hot water boiler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoilerConfig {
    #[serde(rename = "dhw_boiler_volume")]
    pub volume_liters: f64,
    /// Standby loss in W; zero means "derive from the energy label".
    #[serde(rename = "dhw_heat_loss_rate", default)]
    pub heat_loss_rate_watts: f64,
    #[serde(rename = "dhw_boiler_energy_label")]
    pub energy_label: EnergyLabel,
}

impl BoilerConfig {
    /// Validate the boiler parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidConfig`] if the volume is not
    /// positive or the loss rate is negative.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(self.volume_liters.is_finite() && self.volume_liters > 0.0) {
            return Err(ValidationError::InvalidConfig {
                field: "dhw_boiler_volume",
                reason: format!("must be positive, got {}", self.volume_liters),
            });
        }
        if !(self.heat_loss_rate_watts.is_finite() && self.heat_loss_rate_watts >= 0.0) {
            return Err(ValidationError::InvalidConfig {
                field: "dhw_heat_loss_rate",
                reason: format!("must not be negative, got {}", self.heat_loss_rate_watts),
            });
        }
        Ok(())
    }

    /// Effective standby loss, W.
    #[must_use]
    pub fn heat_loss_rate(&self) -> f64 {
        if self.heat_loss_rate_watts > 0.0 {
            self.heat_loss_rate_watts
        } else {
            self.energy_label.standby_watts()
        }
    }

    /// Energy needed to raise the whole tank by `target_delta_t` kelvin, J.
    #[must_use]
    pub fn energy_required(&self, target_delta_t: f64) -> f64 {
        self.volume_liters * WATER_DENSITY * WATER_SPECIFIC_HEAT * target_delta_t
    }

    /// Heat lost while standing for `duration`, J.
    #[must_use]
    pub fn standby_loss(&self, duration: Duration) -> f64 {
        self.heat_loss_rate() * duration.as_secs_f64()
    }

    /// Time to reheat the tank by `target_delta_t` with `available_power` W.
    ///
    /// Standby loss runs during the reheat, so only the power above the loss
    /// rate raises the temperature.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InsufficientHeatingPower`] if
    /// `available_power` does not exceed the loss rate.
    pub fn reheat_duration(
        &self,
        target_delta_t: f64,
        available_power: f64,
    ) -> Result<Duration, ValidationError> {
        let loss = self.heat_loss_rate();
        let net = available_power - loss;
        if !net.is_finite() || net <= 0.0 {
            return Err(ValidationError::InsufficientHeatingPower {
                available_w: available_power,
                loss_w: loss,
            });
        }
        let seconds = self.energy_required(target_delta_t.max(0.0)) / net;
        Duration::try_from_secs_f64(seconds).map_err(|err| ValidationError::InvalidConfig {
            field: "dhw_boiler_volume",
            reason: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boiler() -> BoilerConfig {
        BoilerConfig {
            volume_liters: 200.0,
            heat_loss_rate_watts: 0.0,
            energy_label: EnergyLabel::C,
        }
    }

    #[test]
    fn should_compute_energy_from_volume_and_delta() {
        let energy = boiler().energy_required(10.0);
        assert!((energy - 8_360_000.0).abs() < 1e-6);
    }

    #[test]
    fn should_derive_loss_rate_from_label_when_rate_is_zero() {
        assert!((boiler().heat_loss_rate() - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn should_prefer_configured_loss_rate() {
        let boiler = BoilerConfig {
            heat_loss_rate_watts: 65.0,
            ..boiler()
        };
        assert!((boiler.heat_loss_rate() - 65.0).abs() < f64::EPSILON);
    }

    #[test]
    fn should_compute_standby_loss_over_duration() {
        let loss = boiler().standby_loss(Duration::from_secs(3600));
        assert!((loss - 288_000.0).abs() < 1e-6);
    }

    #[test]
    fn should_lengthen_reheat_to_cover_standby_loss() {
        let boiler = boiler();
        let with_loss = boiler.reheat_duration(10.0, 3000.0).unwrap();
        let lossless = boiler.energy_required(10.0) / 3000.0;
        assert!(with_loss.as_secs_f64() > lossless);
        assert!((with_loss.as_secs_f64() - 8_360_000.0 / 2920.0).abs() < 1e-6);
    }

    #[test]
    fn should_reject_power_below_loss_rate() {
        let err = boiler().reheat_duration(10.0, 80.0).unwrap_err();
        assert!(matches!(err, ValidationError::InsufficientHeatingPower { .. }));
    }

    #[test]
    fn should_reject_non_positive_volume() {
        let boiler = BoilerConfig {
            volume_liters: 0.0,
            ..boiler()
        };
        assert!(boiler.validate().is_err());
    }

    #[test]
    fn should_parse_a_plus_label() {
        assert_eq!("A+".parse::<EnergyLabel>().unwrap(), EnergyLabel::APlus);
        assert_eq!(EnergyLabel::APlus.to_string(), "A+");
        assert!("H".parse::<EnergyLabel>().is_err());
    }

    #[test]
    fn should_deserialize_boiler_options_from_toml() {
        let boiler: BoilerConfig = toml::from_str(
            r#"
            dhw_boiler_volume = 200.0
            dhw_boiler_energy_label = "C"
            "#,
        )
        .unwrap();
        assert_eq!(boiler, self::boiler());
    }
}
