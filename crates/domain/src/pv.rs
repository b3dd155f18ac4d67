//! PV model: expected photovoltaic output from forecast irradiance.
//!
//! Output is `nominal_power × ghi / 1000 × efficiency × degradation`, where
//! `efficiency` comes from an orientation × tilt yield table (tilt 10°..90°,
//! linearly interpolated) and `degradation` compounds the annual efficiency
//! decrease over the age of the installation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Irradiance at which panels deliver their nominal power, W/m².
pub const STANDARD_IRRADIANCE: f64 = 1000.0;
pub const MIN_TILT: f64 = 10.0;
pub const MAX_TILT: f64 = 90.0;
const TILT_STEP: f64 = 10.0;
const DAYS_PER_YEAR: f64 = 365.25;

/// Compass direction the panels face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Orientation {
    N,
    Nne,
    Ne,
    Ene,
    E,
    Ese,
    Se,
    Sse,
    S,
    Ssw,
    Sw,
    Wsw,
    W,
    Wnw,
    Nw,
    Nnw,
    /// Half the panels face east, half face west.
    Ew,
}

/// Relative yield per orientation at tilt 10°, 20°, …, 90°.
type YieldRow = [f64; 9];

impl Orientation {
    fn yield_row(self) -> Option<&'static YieldRow> {
        let row: &'static YieldRow = match self {
            Self::N => &[0.77, 0.68, 0.59, 0.50, 0.40, 0.35, 0.30, 0.25, 0.20],
            Self::Nne => &[0.78, 0.70, 0.59, 0.50, 0.45, 0.39, 0.35, 0.30, 0.25],
            Self::Ne => &[0.79, 0.73, 0.65, 0.59, 0.53, 0.46, 0.42, 0.38, 0.35],
            Self::Ene => &[0.83, 0.78, 0.73, 0.68, 0.62, 0.57, 0.52, 0.46, 0.42],
            Self::E => &[0.85, 0.82, 0.80, 0.76, 0.72, 0.67, 0.62, 0.55, 0.50],
            Self::Ese => &[0.87, 0.87, 0.86, 0.85, 0.81, 0.76, 0.71, 0.65, 0.58],
            Self::Se => &[0.90, 0.92, 0.93, 0.92, 0.87, 0.84, 0.78, 0.71, 0.62],
            Self::Sse => &[0.91, 0.94, 0.96, 0.95, 0.92, 0.88, 0.82, 0.75, 0.65],
            Self::S => &[0.91, 0.95, 0.97, 0.96, 0.94, 0.90, 0.84, 0.75, 0.65],
            Self::Ssw => &[0.91, 0.95, 0.96, 0.95, 0.92, 0.87, 0.82, 0.74, 0.68],
            Self::Sw => &[0.90, 0.92, 0.93, 0.92, 0.87, 0.84, 0.78, 0.70, 0.63],
            Self::Wsw => &[0.87, 0.87, 0.87, 0.85, 0.81, 0.76, 0.71, 0.64, 0.57],
            Self::W => &[0.85, 0.82, 0.80, 0.76, 0.72, 0.68, 0.62, 0.55, 0.49],
            Self::Wnw => &[0.82, 0.77, 0.71, 0.68, 0.62, 0.57, 0.52, 0.46, 0.42],
            Self::Nw => &[0.79, 0.72, 0.65, 0.59, 0.52, 0.47, 0.43, 0.38, 0.34],
            Self::Nnw => &[0.78, 0.69, 0.60, 0.51, 0.44, 0.39, 0.35, 0.30, 0.26],
            Self::Ew => return None,
        };
        Some(row)
    }

    /// Relative yield at `tilt` degrees, interpolated between table rows.
    ///
    /// `tilt` is clamped to the table; callers validate it beforehand.
    #[must_use]
    pub fn efficiency(self, tilt: f64) -> f64 {
        let Some(row) = self.yield_row() else {
            return 0.5 * Self::E.efficiency(tilt) + 0.5 * Self::W.efficiency(tilt);
        };
        let position = (tilt.clamp(MIN_TILT, MAX_TILT) - MIN_TILT) / TILT_STEP;
        let lower = position.floor();
        let fraction = position - lower;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let index = lower as usize;
        match row.get(index + 1) {
            Some(upper) => row[index] + (upper - row[index]) * fraction,
            None => row[row.len() - 1],
        }
    }
}

/// The household PV installation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvSystem {
    pub nominal_power_wp: f64,
    pub orientation: Orientation,
    pub tilt: f64,
    /// Yearly loss of efficiency, percent.
    #[serde(default)]
    pub annual_efficiency_decrease: f64,
    #[serde(rename = "pv_installation_date", default)]
    pub installation_date: Option<NaiveDate>,
}

impl PvSystem {
    /// Validate the installation parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(self.nominal_power_wp.is_finite() && self.nominal_power_wp > 0.0) {
            return Err(ValidationError::InvalidConfig {
                field: "nominal_power_wp",
                reason: format!("must be positive, got {}", self.nominal_power_wp),
            });
        }
        if !(MIN_TILT..=MAX_TILT).contains(&self.tilt) {
            return Err(ValidationError::InvalidConfig {
                field: "tilt",
                reason: format!("must be within [{MIN_TILT}, {MAX_TILT}], got {}", self.tilt),
            });
        }
        if !(0.0..=100.0).contains(&self.annual_efficiency_decrease) {
            return Err(ValidationError::InvalidConfig {
                field: "annual_efficiency_decrease",
                reason: format!(
                    "must be a percentage, got {}",
                    self.annual_efficiency_decrease
                ),
            });
        }
        Ok(())
    }

    /// Share of nominal power delivered at `ghi` W/m², before ageing.
    #[must_use]
    pub fn irradiance_factor(&self, ghi: f64) -> f64 {
        ghi.max(0.0) / STANDARD_IRRADIANCE * self.orientation.efficiency(self.tilt)
    }

    /// Remaining efficiency share on `date`.
    #[must_use]
    pub fn degradation(&self, date: NaiveDate) -> f64 {
        let years = self.installation_date.map_or(0.0, |installed| {
            #[allow(clippy::cast_precision_loss)]
            let days = (date - installed).num_days().max(0) as f64;
            days / DAYS_PER_YEAR
        });
        (1.0 - self.annual_efficiency_decrease / 100.0).powf(years)
    }

    /// Expected output in W at `ghi` W/m² on `date`.
    #[must_use]
    pub fn output_watts(&self, ghi: f64, date: NaiveDate) -> f64 {
        self.nominal_power_wp * self.irradiance_factor(ghi) * self.degradation(date)
    }
}
