//! Forecast: hourly solar irradiance handed over by a weather provider.
//!
//! [`ForecastAdapter`] turns the provider's raw records into an ordered,
//! validated [`Forecast`] before any scheduling computation starts.

use chrono::{Days, Duration};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::PreconditionError;
use crate::time::{Timestamp, local_midnight, next_local_date};

/// Name of the irradiance field in provider records.
pub const IRRADIANCE_FIELD: &str = "solar_irradiance";

/// One forecast record as supplied by the weather provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawForecast {
    #[serde(rename = "datetime")]
    pub timestamp: Timestamp,
    #[serde(default)]
    pub solar_irradiance: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub condition: Option<String>,
}

/// A validated forecast sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastSample {
    pub timestamp: Timestamp,
    /// Global horizontal irradiance, W/m².
    pub solar_irradiance: f64,
}

/// Validated samples in ascending time order.
///
/// Consumed by iteration; there is no way to rewind it.
#[derive(Debug)]
pub struct Forecast {
    samples: Vec<ForecastSample>,
}

impl Forecast {
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Timestamp of the latest sample.
    #[must_use]
    pub fn horizon(&self) -> Option<Timestamp> {
        self.samples.last().map(|sample| sample.timestamp)
    }
}

impl IntoIterator for Forecast {
    type Item = ForecastSample;
    type IntoIter = std::vec::IntoIter<ForecastSample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.into_iter()
    }
}

/// Checks a raw forecast against the scheduling horizon.
#[derive(Debug, Clone, Copy)]
pub struct ForecastAdapter {
    timezone: Tz,
    margin: Duration,
}

impl ForecastAdapter {
    #[must_use]
    pub fn new(timezone: Tz, margin: Duration) -> Self {
        Self { timezone, margin }
    }

    /// Earliest acceptable last-sample timestamp for a run at `now`: the end
    /// of the next local day, minus the margin.
    #[must_use]
    pub fn required_horizon(&self, now: Timestamp) -> Timestamp {
        let tomorrow = next_local_date(self.timezone, now);
        let day_after = tomorrow.checked_add_days(Days::new(1)).unwrap_or(tomorrow);
        local_midnight(self.timezone, day_after) - self.margin
    }

    /// Validate and sort the provider's records.
    ///
    /// Checks run in order: the forecast is non-empty, every record carries
    /// a finite non-negative irradiance, and the last record reaches
    /// [`required_horizon`](Self::required_horizon).
    ///
    /// # Errors
    ///
    /// Returns [`PreconditionError::NoForecasts`],
    /// [`PreconditionError::MissingIrradiance`],
    /// [`PreconditionError::InvalidIrradiance`] or
    /// [`PreconditionError::InsufficientHorizon`].
    pub fn validate_and_normalize(
        &self,
        raw: &[RawForecast],
        now: Timestamp,
    ) -> Result<Forecast, PreconditionError> {
        if raw.is_empty() {
            return Err(PreconditionError::NoForecasts);
        }

        let mut samples = raw
            .iter()
            .map(|record| {
                let value = record
                    .solar_irradiance
                    .ok_or(PreconditionError::MissingIrradiance {
                        field: IRRADIANCE_FIELD,
                        timestamp: record.timestamp,
                    })?;
                if !value.is_finite() || value < 0.0 {
                    return Err(PreconditionError::InvalidIrradiance {
                        timestamp: record.timestamp,
                        value,
                    });
                }
                Ok(ForecastSample {
                    timestamp: record.timestamp,
                    solar_irradiance: value,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        samples.sort_by_key(|sample| sample.timestamp);

        let required = self.required_horizon(now);
        let actual = samples
            .last()
            .map(|sample| sample.timestamp)
            .ok_or(PreconditionError::NoForecasts)?;
        if actual < required {
            return Err(PreconditionError::InsufficientHorizon { actual, required });
        }

        Ok(Forecast { samples })
    }
}
