//! [`ForecastProvider`] backed by a JSON file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use thermohub_app::ports::ForecastProvider;
use thermohub_domain::error::ThermoHubError;
use thermohub_domain::forecast::RawForecast;

use crate::config::ForecastFileConfig;
use crate::error::ForecastFileError;

#[derive(Deserialize)]
struct WeatherEntity {
    #[serde(default)]
    forecast: Vec<RawForecast>,
}

/// Reads forecasts from the configured snapshot file on every call.
#[derive(Debug, Clone)]
pub struct FileForecastProvider {
    path: PathBuf,
}

impl FileForecastProvider {
    #[must_use]
    pub fn new(config: &ForecastFileConfig) -> Self {
        Self {
            path: config.path.clone(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self, weather_entity_id: &str) -> Result<Vec<RawForecast>, ForecastFileError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| ForecastFileError::Io {
                path: self.path.clone(),
                source,
            })?;
        let mut entities: HashMap<String, WeatherEntity> = serde_json::from_str(&content)
            .map_err(|source| ForecastFileError::Parse {
                path: self.path.clone(),
                source,
            })?;
        let entity = entities.remove(weather_entity_id).ok_or_else(|| {
            ForecastFileError::UnknownEntity {
                entity: weather_entity_id.to_string(),
            }
        })?;
        tracing::debug!(
            path = %self.path.display(),
            entity = weather_entity_id,
            count = entity.forecast.len(),
            "forecast snapshot loaded"
        );
        Ok(entity.forecast)
    }
}

impl ForecastProvider for FileForecastProvider {
    async fn hourly_forecast(
        &self,
        weather_entity_id: &str,
    ) -> Result<Vec<RawForecast>, ThermoHubError> {
        Ok(self.load(weather_entity_id).await?)
    }
}
