//! Forecast provider port: hourly weather forecast snapshots.

use std::future::Future;

use thermohub_domain::error::ThermoHubError;
use thermohub_domain::forecast::RawForecast;

/// Supplies the hourly forecast of a weather source.
///
/// Every call returns an independent snapshot; the scheduler validates it
/// and never calls back into the provider.
pub trait ForecastProvider {
    /// Hourly forecast records published by `weather_entity_id`.
    fn hourly_forecast(
        &self,
        weather_entity_id: &str,
    ) -> impl Future<Output = Result<Vec<RawForecast>, ThermoHubError>> + Send;
}

impl<T: ForecastProvider + Send + Sync> ForecastProvider for std::sync::Arc<T> {
    fn hourly_forecast(
        &self,
        weather_entity_id: &str,
    ) -> impl Future<Output = Result<Vec<RawForecast>, ThermoHubError>> + Send {
        (**self).hourly_forecast(weather_entity_id)
    }
}
