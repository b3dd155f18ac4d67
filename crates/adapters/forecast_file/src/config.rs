//! Forecast file configuration.

use std::path::PathBuf;

use serde::Deserialize;

/// Configuration for the file forecast provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ForecastFileConfig {
    /// Path of the JSON snapshot.
    pub path: PathBuf,
}

impl Default for ForecastFileConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("forecast.json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_have_sensible_defaults() {
        let config = ForecastFileConfig::default();
        assert_eq!(config.path, PathBuf::from("forecast.json"));
    }

    #[test]
    fn should_deserialize_from_toml() {
        let config: ForecastFileConfig =
            toml::from_str(r#"path = "/var/lib/thermohub/forecast.json""#).unwrap();
        assert_eq!(
            config.path,
            PathBuf::from("/var/lib/thermohub/forecast.json")
        );
    }

    #[test]
    fn should_use_defaults_for_missing_fields() {
        let config: ForecastFileConfig = toml::from_str("").unwrap();
        assert_eq!(config, ForecastFileConfig::default());
    }
}
