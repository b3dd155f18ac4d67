//! Forecast file adapter error types.

use std::path::PathBuf;

use thermohub_domain::error::ThermoHubError;

/// Errors specific to the file forecast provider.
#[derive(Debug, thiserror::Error)]
pub enum ForecastFileError {
    #[error("failed to read forecast file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse forecast file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The snapshot holds no entry for the requested weather entity.
    #[error("weather entity `{entity}` is not in the forecast file")]
    UnknownEntity { entity: String },
}

impl ForecastFileError {
    /// Convert into a [`ThermoHubError::Provider`] for propagation across
    /// port boundaries.
    #[must_use]
    pub fn into_domain(self) -> ThermoHubError {
        ThermoHubError::Provider(Box::new(self))
    }
}

impl From<ForecastFileError> for ThermoHubError {
    fn from(err: ForecastFileError) -> Self {
        err.into_domain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_unknown_entity_error() {
        let err = ForecastFileError::UnknownEntity {
            entity: "weather.attic".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "weather entity `weather.attic` is not in the forecast file"
        );
    }

    #[test]
    fn should_convert_to_provider_error() {
        let err: ThermoHubError = ForecastFileError::Io {
            path: PathBuf::from("missing.json"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        }
        .into();
        assert!(matches!(err, ThermoHubError::Provider(_)));
        assert!(!err.is_retryable());
    }
}
