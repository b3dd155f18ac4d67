//! Configuration loading: TOML file with environment variable overrides.
//!
//! Reads the file named by `THERMOHUB_CONFIG`, falling back to
//! `thermohub.toml` in the working directory. Every section has a default
//! so the file is optional: without one, the daemon runs against the
//! virtual gateway. Environment variables take precedence over file values.

use serde::Deserialize;

use thermohub_adapter_forecast_file::ForecastFileConfig;
use thermohub_adapter_modbus::config::SocketConfig;
use thermohub_adapter_modbus::{ConnectionConfig, HubConfig, ModbusError};
use thermohub_domain::error::ValidationError;
use thermohub_domain::planning::AutoScheduleOptions;
use thermohub_domain::pv::{Orientation, PvSystem};
use thermohub_domain::schedule::ScheduleId;
use thermohub_domain::thermal::{BoilerConfig, EnergyLabel};

const DEFAULT_PATH: &str = "thermohub.toml";

/// Top-level configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Gateway connection.
    pub hub: HubConfig,
    /// Forecast snapshot file.
    pub forecast: ForecastFileConfig,
    /// DHW auto scheduling.
    pub auto_schedule: AutoScheduleOptions,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load the configuration file (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("THERMOHUB_CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("THERMOHUB_HOST") {
            self.server.host = val;
        }
        if let Some(port) = var("THERMOHUB_PORT").and_then(|val| val.parse().ok()) {
            self.server.port = port;
        }
        if let Some(host) = var("THERMOHUB_HUB_HOST") {
            match &mut self.hub.connection {
                ConnectionConfig::Socket(socket) => socket.host = host,
                other => {
                    *other = ConnectionConfig::Socket(SocketConfig {
                        host,
                        ..SocketConfig::default()
                    });
                }
            }
        }
        if let Some(port) = var("THERMOHUB_HUB_PORT").and_then(|val| val.parse().ok())
            && let ConnectionConfig::Socket(socket) = &mut self.hub.connection
        {
            socket.port = port;
        }
        if let Some(path) = var("THERMOHUB_FORECAST_PATH") {
            self.forecast.path = path.into();
        }
        if let Some(val) = var("THERMOHUB_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        self.hub.validate()?;
        self.auto_schedule.validate()?;
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            hub: HubConfig::default(),
            forecast: ForecastFileConfig::default(),
            auto_schedule: demo_auto_schedule(),
        }
    }
}

/// Scheduling settings matching the demo appliance: a 200 L label C tank
/// and 4 kWp of south-facing panels.
fn demo_auto_schedule() -> AutoScheduleOptions {
    AutoScheduleOptions::new(
        "weather.home",
        ScheduleId::Schedule1,
        PvSystem {
            nominal_power_wp: 4000.0,
            orientation: Orientation::S,
            tilt: 30.0,
            annual_efficiency_decrease: 0.0,
            installation_date: None,
        },
        BoilerConfig {
            volume_liters: 200.0,
            heat_loss_rate_watts: 0.0,
            energy_label: EnergyLabel::C,
        },
    )
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "thermohubd=info,thermohub=info,tower_http=debug".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Invalid `[hub]` section.
    #[error("invalid hub configuration")]
    Hub(#[from] ModbusError),
    /// Invalid `[auto_schedule]` section.
    #[error("invalid auto schedule configuration")]
    AutoSchedule(#[from] ValidationError),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use super::*;
    use thermohub_adapter_modbus::config::{FramingMethod, Parity};

    fn overrides(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.hub.connection, ConnectionConfig::Virtual);
        assert_eq!(config.forecast.path, PathBuf::from("forecast.json"));
        assert_eq!(config.auto_schedule.weather_entity_id, "weather.home");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.hub.name, "remeha");
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = r#"
            [server]
            host = '127.0.0.1'
            port = 9090

            [logging]
            filter = 'debug'

            [hub]
            name = "boiler"
            slave = 100

            [hub.connection]
            type = "serial"
            port = "/dev/ttyUSB1"
            parity = "E"

            [forecast]
            path = "/run/thermohub/forecast.json"

            [auto_schedule]
            weather_entity_id = "weather.forecast_home"
            selected_schedule = "schedule_3"
            timezone = "Europe/Amsterdam"
            legionella_floor = true

            [auto_schedule.pv_options]
            nominal_power_wp = 5200.0
            orientation = "EW"
            tilt = 15.0
            annual_efficiency_decrease = 0.5
            pv_installation_date = "2021-04-01"

            [auto_schedule.dhw_boiler_options]
            dhw_boiler_volume = 300.0
            dhw_boiler_energy_label = "A+"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:9090");
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.hub.slave, 100);
        let ConnectionConfig::Serial(serial) = &config.hub.connection else {
            panic!("expected a serial hub");
        };
        assert_eq!(serial.port, "/dev/ttyUSB1");
        assert_eq!(serial.parity, Parity::Even);
        assert_eq!(serial.method, FramingMethod::Rtu);
        assert_eq!(
            config.forecast.path,
            PathBuf::from("/run/thermohub/forecast.json")
        );
        assert_eq!(config.auto_schedule.selected_schedule, ScheduleId::Schedule3);
        assert_eq!(config.auto_schedule.timezone, chrono_tz::Europe::Amsterdam);
        assert!(config.auto_schedule.legionella_floor);
        assert_eq!(config.auto_schedule.pv_options.orientation, Orientation::Ew);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn should_reject_zero_port() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn should_reject_ascii_serial_hub() {
        let toml = r#"
            [hub.connection]
            type = "serial"
            method = "ascii"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Hub(_))));
    }

    #[test]
    fn should_reject_invalid_auto_schedule_options() {
        let mut config = Config::default();
        config.auto_schedule.pv_options.tilt = 120.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::AutoSchedule(_))
        ));
    }

    #[test]
    fn should_switch_to_socket_when_hub_host_overridden() {
        let mut config = Config::default();
        config.apply_overrides(overrides(&[
            ("THERMOHUB_HUB_HOST", "10.0.0.7"),
            ("THERMOHUB_HUB_PORT", "5020"),
        ]));
        assert_eq!(
            config.hub.connection,
            ConnectionConfig::Socket(SocketConfig {
                host: "10.0.0.7".to_string(),
                port: 5020,
            })
        );
    }

    #[test]
    fn should_apply_server_and_forecast_overrides() {
        let mut config = Config::default();
        config.apply_overrides(overrides(&[
            ("THERMOHUB_HOST", "127.0.0.1"),
            ("THERMOHUB_PORT", "8088"),
            ("THERMOHUB_FORECAST_PATH", "/tmp/f.json"),
        ]));
        assert_eq!(config.bind_addr(), "127.0.0.1:8088");
        assert_eq!(config.forecast.path, PathBuf::from("/tmp/f.json"));
    }

    #[test]
    fn should_prefer_rust_log_over_thermohub_log() {
        let mut config = Config::default();
        config.apply_overrides(overrides(&[
            ("THERMOHUB_LOG", "warn"),
            ("RUST_LOG", "trace"),
        ]));
        assert_eq!(config.logging.filter, "trace");
    }

    #[test]
    fn should_ignore_unparsable_port_override() {
        let mut config = Config::default();
        config.apply_overrides(overrides(&[("THERMOHUB_PORT", "http")]));
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }
}
