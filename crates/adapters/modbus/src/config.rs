//! Hub connection configuration.

use std::time::Duration;

use serde::Deserialize;

use thermohub_app::hub::RetryPolicy;

use crate::error::ModbusError;

/// Configuration of one gateway hub.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Unique hub name, used in logs.
    pub name: String,
    /// Modbus slave address of the gateway.
    pub slave: u8,
    /// Bound on a single request, in seconds.
    pub timeout_secs: u64,
    /// Minimum gap between two requests, in milliseconds.
    pub message_delay_ms: u64,
    pub retry: RetryConfig,
    pub connection: ConnectionConfig,
}

/// Bounded exponential backoff on connection faults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per request, the first one included.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

/// How the gateway is reached.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConnectionConfig {
    /// Modbus TCP.
    Socket(SocketConfig),
    /// Modbus over a serial line.
    Serial(SerialConfig),
    /// The in-process simulated gateway.
    Virtual,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SocketConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Serial device path, e.g. `/dev/ttyUSB0`.
    pub port: String,
    pub baudrate: u32,
    /// Data bits per character (5 to 8).
    pub bytesize: u8,
    pub method: FramingMethod,
    pub parity: Parity,
    /// Stop bits (1 or 2).
    pub stopbits: u8,
}

/// Serial framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FramingMethod {
    Rtu,
    /// Accepted by the parser so it can be rejected with a clear message.
    Ascii,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Parity {
    #[serde(rename = "N")]
    None,
    #[serde(rename = "E")]
    Even,
    #[serde(rename = "O")]
    Odd,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            name: "remeha".to_string(),
            slave: 1,
            timeout_secs: 5,
            message_delay_ms: 10,
            retry: RetryConfig::default(),
            connection: ConnectionConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 200,
            max_backoff_ms: 2000,
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::Virtual
    }
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 502,
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baudrate: 19200,
            bytesize: 8,
            method: FramingMethod::Rtu,
            parity: Parity::None,
            stopbits: 2,
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ModbusError {
    ModbusError::InvalidConfig {
        field,
        reason: reason.into(),
    }
}

impl HubConfig {
    /// Check the settings before any connection is attempted.
    ///
    /// # Errors
    ///
    /// Returns [`ModbusError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> Result<(), ModbusError> {
        if self.name.trim().is_empty() {
            return Err(invalid("name", "must not be empty"));
        }
        if self.timeout_secs == 0 {
            return Err(invalid("timeout_secs", "must be non-zero"));
        }
        if self.retry.max_attempts == 0 {
            return Err(invalid("retry.max_attempts", "at least one attempt is required"));
        }
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(invalid(
                "retry.initial_backoff_ms",
                "must not exceed retry.max_backoff_ms",
            ));
        }
        match &self.connection {
            ConnectionConfig::Socket(socket) => socket.validate(),
            ConnectionConfig::Serial(serial) => serial.validate(),
            ConnectionConfig::Virtual => Ok(()),
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub fn message_delay(&self) -> Duration {
        Duration::from_millis(self.message_delay_ms)
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            initial_backoff: Duration::from_millis(self.retry.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.retry.max_backoff_ms),
        }
    }
}

impl SocketConfig {
    fn validate(&self) -> Result<(), ModbusError> {
        if self.host.trim().is_empty() {
            return Err(invalid("connection.host", "must not be empty"));
        }
        if self.port == 0 {
            return Err(invalid("connection.port", "must be non-zero"));
        }
        Ok(())
    }
}

impl SerialConfig {
    fn validate(&self) -> Result<(), ModbusError> {
        if self.method == FramingMethod::Ascii {
            return Err(invalid(
                "connection.method",
                "ascii framing is not supported, use rtu",
            ));
        }
        if self.port.trim().is_empty() {
            return Err(invalid("connection.port", "must not be empty"));
        }
        if self.baudrate == 0 {
            return Err(invalid("connection.baudrate", "must be non-zero"));
        }
        self.data_bits()?;
        self.stop_bits()?;
        Ok(())
    }

    pub(crate) fn data_bits(&self) -> Result<tokio_serial::DataBits, ModbusError> {
        match self.bytesize {
            5 => Ok(tokio_serial::DataBits::Five),
            6 => Ok(tokio_serial::DataBits::Six),
            7 => Ok(tokio_serial::DataBits::Seven),
            8 => Ok(tokio_serial::DataBits::Eight),
            other => Err(invalid(
                "connection.bytesize",
                format!("{other} is not one of 5, 6, 7, 8"),
            )),
        }
    }

    pub(crate) fn stop_bits(&self) -> Result<tokio_serial::StopBits, ModbusError> {
        match self.stopbits {
            1 => Ok(tokio_serial::StopBits::One),
            2 => Ok(tokio_serial::StopBits::Two),
            other => Err(invalid(
                "connection.stopbits",
                format!("{other} is not one of 1, 2"),
            )),
        }
    }

    pub(crate) fn parity(&self) -> tokio_serial::Parity {
        match self.parity {
            Parity::None => tokio_serial::Parity::None,
            Parity::Even => tokio_serial::Parity::Even,
            Parity::Odd => tokio_serial::Parity::Odd,
        }
    }
}
