//! Modbus adapter error types.

use thermohub_domain::error::{ConnectionError, ProtocolError, ThermoHubError, ValidationError};

/// Errors specific to the Modbus adapter.
#[derive(Debug, thiserror::Error)]
pub enum ModbusError {
    #[error("invalid hub configuration `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("failed to connect to {target}")]
    Connect {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open serial port {port}")]
    Serial {
        port: String,
        #[source]
        source: tokio_serial::Error,
    },

    #[error("modbus connection is not open")]
    NotConnected,

    #[error("request at register {address} timed out after {timeout_ms} ms")]
    Timeout { address: u16, timeout_ms: u64 },

    #[error("transport failure at register {address}")]
    Transport {
        address: u16,
        #[source]
        source: tokio_modbus::Error,
    },

    #[error("device answered register {address} with exception {code:?}")]
    Exception {
        address: u16,
        code: tokio_modbus::ExceptionCode,
    },
}

impl ModbusError {
    /// Convert into the domain error class the hub acts on: link faults
    /// become retryable connection errors, exception responses do not.
    #[must_use]
    pub fn into_domain(self) -> ThermoHubError {
        match self {
            Self::InvalidConfig { field, reason } => {
                ValidationError::InvalidConfig { field, reason }.into()
            }
            Self::Connect { target, source } => ConnectionError::Connect {
                target,
                reason: source.to_string(),
            }
            .into(),
            Self::Serial { port, source } => ConnectionError::Connect {
                target: port,
                reason: source.to_string(),
            }
            .into(),
            Self::NotConnected => ConnectionError::NotConnected.into(),
            Self::Timeout {
                address,
                timeout_ms,
            } => ConnectionError::Timeout {
                address,
                timeout_ms,
            }
            .into(),
            Self::Transport { address, source } => ConnectionError::Transport {
                address,
                reason: source.to_string(),
            }
            .into(),
            Self::Exception { address, code } => ProtocolError::DeviceException {
                address,
                code: format!("{code:?}"),
            }
            .into(),
        }
    }
}

impl From<ModbusError> for ThermoHubError {
    fn from(err: ModbusError) -> Self {
        err.into_domain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_timeout_to_retryable_connection_error() {
        let err: ThermoHubError = ModbusError::Timeout {
            address: 640,
            timeout_ms: 5000,
        }
        .into();
        assert!(err.is_retryable());
        assert!(matches!(
            err,
            ThermoHubError::Connection(ConnectionError::Timeout { address: 640, .. })
        ));
    }

    #[test]
    fn should_convert_exception_to_protocol_error() {
        let err: ThermoHubError = ModbusError::Exception {
            address: 689,
            code: tokio_modbus::ExceptionCode::IllegalDataAddress,
        }
        .into();
        assert!(!err.is_retryable());
        let ThermoHubError::Protocol(ProtocolError::DeviceException { address, code }) = err else {
            panic!("expected a device exception");
        };
        assert_eq!(address, 689);
        assert_eq!(code, "IllegalDataAddress");
    }

    #[test]
    fn should_convert_invalid_config_to_validation_error() {
        let err: ThermoHubError = ModbusError::InvalidConfig {
            field: "connection.method",
            reason: "ascii framing is not supported, use rtu".to_string(),
        }
        .into();
        assert!(matches!(
            err,
            ThermoHubError::Validation(ValidationError::InvalidConfig {
                field: "connection.method",
                ..
            })
        ));
    }

    #[test]
    fn should_keep_io_reason_when_connect_fails() {
        let err: ThermoHubError = ModbusError::Connect {
            target: "10.0.0.9:502".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        }
        .into();
        let ThermoHubError::Connection(ConnectionError::Connect { target, reason }) = err else {
            panic!("expected a connect error");
        };
        assert_eq!(target, "10.0.0.9:502");
        assert!(!reason.is_empty());
    }

    #[test]
    fn should_display_not_connected_error() {
        assert_eq!(
            ModbusError::NotConnected.to_string(),
            "modbus connection is not open"
        );
    }
}
