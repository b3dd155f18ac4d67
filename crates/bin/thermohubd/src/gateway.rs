//! Runtime choice between a real Modbus link and the simulated gateway.

use thermohub_adapter_modbus::{ConnectionConfig, HubConfig, ModbusError, ModbusTransport};
use thermohub_adapter_virtual::VirtualGateway;
use thermohub_app::ports::RegisterTransport;
use thermohub_domain::error::ThermoHubError;

/// The transport selected by `[hub.connection]`.
pub enum GatewayTransport {
    Modbus(ModbusTransport),
    Virtual(VirtualGateway),
}

impl GatewayTransport {
    /// Build the transport named by the hub configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the simulated
    /// gateway cannot be seeded.
    pub fn from_config(config: &HubConfig) -> Result<Self, ThermoHubError> {
        match config.connection {
            ConnectionConfig::Virtual => {
                config.validate().map_err(ModbusError::into_domain)?;
                Ok(Self::Virtual(VirtualGateway::seeded()?))
            }
            ConnectionConfig::Socket(_) | ConnectionConfig::Serial(_) => {
                Ok(Self::Modbus(ModbusTransport::from_config(config)?))
            }
        }
    }

    /// Short name for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Modbus(_) => "modbus",
            Self::Virtual(_) => "virtual",
        }
    }
}

impl RegisterTransport for GatewayTransport {
    async fn connect(&mut self) -> Result<(), ThermoHubError> {
        match self {
            Self::Modbus(inner) => inner.connect().await,
            Self::Virtual(inner) => inner.connect().await,
        }
    }

    async fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, ThermoHubError> {
        match self {
            Self::Modbus(inner) => inner.read_holding_registers(address, count).await,
            Self::Virtual(inner) => inner.read_holding_registers(address, count).await,
        }
    }

    async fn write_registers(&mut self, address: u16, words: &[u16]) -> Result<(), ThermoHubError> {
        match self {
            Self::Modbus(inner) => inner.write_registers(address, words).await,
            Self::Virtual(inner) => inner.write_registers(address, words).await,
        }
    }

    async fn close(&mut self) -> Result<(), ThermoHubError> {
        match self {
            Self::Modbus(inner) => inner.close().await,
            Self::Virtual(inner) => inner.close().await,
        }
    }

    fn is_connected(&self) -> bool {
        match self {
            Self::Modbus(inner) => inner.is_connected(),
            Self::Virtual(inner) => inner.is_connected(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thermohub_adapter_modbus::config::SocketConfig;

    #[test]
    fn should_select_virtual_gateway_by_default() {
        let transport = GatewayTransport::from_config(&HubConfig::default()).unwrap();
        assert_eq!(transport.kind(), "virtual");
    }

    #[test]
    fn should_select_modbus_for_socket_connection() {
        let config = HubConfig {
            connection: ConnectionConfig::Socket(SocketConfig::default()),
            ..HubConfig::default()
        };
        let transport = GatewayTransport::from_config(&config).unwrap();
        assert_eq!(transport.kind(), "modbus");
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn should_forward_reads_to_virtual_gateway() {
        let mut transport = GatewayTransport::from_config(&HubConfig::default()).unwrap();
        transport.connect().await.unwrap();

        let words = transport.read_holding_registers(189, 1).await.unwrap();

        assert_eq!(words, vec![2]);
    }

    #[test]
    fn should_reject_invalid_virtual_hub_config() {
        let config = HubConfig {
            timeout_secs: 0,
            ..HubConfig::default()
        };
        assert!(matches!(
            GatewayTransport::from_config(&config),
            Err(ThermoHubError::Validation(_))
        ));
    }
}
