//! [`RegisterTransport`] over tokio-modbus.

use std::io;
use std::time::Duration;

use tokio::time::error::Elapsed;
use tokio_modbus::Slave;
use tokio_modbus::client::{Client, Context, Reader, Writer, rtu, tcp};

use thermohub_app::ports::RegisterTransport;
use thermohub_domain::error::ThermoHubError;

use crate::config::{ConnectionConfig, HubConfig, SerialConfig};
use crate::error::ModbusError;

#[derive(Debug, Clone)]
enum Endpoint {
    Socket { host: String, port: u16 },
    Serial(SerialConfig),
}

impl Endpoint {
    fn target(&self) -> String {
        match self {
            Self::Socket { host, port } => format!("{host}:{port}"),
            Self::Serial(serial) => serial.port.clone(),
        }
    }
}

async fn open(endpoint: &Endpoint, slave: Slave, timeout: Duration) -> Result<Context, ModbusError> {
    match endpoint {
        Endpoint::Socket { host, port } => {
            let target = endpoint.target();
            let connect_error = |source| ModbusError::Connect {
                target: target.clone(),
                source,
            };
            let address = tokio::net::lookup_host((host.as_str(), *port))
                .await
                .map_err(connect_error)?
                .next()
                .ok_or_else(|| {
                    connect_error(io::Error::new(
                        io::ErrorKind::NotFound,
                        "host resolved to no address",
                    ))
                })?;
            tokio::time::timeout(timeout, tcp::connect_slave(address, slave))
                .await
                .map_err(|_| connect_error(io::Error::from(io::ErrorKind::TimedOut)))?
                .map_err(connect_error)
        }
        Endpoint::Serial(serial) => {
            let builder = tokio_serial::new(serial.port.as_str(), serial.baudrate)
                .data_bits(serial.data_bits()?)
                .parity(serial.parity())
                .stop_bits(serial.stop_bits()?)
                .timeout(timeout);
            let stream =
                tokio_serial::SerialStream::open(&builder).map_err(|source| ModbusError::Serial {
                    port: serial.port.clone(),
                    source,
                })?;
            Ok(rtu::attach_slave(stream, slave))
        }
    }
}

/// One Modbus link to a gateway, over TCP or serial RTU.
///
/// A timeout or transport failure drops the link; the hub reconnects before
/// retrying.
pub struct ModbusTransport {
    endpoint: Endpoint,
    slave: Slave,
    timeout: Duration,
    context: Option<Context>,
}

impl ModbusTransport {
    /// Build a transport from a validated hub configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ModbusError::InvalidConfig`] if the configuration is
    /// invalid or names the virtual gateway.
    pub fn from_config(config: &HubConfig) -> Result<Self, ModbusError> {
        config.validate()?;
        let endpoint = match &config.connection {
            ConnectionConfig::Socket(socket) => Endpoint::Socket {
                host: socket.host.clone(),
                port: socket.port,
            },
            ConnectionConfig::Serial(serial) => Endpoint::Serial(serial.clone()),
            ConnectionConfig::Virtual => {
                return Err(ModbusError::InvalidConfig {
                    field: "connection.type",
                    reason: "the virtual gateway has no modbus link".to_string(),
                });
            }
        };
        Ok(Self {
            endpoint,
            slave: Slave(config.slave),
            timeout: config.timeout(),
            context: None,
        })
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }

    /// Unwrap the three layers of a request outcome. Link faults drop the
    /// context; exception responses keep it.
    fn settle<V>(
        &mut self,
        address: u16,
        outcome: Result<tokio_modbus::Result<V>, Elapsed>,
    ) -> Result<V, ModbusError> {
        let err = match outcome {
            Ok(Ok(Ok(value))) => return Ok(value),
            Ok(Ok(Err(code))) => {
                tracing::debug!(address, ?code, "device exception response");
                return Err(ModbusError::Exception { address, code });
            }
            Ok(Err(source)) => ModbusError::Transport { address, source },
            Err(_) => ModbusError::Timeout {
                address,
                timeout_ms: self.timeout_ms(),
            },
        };
        tracing::warn!(endpoint = %self.endpoint.target(), address, error = %err, "dropping modbus link");
        self.context = None;
        Err(err)
    }
}

impl RegisterTransport for ModbusTransport {
    async fn connect(&mut self) -> Result<(), ThermoHubError> {
        if self.context.is_some() {
            return Ok(());
        }
        let context = open(&self.endpoint, self.slave, self.timeout).await?;
        tracing::info!(endpoint = %self.endpoint.target(), slave = self.slave.0, "modbus link open");
        self.context = Some(context);
        Ok(())
    }

    async fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, ThermoHubError> {
        let timeout = self.timeout;
        let context = self.context.as_mut().ok_or(ModbusError::NotConnected)?;
        let outcome =
            tokio::time::timeout(timeout, context.read_holding_registers(address, count)).await;
        Ok(self.settle(address, outcome)?)
    }

    async fn write_registers(&mut self, address: u16, words: &[u16]) -> Result<(), ThermoHubError> {
        let timeout = self.timeout;
        let context = self.context.as_mut().ok_or(ModbusError::NotConnected)?;
        let outcome =
            tokio::time::timeout(timeout, context.write_multiple_registers(address, words)).await;
        Ok(self.settle(address, outcome)?)
    }

    async fn close(&mut self) -> Result<(), ThermoHubError> {
        let Some(mut context) = self.context.take() else {
            return Ok(());
        };
        match context.disconnect().await {
            Ok(()) => tracing::debug!(endpoint = %self.endpoint.target(), "modbus link closed"),
            Err(err) => {
                tracing::warn!(endpoint = %self.endpoint.target(), error = %err, "modbus disconnect failed");
            }
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.context.is_some()
    }
}
