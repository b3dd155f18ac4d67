//! Register transport port: one raw Modbus request at a time.

use std::future::Future;

use thermohub_domain::error::ThermoHubError;

/// A connection to one Modbus gateway.
///
/// Implementations perform exactly one request per call and never retry;
/// retries, reconnection and pacing belong to [`Hub`](crate::hub::Hub).
/// Callers hold `&mut self`, so at most one request is in flight.
pub trait RegisterTransport: Send {
    /// Open the connection. Calling it while connected is a no-op.
    fn connect(&mut self) -> impl Future<Output = Result<(), ThermoHubError>> + Send;

    /// Read `count` holding registers starting at `address`.
    ///
    /// Transport failures are [`ThermoHubError::Connection`]; device
    /// exception responses are [`ThermoHubError::Protocol`].
    fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> impl Future<Output = Result<Vec<u16>, ThermoHubError>> + Send;

    /// Write `words` to consecutive holding registers starting at
    /// `address`. Resolves once the device acknowledged the write.
    fn write_registers(
        &mut self,
        address: u16,
        words: &[u16],
    ) -> impl Future<Output = Result<(), ThermoHubError>> + Send;

    /// Close the connection. Closing twice is a no-op.
    fn close(&mut self) -> impl Future<Output = Result<(), ThermoHubError>> + Send;

    fn is_connected(&self) -> bool;
}
