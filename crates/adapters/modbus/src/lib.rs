//! # thermohub-adapter-modbus
//!
//! Modbus adapter built on [tokio-modbus](https://docs.rs/tokio-modbus).
//!
//! ## Responsibilities
//! - Own the hub configuration (`[hub]` section): slave address, timeouts,
//!   retry policy and the connection kind
//! - Implement `RegisterTransport` over **Modbus TCP** (`type = "socket"`)
//!   and **serial RTU** (`type = "serial"`, via `tokio-serial`)
//! - Map link faults to retryable connection errors and exception responses
//!   to protocol errors
//!
//! ASCII serial framing is not supported and is rejected when the
//! configuration is validated.
//!
//! ## Dependency rule
//! Depends on `thermohub-app` (port traits, retry policy) and
//! `thermohub-domain` only.

pub mod config;
pub mod error;
pub mod transport;

pub use config::{ConnectionConfig, HubConfig};
pub use error::ModbusError;
pub use transport::ModbusTransport;
