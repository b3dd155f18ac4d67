//! # thermohub-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `RegisterTransport`: one raw Modbus request against the gateway
//!   - `ForecastProvider`: hourly forecast snapshots
//!   - `EventPublisher`: publish domain events
//! - Serialize all gateway I/O through one **`Hub`** (retries, reconnects, pacing)
//! - Define **driving/inbound ports** as use-case structs:
//!   - `ZoneController`: discover zones, change presets, HVAC modes and setpoints
//!   - `AutoScheduleEngine`: compute and commit the next-day DHW schedule
//! - Provide **in-process infrastructure** (event bus) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `thermohub-domain` only (plus `tokio::sync`/`tokio::time`).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod event_bus;
pub mod hub;
pub mod ports;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;
