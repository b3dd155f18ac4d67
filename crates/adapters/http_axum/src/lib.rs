//! # thermohub-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve a **JSON API** for the climate zones behind the gateway
//!   (`/api/zones`, presets, HVAC modes, setpoints, time programs)
//! - Expose the **service calls** (`/api/services/dhw_auto_schedule`,
//!   `/api/services/read_registers`)
//! - Map HTTP requests into application service calls (driving adapter)
//! - Map domain error classes onto HTTP status codes
//!
//! ## Dependency rule
//! Depends on `thermohub-app` (for port traits and services) and
//! `thermohub-domain` (for domain types used in request/response mapping).
//! Never leaks axum types into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;
