//! # thermohub-domain
//!
//! Pure domain model for the thermohub heating controller.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Zones** (climate circuits behind the gateway) and their static capability table
//! - Define the **Appliance** (device boards, status bits, error and season)
//! - Define the **Register map** (typed field descriptors and codecs for gateway registers)
//! - Define **Schedules** (day programs made of contiguous time slots)
//! - Define the **Forecast** contract and its validation
//! - Define the **Thermal** and **PV** models used by the auto-scheduler
//! - Define **Planning** (turning a forecast into a DHW heating schedule)
//! - Define **Events** (records of confirmed device changes and scheduling runs)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod appliance;
pub mod event;
pub mod forecast;
pub mod planning;
pub mod pv;
pub mod register;
pub mod schedule;
pub mod thermal;
pub mod zone;
