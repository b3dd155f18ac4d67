//! # thermohub-adapter-forecast-file
//!
//! Forecast adapter reading a JSON snapshot of weather entities.
//!
//! ## File format
//!
//! ```json
//! {
//!   "weather.home": {
//!     "forecast": [
//!       { "datetime": "2025-06-03T11:00:00Z", "solar_irradiance": 700.0, "temperature": 21.5 }
//!     ]
//!   }
//! }
//! ```
//!
//! The file is re-read on every call, so each call returns an independent
//! snapshot and an external job can refresh it at any time.
//!
//! ## Dependency rule
//! Depends on `thermohub-app` (port traits) and `thermohub-domain` only.

pub mod config;
pub mod error;
pub mod provider;

pub use config::ForecastFileConfig;
pub use error::ForecastFileError;
pub use provider::FileForecastProvider;
