//! Shared application state for axum handlers.

use std::sync::Arc;

use thermohub_app::services::auto_schedule::AutoScheduleEngine;
use thermohub_app::services::zone_controller::ZoneController;

/// Application state shared across all axum handlers.
///
/// Generic over the register transport, event publisher and forecast
/// provider to avoid dynamic dispatch. `Clone` is implemented manually so
/// the underlying types themselves do not need to be `Clone`.
pub struct AppState<T, EP, F> {
    /// Zone discovery and control.
    pub zones: Arc<ZoneController<T, EP>>,
    /// DHW auto scheduling.
    pub auto_schedule: Arc<AutoScheduleEngine<T, EP, F>>,
}

impl<T, EP, F> Clone for AppState<T, EP, F> {
    fn clone(&self) -> Self {
        Self {
            zones: Arc::clone(&self.zones),
            auto_schedule: Arc::clone(&self.auto_schedule),
        }
    }
}

impl<T, EP, F> AppState<T, EP, F> {
    /// Create the state from services that are also shared with background
    /// tasks.
    pub fn new(
        zones: Arc<ZoneController<T, EP>>,
        auto_schedule: Arc<AutoScheduleEngine<T, EP, F>>,
    ) -> Self {
        Self {
            zones,
            auto_schedule,
        }
    }
}
