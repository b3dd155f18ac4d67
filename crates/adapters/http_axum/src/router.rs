//! Axum router assembly.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use thermohub_app::ports::{EventPublisher, ForecastProvider, RegisterTransport};

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Nests the API routes under `/api` and includes a [`TraceLayer`] that logs
/// each HTTP request/response at the `DEBUG` level.
pub fn build<T, EP, F>(state: AppState<T, EP, F>) -> Router
where
    T: RegisterTransport + 'static,
    EP: EventPublisher + Send + Sync + 'static,
    F: ForecastProvider + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", crate::api::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
