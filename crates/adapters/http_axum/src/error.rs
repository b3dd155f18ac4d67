//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use thermohub_domain::error::ThermoHubError;

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`ThermoHubError`] to an HTTP response with appropriate status code.
pub struct ApiError(ThermoHubError);

impl<E: Into<ThermoHubError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            ThermoHubError::Validation(_) => StatusCode::BAD_REQUEST,
            ThermoHubError::NotFound(_) => StatusCode::NOT_FOUND,
            ThermoHubError::Busy => StatusCode::CONFLICT,
            ThermoHubError::Precondition(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ThermoHubError::Protocol(_)
            | ThermoHubError::Execution(_)
            | ThermoHubError::Provider(_) => StatusCode::BAD_GATEWAY,
            ThermoHubError::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed on the device side");
        }
        let body = ErrorBody {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
