//! End-to-end smoke tests for the full thermohubd stack.
//!
//! Each test spins up the complete application (simulated gateway, real hub,
//! real services, file-backed forecast, real axum router) and exercises the
//! HTTP layer via `tower::ServiceExt::oneshot`, so no TCP port is bound.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::{Datelike, Days, Timelike, Utc};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use thermohub_adapter_forecast_file::{FileForecastProvider, ForecastFileConfig};
use thermohub_adapter_http_axum::router;
use thermohub_adapter_http_axum::state::AppState;
use thermohub_adapter_virtual::VirtualGateway;
use thermohub_app::event_bus::InProcessEventBus;
use thermohub_app::hub::{Hub, RetryPolicy};
use thermohub_app::services::auto_schedule::AutoScheduleEngine;
use thermohub_app::services::zone_controller::ZoneController;
use thermohub_domain::planning::AutoScheduleOptions;
use tower::ServiceExt;

/// Forecast snapshot written to a temp file, removed on drop.
struct Snapshot {
    path: PathBuf,
}

impl Snapshot {
    fn write(name: &str, content: &Value) -> Self {
        let path = std::env::temp_dir().join(format!(
            "thermohubd-it-{}-{name}.json",
            std::process::id()
        ));
        std::fs::write(&path, content.to_string()).unwrap();
        Self { path }
    }
}

impl Drop for Snapshot {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Hourly UTC forecast from the start of today to the end of tomorrow,
/// sunny only at noon tomorrow.
fn sunny_noon_tomorrow() -> Value {
    let start = Utc::now()
        .with_hour(0)
        .and_then(|t| t.with_minute(0))
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap();
    let tomorrow = start.date_naive() + Days::new(1);
    let records: Vec<Value> = (0..48)
        .map(|offset| {
            let timestamp = start + chrono::Duration::hours(offset);
            let irradiance = if timestamp.date_naive() == tomorrow && timestamp.hour() == 12 {
                700.0
            } else {
                0.0
            };
            json!({ "datetime": timestamp.to_rfc3339(), "solar_irradiance": irradiance })
        })
        .collect();
    json!({ "weather.home": { "forecast": records } })
}

fn options() -> AutoScheduleOptions {
    serde_json::from_value(json!({
        "weather_entity_id": "weather.home",
        "selected_schedule": "schedule_1",
        "timezone": "UTC",
        "pv_options": { "nominal_power_wp": 4000.0, "orientation": "S", "tilt": 30.0 },
        "dhw_boiler_options": { "dhw_boiler_volume": 200.0, "dhw_boiler_energy_label": "C" }
    }))
    .unwrap()
}

/// Build a fully-wired router over the seeded simulated gateway.
async fn app(snapshot: &Snapshot) -> axum::Router {
    let gateway = VirtualGateway::seeded().expect("seeded gateway should build");
    let hub = Arc::new(Hub::new(
        "virtual",
        gateway,
        RetryPolicy {
            max_attempts: 2,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(1),
        },
        Duration::ZERO,
    ));

    let event_bus = Arc::new(InProcessEventBus::new(256));
    let zones = Arc::new(ZoneController::new(hub, Arc::clone(&event_bus)));
    zones.discover().await.expect("discovery should succeed");

    let forecast = FileForecastProvider::new(&ForecastFileConfig {
        path: snapshot.path.clone(),
    });
    let engine = Arc::new(AutoScheduleEngine::new(
        Arc::clone(&zones),
        forecast,
        event_bus,
        options(),
    ));

    router::build(AppState::new(zones, engine))
}

async fn send(app: axum::Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let resp = app
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_return_ok_when_health_check_called() {
    let snapshot = Snapshot::write("health", &json!({}));
    let app = app(&snapshot).await;

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"OK");
}

// ---------------------------------------------------------------------------
// Zones
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_expose_discovered_zones() {
    let snapshot = Snapshot::write("zones", &json!({}));
    let app = app(&snapshot).await;

    let (status, body) = send(app.clone(), Method::GET, "/api/zones").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = send(app, Method::GET, "/api/zones/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "DHW");
    assert_eq!(body["current_temperature"], 47.3);
}

#[tokio::test]
async fn should_return_not_found_for_non_numeric_zone_id() {
    let snapshot = Snapshot::write("bad-id", &json!({}));
    let app = app(&snapshot).await;

    let (status, _) = send(app, Method::GET, "/api/zones/boiler").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// DHW auto schedule
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_write_solar_schedule_for_tomorrow() {
    let snapshot = Snapshot::write("solar", &sunny_noon_tomorrow());
    let app = app(&snapshot).await;

    let (status, plan) = send(app.clone(), Method::POST, "/api/services/dhw_auto_schedule").await;
    assert_eq!(status, StatusCode::OK, "{plan}");
    assert_eq!(plan["heat_hours"], json!([12]));
    assert_eq!(plan["demand_covered"], true);

    let (status, run) = send(app.clone(), Method::GET, "/api/services/dhw_auto_schedule").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(run["stage"], "done");

    let weekday = (Utc::now().date_naive() + Days::new(1)).weekday();
    let (status, schedule) = send(
        app,
        Method::GET,
        &format!("/api/zones/1/schedules/schedule_1/{weekday}"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let comfort: Vec<&Value> = schedule["slots"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|slot| slot["setpoint"] == "comfort")
        .collect();
    assert_eq!(comfort.len(), 1);
    assert_eq!(comfort[0]["start"], 720);
    assert_eq!(comfort[0]["end"], 780);
}

#[tokio::test]
async fn should_fail_auto_schedule_when_entity_missing_from_snapshot() {
    let snapshot = Snapshot::write("unknown-entity", &json!({ "weather.attic": { "forecast": [] } }));
    let app = app(&snapshot).await;

    let (status, body) = send(app.clone(), Method::POST, "/api/services/dhw_auto_schedule").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("weather.home"));

    let (_, run) = send(app, Method::GET, "/api/services/dhw_auto_schedule").await;
    assert_eq!(run["stage"], "failed");
}

#[tokio::test]
async fn should_reject_forecast_that_stops_too_early() {
    let now = Utc::now();
    let short = json!({
        "weather.home": {
            "forecast": [
                { "datetime": now.to_rfc3339(), "solar_irradiance": 500.0 }
            ]
        }
    });
    let snapshot = Snapshot::write("short", &short);
    let app = app(&snapshot).await;

    let (status, body) = send(app, Method::POST, "/api/services/dhw_auto_schedule").await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string());
}
