//! Auto schedule engine: plans tomorrow's DHW heating from the solar forecast.
//!
//! One run walks `idle → validating → computing → writing → done | failed`:
//!
//! - **validating** checks the options, finds the DHW zone and validates the
//!   forecast snapshot. Nothing has touched the device yet.
//! - **computing** estimates PV surplus per local hour and plans the day.
//!   Still no device I/O.
//! - **writing** commits the day program and optionally reads it back. A
//!   failure here leaves the slot indeterminate and surfaces as an
//!   [`ExecutionError`].
//!
//! Runs are triggered externally; a trigger arriving while a run is in
//! flight is rejected with [`ThermoHubError::Busy`]. A run whose future is
//! dropped before it finishes is recorded as failed in the stage it reached.

use std::sync::{Arc, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::Mutex;

use thermohub_domain::error::{ExecutionError, PreconditionError, ThermoHubError};
use thermohub_domain::event::{Event, EventType};
use thermohub_domain::forecast::{Forecast, ForecastAdapter};
use thermohub_domain::id::RunId;
use thermohub_domain::planning::{AutoScheduleOptions, SchedulePlan, plan_day};
use thermohub_domain::time::{Timestamp, next_local_date, now};
use thermohub_domain::zone::Zone;

use crate::ports::{EventPublisher, ForecastProvider, RegisterTransport};
use crate::services::zone_controller::ZoneController;

/// Stage of a scheduling run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    Idle,
    Validating,
    Computing,
    Writing,
    Done,
    Failed,
}

/// Current or last run, as reported to callers.
#[derive(Debug, Clone, Serialize)]
pub struct RunStatus {
    pub run_id: Option<RunId>,
    pub stage: RunStage,
    /// Stage the last run stopped in, when it failed.
    pub failed_stage: Option<RunStage>,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
    pub error: Option<String>,
    pub plan: Option<SchedulePlan>,
}

impl Default for RunStatus {
    fn default() -> Self {
        Self {
            run_id: None,
            stage: RunStage::Idle,
            failed_stage: None,
            started_at: None,
            finished_at: None,
            error: None,
            plan: None,
        }
    }
}

/// Application service computing and committing DHW schedules.
pub struct AutoScheduleEngine<T, EP, F> {
    zones: Arc<ZoneController<T, EP>>,
    provider: F,
    publisher: EP,
    options: AutoScheduleOptions,
    running: Mutex<()>,
    status: std::sync::Mutex<RunStatus>,
}

impl<T, EP, F> AutoScheduleEngine<T, EP, F>
where
    T: RegisterTransport,
    EP: EventPublisher,
    F: ForecastProvider,
{
    pub fn new(
        zones: Arc<ZoneController<T, EP>>,
        provider: F,
        publisher: EP,
        options: AutoScheduleOptions,
    ) -> Self {
        Self {
            zones,
            provider,
            publisher,
            options,
            running: Mutex::new(()),
            status: std::sync::Mutex::new(RunStatus::default()),
        }
    }

    #[must_use]
    pub fn options(&self) -> &AutoScheduleOptions {
        &self.options
    }

    /// The current run, or the last finished one.
    pub fn status(&self) -> RunStatus {
        self.lock_status().clone()
    }

    fn lock_status(&self) -> MutexGuard<'_, RunStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Plan and commit tomorrow's schedule.
    ///
    /// # Errors
    ///
    /// See [`run_at`](Self::run_at).
    pub async fn run(&self) -> Result<SchedulePlan, ThermoHubError> {
        self.run_at(now()).await
    }

    /// Plan and commit the schedule for the local day after `now`.
    ///
    /// # Errors
    ///
    /// - [`ThermoHubError::Busy`] when another run is in flight.
    /// - [`ThermoHubError::Validation`] or [`ThermoHubError::Precondition`]
    ///   from the validating and computing stages, with no device I/O.
    /// - [`ThermoHubError::Provider`] when the forecast could not be fetched.
    /// - [`ThermoHubError::Execution`] from the writing stage.
    pub async fn run_at(&self, now: Timestamp) -> Result<SchedulePlan, ThermoHubError> {
        let Ok(_running) = self.running.try_lock() else {
            tracing::warn!("auto schedule run already in progress, rejecting trigger");
            return Err(ThermoHubError::Busy);
        };

        let run_id = RunId::new();
        *self.lock_status() = RunStatus {
            run_id: Some(run_id),
            stage: RunStage::Validating,
            started_at: Some(now),
            ..RunStatus::default()
        };
        let _guard = CancelGuard {
            status: &self.status,
            run_id,
        };
        tracing::info!(%run_id, stage = ?RunStage::Validating, "auto schedule run started");

        match self.execute(now).await {
            Ok((zone_id, plan)) => {
                self.finish_done(run_id, zone_id, &plan).await;
                Ok(plan)
            }
            Err((stage, err)) => {
                self.finish_failed(run_id, stage, &err).await;
                Err(err)
            }
        }
    }

    async fn execute(&self, now: Timestamp) -> Result<(u8, SchedulePlan), (RunStage, ThermoHubError)> {
        let (zone, forecast) = self
            .validate(now)
            .await
            .map_err(|err| (RunStage::Validating, err))?;

        self.enter(RunStage::Computing);
        let date = next_local_date(self.options.timezone, now);
        let plan = plan_day(&self.options, forecast, date)
            .map_err(|err| (RunStage::Computing, err.into()))?;
        if plan.demand_covered {
            tracing::info!(%date, heat_hours = ?plan.heat_hours, "dhw schedule planned");
        } else {
            tracing::warn!(
                %date,
                demand_wh = plan.demand_wh,
                legionella_floor = self.options.legionella_floor,
                "pv surplus does not cover the reheat demand"
            );
        }

        self.enter(RunStage::Writing);
        self.zones
            .write_schedule(zone.id, &plan.schedule, self.options.verify_after_write)
            .await
            .map_err(|source| {
                let err = ExecutionError {
                    zone_id: zone.id,
                    schedule: plan.schedule.id(),
                    weekday: plan.schedule.weekday(),
                    source: Box::new(source),
                };
                (RunStage::Writing, err.into())
            })?;
        Ok((zone.id, plan))
    }

    async fn validate(&self, now: Timestamp) -> Result<(Zone, Forecast), ThermoHubError> {
        self.options.validate()?;
        let zone = self
            .zones
            .dhw_zone()
            .await
            .ok_or(PreconditionError::NoDhwZone)?;
        let raw = self
            .provider
            .hourly_forecast(&self.options.weather_entity_id)
            .await?;
        let adapter = ForecastAdapter::new(self.options.timezone, self.options.horizon_margin());
        let forecast = adapter.validate_and_normalize(&raw, now)?;
        tracing::debug!(samples = forecast.len(), horizon = ?forecast.horizon(), "forecast accepted");
        Ok((zone, forecast))
    }

    fn enter(&self, stage: RunStage) {
        self.lock_status().stage = stage;
        tracing::info!(?stage, "auto schedule stage");
    }

    async fn finish_done(&self, run_id: RunId, zone_id: u8, plan: &SchedulePlan) {
        {
            let mut status = self.lock_status();
            status.stage = RunStage::Done;
            status.finished_at = Some(now());
            status.plan = Some(plan.clone());
        }
        tracing::info!(%run_id, zone_id, "auto schedule run done");
        let data = serde_json::json!({
            "run_id": run_id,
            "date": plan.date,
            "schedule": plan.schedule.id(),
            "heat_hours": plan.heat_hours,
            "demand_covered": plan.demand_covered,
        });
        self.publish(Event::new(EventType::AutoScheduleCompleted, Some(zone_id), data))
            .await;
    }

    async fn finish_failed(&self, run_id: RunId, stage: RunStage, err: &ThermoHubError) {
        {
            let mut status = self.lock_status();
            status.stage = RunStage::Failed;
            status.failed_stage = Some(stage);
            status.finished_at = Some(now());
            status.error = Some(err.to_string());
        }
        tracing::warn!(%run_id, ?stage, error = %err, "auto schedule run failed");
        let data = serde_json::json!({
            "run_id": run_id,
            "stage": stage,
            "error": err.to_string(),
        });
        self.publish(Event::new(EventType::AutoScheduleFailed, None, data))
            .await;
    }

    async fn publish(&self, event: Event) {
        if let Err(err) = self.publisher.publish(event).await {
            tracing::warn!(error = %err, "failed to publish auto schedule event");
        }
    }
}

/// Fails the run it was created for if that run never reached a final stage.
struct CancelGuard<'a> {
    status: &'a std::sync::Mutex<RunStatus>,
    run_id: RunId,
}

impl Drop for CancelGuard<'_> {
    fn drop(&mut self) {
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        if status.run_id != Some(self.run_id)
            || matches!(status.stage, RunStage::Done | RunStage::Failed)
        {
            return;
        }
        let stage = status.stage;
        status.stage = RunStage::Failed;
        status.failed_stage = Some(stage);
        status.finished_at = Some(now());
        status.error = Some("run cancelled before completion".to_string());
        tracing::warn!(run_id = %self.run_id, ?stage, "auto schedule run cancelled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;

    use chrono::{Duration, Weekday};
    use tokio::sync::Semaphore;

    use crate::event_bus::{EventFilter, InProcessEventBus};
    use crate::testing::{FakeTransport, fast_hub, seeded_gateway};
    use thermohub_domain::error::{ConnectionError, ValidationError};
    use thermohub_domain::forecast::RawForecast;
    use thermohub_domain::pv::{Orientation, PvSystem};
    use thermohub_domain::register::time_program;
    use thermohub_domain::schedule::{ScheduleId, Setpoint};
    use thermohub_domain::thermal::{BoilerConfig, EnergyLabel};

    #[derive(Clone, Default)]
    struct StaticForecast {
        records: Vec<RawForecast>,
        gate: Option<Arc<Semaphore>>,
    }

    impl ForecastProvider for StaticForecast {
        fn hourly_forecast(
            &self,
            _weather_entity_id: &str,
        ) -> impl Future<Output = Result<Vec<RawForecast>, ThermoHubError>> + Send {
            let records = self.records.clone();
            let gate = self.gate.clone();
            async move {
                if let Some(gate) = gate {
                    let _permit = gate.acquire().await;
                }
                Ok(records)
            }
        }
    }

    type Engine = AutoScheduleEngine<FakeTransport, Arc<InProcessEventBus>, StaticForecast>;

    fn run_time() -> Timestamp {
        "2024-05-06T18:00:00Z".parse().unwrap()
    }

    fn options() -> AutoScheduleOptions {
        AutoScheduleOptions::new(
            "weather.home",
            ScheduleId::Schedule1,
            PvSystem {
                nominal_power_wp: 4000.0,
                orientation: Orientation::S,
                tilt: 30.0,
                annual_efficiency_decrease: 0.0,
                installation_date: None,
            },
            BoilerConfig {
                volume_liters: 200.0,
                heat_loss_rate_watts: 0.0,
                energy_label: EnergyLabel::C,
            },
        )
    }

    /// Hourly records from `run_time()` on, dark except a 700 W/m² noon
    /// on the scheduling day.
    fn midday_forecast(hours: i64) -> Vec<RawForecast> {
        let noon: Timestamp = "2024-05-07T12:00:00Z".parse().unwrap();
        (0..hours)
            .map(|h| {
                let timestamp = run_time() + Duration::hours(h);
                RawForecast {
                    timestamp,
                    solar_irradiance: Some(if timestamp == noon { 700.0 } else { 0.0 }),
                    temperature: None,
                    condition: None,
                }
            })
            .collect()
    }

    async fn engine_with(
        gateway: FakeTransport,
        provider: StaticForecast,
        discover: bool,
    ) -> (Arc<Engine>, Arc<InProcessEventBus>) {
        let bus = Arc::new(InProcessEventBus::new(16));
        let zones = Arc::new(ZoneController::new(
            Arc::new(fast_hub(gateway)),
            bus.clone(),
        ));
        if discover {
            zones.discover().await.unwrap();
        }
        let engine = AutoScheduleEngine::new(zones, provider, bus.clone(), options());
        (Arc::new(engine), bus)
    }

    fn provider(records: Vec<RawForecast>) -> StaticForecast {
        StaticForecast {
            records,
            gate: None,
        }
    }

    #[tokio::test]
    async fn should_heat_in_the_single_sunny_hour() {
        let gateway = seeded_gateway();
        let (engine, bus) = engine_with(gateway.clone(), provider(midday_forecast(30)), true).await;
        let mut rx = bus.subscribe(EventFilter::default());

        let plan = engine.run_at(run_time()).await.unwrap();

        assert_eq!(plan.heat_hours, vec![12]);
        assert!(plan.demand_covered);
        assert_eq!(plan.schedule.weekday(), Weekday::Tue);
        let heat: Vec<_> = plan.schedule.windows(Setpoint::Comfort).collect();
        assert_eq!(heat.len(), 1);
        assert_eq!((heat[0].start, heat[0].end), (720, 780));

        let field = time_program(1, ScheduleId::Schedule1, Weekday::Tue);
        let written = gateway.words(field.address, field.count());
        assert_eq!(field.decode(&written).unwrap(), plan.schedule.switch_points());

        let status = engine.status();
        assert_eq!(status.stage, RunStage::Done);
        assert!(status.plan.is_some());
        let event = rx.next().await.unwrap();
        assert_eq!(event.event_type, EventType::AutoScheduleCompleted);
        assert_eq!(event.zone_id, Some(1));
    }

    #[tokio::test]
    async fn should_fail_without_writes_when_horizon_too_short() {
        let gateway = seeded_gateway();
        let (engine, _) = engine_with(gateway.clone(), provider(midday_forecast(11)), true).await;

        let err = engine.run_at(run_time()).await.unwrap_err();

        let ThermoHubError::Precondition(PreconditionError::InsufficientHorizon { actual, required }) =
            &err
        else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(*actual, run_time() + Duration::hours(10));
        assert!(*required >= run_time() + Duration::hours(21));
        assert!(gateway.bank().writes.is_empty());
        let status = engine.status();
        assert_eq!(status.stage, RunStage::Failed);
        assert_eq!(status.failed_stage, Some(RunStage::Validating));
    }

    #[tokio::test]
    async fn should_fail_before_planning_when_irradiance_missing() {
        let gateway = seeded_gateway();
        let mut records = midday_forecast(30);
        records[5].solar_irradiance = None;
        let (engine, _) = engine_with(gateway.clone(), provider(records), true).await;

        let err = engine.run_at(run_time()).await.unwrap_err();

        assert!(matches!(
            err,
            ThermoHubError::Precondition(PreconditionError::MissingIrradiance {
                field: "solar_irradiance",
                ..
            })
        ));
        assert!(gateway.bank().writes.is_empty());
    }

    #[tokio::test]
    async fn should_require_a_dhw_zone() {
        let (engine, _) = engine_with(seeded_gateway(), provider(midday_forecast(30)), false).await;

        let err = engine.run_at(run_time()).await.unwrap_err();
        assert!(matches!(
            err,
            ThermoHubError::Precondition(PreconditionError::NoDhwZone)
        ));
    }

    #[tokio::test]
    async fn should_reject_invalid_options_before_io() {
        let gateway = seeded_gateway();
        let bus = Arc::new(InProcessEventBus::new(4));
        let zones = Arc::new(ZoneController::new(
            Arc::new(fast_hub(gateway.clone())),
            bus.clone(),
        ));
        let mut options = options();
        options.pv_options.tilt = 95.0;
        let engine = AutoScheduleEngine::new(zones, provider(midday_forecast(30)), bus, options);

        let err = engine.run_at(run_time()).await.unwrap_err();
        assert!(matches!(
            err,
            ThermoHubError::Validation(ValidationError::InvalidConfig { field: "tilt", .. })
        ));
        assert_eq!(gateway.bank().connects, 0);
    }

    #[tokio::test]
    async fn should_surface_execution_error_when_write_fails() {
        let gateway = seeded_gateway();
        let (engine, bus) = engine_with(gateway.clone(), provider(midday_forecast(30)), true).await;
        let mut rx = bus.subscribe(EventFilter::default());
        gateway.bank().failing_writes_after = Some(0);

        let err = engine.run_at(run_time()).await.unwrap_err();

        let ThermoHubError::Execution(execution) = &err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(execution.zone_id, 1);
        assert_eq!(execution.weekday, Weekday::Tue);
        assert!(matches!(
            *execution.source,
            ThermoHubError::Connection(ConnectionError::Exhausted { .. })
        ));
        assert!(err.to_string().contains("retry"));

        let status = engine.status();
        assert_eq!(status.failed_stage, Some(RunStage::Writing));
        assert_eq!(rx.next().await.unwrap().event_type, EventType::AutoScheduleFailed);
    }

    #[tokio::test]
    async fn should_reject_second_trigger_while_running() {
        let gate = Arc::new(Semaphore::new(0));
        let records = midday_forecast(30);
        let (engine, _) = engine_with(
            seeded_gateway(),
            StaticForecast {
                records,
                gate: Some(gate.clone()),
            },
            true,
        )
        .await;

        let first = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.run_at(run_time()).await })
        };
        while engine.status().stage != RunStage::Validating {
            tokio::task::yield_now().await;
        }

        let err = engine.run_at(run_time()).await.unwrap_err();
        assert!(matches!(err, ThermoHubError::Busy));

        gate.add_permits(1);
        assert!(first.await.unwrap().is_ok());
        assert!(engine.run_at(run_time()).await.is_ok());
    }

    #[tokio::test]
    async fn should_mark_run_failed_when_dropped_while_writing() {
        let gateway = seeded_gateway();
        let (engine, _) = engine_with(gateway.clone(), provider(midday_forecast(30)), true).await;
        let hub = Arc::clone(engine.zones.hub());
        let held = hub.session().await;

        let run = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.run_at(run_time()).await })
        };
        while engine.status().stage != RunStage::Writing {
            tokio::task::yield_now().await;
        }
        run.abort();
        assert!(run.await.unwrap_err().is_cancelled());
        drop(held);

        let status = engine.status();
        assert_eq!(status.stage, RunStage::Failed);
        assert_eq!(status.failed_stage, Some(RunStage::Writing));
        assert!(status.finished_at.is_some());
        assert!(status.error.unwrap().contains("cancelled"));
        assert!(gateway.bank().writes.is_empty());

        assert!(engine.run_at(run_time()).await.is_ok());
        assert_eq!(engine.status().stage, RunStage::Done);
    }

    #[tokio::test]
    async fn should_always_emit_a_full_day_schedule() {
        for hours in [30, 40] {
            let (engine, _) = engine_with(seeded_gateway(), provider(midday_forecast(hours)), true).await;
            let plan = engine.run_at(run_time()).await.unwrap();
            let slots = plan.schedule.slots();
            assert_eq!(slots.first().unwrap().start, 0);
            assert_eq!(slots.last().unwrap().end, 1440);
            assert!(slots.windows(2).all(|pair| pair[0].end == pair[1].start));
        }
    }
}
