//! Planning: turn a validated forecast into a next-day DHW schedule.
//!
//! Hours are estimated on the local clock of the scheduling day. The plan
//! heats the tank in the hours whose PV surplus covers the reheat demand:
//!
//! 1. a contiguous window of `required_hours` with the largest irradiance,
//!    earliest first on ties;
//! 2. otherwise up to [`MAX_HEAT_HOURS`] best-surplus hours, as long as they
//!    merge into at most [`MAX_HEAT_WINDOWS`] windows;
//! 3. otherwise nothing, unless the legionella floor asks for the
//!    best-surplus window regardless of coverage.

use std::time::Duration;

use chrono::{Datelike, NaiveDate, Timelike};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::forecast::Forecast;
use crate::pv::PvSystem;
use crate::schedule::{Activity, Schedule, ScheduleId, Setpoint};
use crate::thermal::BoilerConfig;

/// Longest time the boiler is allowed to heat in one plan.
pub const MAX_HEAT_HOURS: usize = 3;
/// Most separate heat windows a plan may hold.
pub const MAX_HEAT_WINDOWS: usize = 2;

const SECONDS_PER_HOUR: f64 = 3600.0;

fn default_timezone() -> Tz {
    chrono_tz::UTC
}

fn default_horizon_margin_hours() -> u32 {
    3
}

fn default_target_delta_t() -> f64 {
    10.0
}

fn default_heating_power_w() -> f64 {
    3000.0
}

fn default_baseline_consumption_w() -> f64 {
    250.0
}

fn default_true() -> bool {
    true
}

/// Auto schedule settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoScheduleOptions {
    /// Forecast source handed to the weather provider.
    pub weather_entity_id: String,
    pub selected_schedule: ScheduleId,
    pub pv_options: PvSystem,
    pub dhw_boiler_options: BoilerConfig,
    #[serde(default = "default_timezone")]
    pub timezone: Tz,
    #[serde(default = "default_horizon_margin_hours")]
    pub horizon_margin_hours: u32,
    /// Temperature rise to plan for, K.
    #[serde(default = "default_target_delta_t")]
    pub target_delta_t: f64,
    /// Electrical power of the DHW heater, W.
    #[serde(default = "default_heating_power_w")]
    pub heating_power_w: f64,
    /// Household consumption PV must cover before the boiler, W.
    #[serde(default = "default_baseline_consumption_w")]
    pub baseline_consumption_w: f64,
    /// Always heat once a day, even without PV surplus.
    #[serde(default)]
    pub legionella_floor: bool,
    #[serde(default = "default_true")]
    pub verify_after_write: bool,
}

impl AutoScheduleOptions {
    /// Options with default tuning.
    #[must_use]
    pub fn new(
        weather_entity_id: impl Into<String>,
        selected_schedule: ScheduleId,
        pv_options: PvSystem,
        dhw_boiler_options: BoilerConfig,
    ) -> Self {
        Self {
            weather_entity_id: weather_entity_id.into(),
            selected_schedule,
            pv_options,
            dhw_boiler_options,
            timezone: default_timezone(),
            horizon_margin_hours: default_horizon_margin_hours(),
            target_delta_t: default_target_delta_t(),
            heating_power_w: default_heating_power_w(),
            baseline_consumption_w: default_baseline_consumption_w(),
            legionella_floor: false,
            verify_after_write: true,
        }
    }

    /// Validate all nested settings.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] naming the first invalid setting.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.weather_entity_id.trim().is_empty() {
            return Err(ValidationError::EmptyName {
                what: "weather_entity_id",
            });
        }
        self.pv_options.validate()?;
        self.dhw_boiler_options.validate()?;
        for (field, value) in [
            ("target_delta_t", self.target_delta_t),
            ("heating_power_w", self.heating_power_w),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ValidationError::InvalidConfig {
                    field,
                    reason: format!("must be positive, got {value}"),
                });
            }
        }
        if !(self.baseline_consumption_w.is_finite() && self.baseline_consumption_w >= 0.0) {
            return Err(ValidationError::InvalidConfig {
                field: "baseline_consumption_w",
                reason: format!("must not be negative, got {}", self.baseline_consumption_w),
            });
        }
        if self.horizon_margin_hours >= 24 {
            return Err(ValidationError::InvalidConfig {
                field: "horizon_margin_hours",
                reason: format!("must be below 24, got {}", self.horizon_margin_hours),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn horizon_margin(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.horizon_margin_hours))
    }
}

/// Estimate for one local hour of the scheduling day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HourEstimate {
    pub hour: u8,
    pub irradiance: f64,
    pub pv_watts: f64,
    pub surplus_watts: f64,
}

/// Outcome of planning one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchedulePlan {
    pub date: NaiveDate,
    pub schedule: Schedule,
    /// Local hours the tank heats, ascending.
    pub heat_hours: Vec<u8>,
    #[serde(with = "duration_secs")]
    pub reheat_duration: Duration,
    /// Electrical energy the reheat needs, Wh.
    pub demand_wh: f64,
    /// PV surplus available in the heat hours, Wh.
    pub surplus_wh: f64,
    pub demand_covered: bool,
    pub hours: Vec<HourEstimate>,
}

mod duration_secs {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }
}

/// Plan the DHW schedule for `date` from a validated forecast.
///
/// # Errors
///
/// Returns [`ValidationError::InsufficientHeatingPower`] when the heater
/// cannot outrun the standby loss.
pub fn plan_day(
    options: &AutoScheduleOptions,
    forecast: Forecast,
    date: NaiveDate,
) -> Result<SchedulePlan, ValidationError> {
    let hours = estimate_hours(options, forecast, date);

    let reheat_duration = options
        .dhw_boiler_options
        .reheat_duration(options.target_delta_t, options.heating_power_w)?;
    let reheat_hours = reheat_duration.as_secs_f64() / SECONDS_PER_HOUR;
    let demand_wh = options.heating_power_w * reheat_hours;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let required_hours = (reheat_hours.ceil() as usize).clamp(1, MAX_HEAT_HOURS);

    let (heat_hours, demand_covered) = select_hours(&hours, required_hours, demand_wh)
        .map(|selected| (selected, true))
        .unwrap_or_else(|| {
            if options.legionella_floor {
                (best_surplus_window(&hours, required_hours), false)
            } else {
                (Vec::new(), false)
            }
        });

    let surplus_wh = heat_hours
        .iter()
        .map(|hour| hours[usize::from(*hour)].surplus_watts)
        .sum();

    let mut hourly = [Setpoint::Eco; 24];
    for hour in &heat_hours {
        hourly[usize::from(*hour)] = Setpoint::Comfort;
    }
    let schedule = Schedule::from_hourly(
        options.selected_schedule,
        date.weekday(),
        Activity::Dhw,
        &hourly,
    );

    Ok(SchedulePlan {
        date,
        schedule,
        heat_hours,
        reheat_duration,
        demand_wh,
        surplus_wh,
        demand_covered,
        hours,
    })
}

fn estimate_hours(
    options: &AutoScheduleOptions,
    forecast: Forecast,
    date: NaiveDate,
) -> Vec<HourEstimate> {
    let mut buckets = [(0.0_f64, 0_u32); 24];
    for sample in forecast {
        let local = sample.timestamp.with_timezone(&options.timezone);
        if local.date_naive() != date {
            continue;
        }
        let bucket = &mut buckets[local.hour() as usize];
        bucket.0 += sample.solar_irradiance;
        bucket.1 += 1;
    }
    (0u8..)
        .zip(buckets)
        .map(|(hour, (sum, count))| {
            let irradiance = if count == 0 { 0.0 } else { sum / f64::from(count) };
            let pv_watts = options.pv_options.output_watts(irradiance, date);
            HourEstimate {
                hour,
                irradiance,
                pv_watts,
                surplus_watts: (pv_watts - options.baseline_consumption_w).max(0.0),
            }
        })
        .collect()
}

fn select_hours(hours: &[HourEstimate], required: usize, demand_wh: f64) -> Option<Vec<u8>> {
    best_contiguous(hours, required, demand_wh).or_else(|| best_disjoint(hours, demand_wh))
}

fn window_hours(hours: &[HourEstimate], start: usize, len: usize) -> Vec<u8> {
    hours[start..start + len].iter().map(|h| h.hour).collect()
}

fn best_contiguous(hours: &[HourEstimate], required: usize, demand_wh: f64) -> Option<Vec<u8>> {
    let mut best: Option<(usize, f64)> = None;
    for (start, window) in hours.windows(required).enumerate() {
        let surplus: f64 = window.iter().map(|h| h.surplus_watts).sum();
        if surplus < demand_wh {
            continue;
        }
        let irradiance: f64 = window.iter().map(|h| h.irradiance).sum();
        // Strictly greater keeps the earliest start on ties.
        if best.is_none_or(|(_, best_irradiance)| irradiance > best_irradiance) {
            best = Some((start, irradiance));
        }
    }
    best.map(|(start, _)| window_hours(hours, start, required))
}

fn best_disjoint(hours: &[HourEstimate], demand_wh: f64) -> Option<Vec<u8>> {
    let mut ranked: Vec<&HourEstimate> = hours.iter().filter(|h| h.surplus_watts > 0.0).collect();
    ranked.sort_by(|a, b| {
        b.surplus_watts
            .total_cmp(&a.surplus_watts)
            .then(a.hour.cmp(&b.hour))
    });

    let mut selected = Vec::new();
    let mut covered = 0.0;
    for hour in ranked.into_iter().take(MAX_HEAT_HOURS) {
        selected.push(hour.hour);
        covered += hour.surplus_watts;
        if covered >= demand_wh {
            selected.sort_unstable();
            return (count_windows(&selected) <= MAX_HEAT_WINDOWS).then_some(selected);
        }
    }
    None
}

fn best_surplus_window(hours: &[HourEstimate], required: usize) -> Vec<u8> {
    let mut best = (0, f64::NEG_INFINITY);
    for (start, window) in hours.windows(required).enumerate() {
        let surplus: f64 = window.iter().map(|h| h.surplus_watts).sum();
        if surplus > best.1 {
            best = (start, surplus);
        }
    }
    window_hours(hours, best.0, required)
}

fn count_windows(sorted_hours: &[u8]) -> usize {
    let breaks = sorted_hours
        .windows(2)
        .filter(|pair| pair[1] != pair[0] + 1)
        .count();
    usize::from(!sorted_hours.is_empty()) + breaks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::{ForecastAdapter, RawForecast};
    use crate::pv::Orientation;
    use crate::schedule::MINUTES_PER_DAY;
    use crate::thermal::EnergyLabel;
    use crate::time::Timestamp;

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

    fn now() -> Timestamp {
        "2024-05-06T18:00:00Z".parse().unwrap()
    }

    fn tomorrow() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 7).unwrap()
    }

    /// A forecast from `now` to the end of tomorrow with the given
    /// irradiance per local hour of tomorrow.
    fn forecast(irradiance: impl Fn(u32) -> f64) -> Forecast {
        let raw: Vec<RawForecast> = (0..30)
            .map(|offset| {
                let timestamp = now() + chrono::Duration::hours(offset);
                let value = if timestamp.date_naive() == tomorrow() {
                    irradiance(timestamp.hour())
                } else {
                    0.0
                };
                RawForecast {
                    timestamp,
                    solar_irradiance: Some(value),
                    temperature: None,
                    condition: None,
                }
            })
            .collect();
        ForecastAdapter::new(chrono_tz::UTC, chrono::Duration::hours(3))
            .validate_and_normalize(&raw, now())
            .unwrap()
    }

    fn assert_full_day(schedule: &Schedule) {
        let slots = schedule.slots();
        assert_eq!(slots[0].start, 0);
        assert_eq!(slots[slots.len() - 1].end, MINUTES_PER_DAY);
        assert!(slots.windows(2).all(|pair| pair[0].end == pair[1].start));
    }

    #[test]
    fn should_heat_in_single_sunny_midday_hour() {
        let plan = plan_day(
            &options(),
            forecast(|hour| if hour == 12 { 700.0 } else { 0.0 }),
            tomorrow(),
        )
        .unwrap();

        assert_eq!(plan.heat_hours, vec![12]);
        assert!(plan.demand_covered);
        let heat: Vec<_> = plan.schedule.windows(Setpoint::Comfort).collect();
        assert_eq!(heat.len(), 1);
        assert_eq!((heat[0].start, heat[0].end), (720, 780));
        assert_eq!(plan.schedule.weekday(), chrono::Weekday::Tue);
        assert_full_day(&plan.schedule);
    }

    #[test]
    fn should_prefer_brightest_window_among_qualifying_ones() {
        let plan = plan_day(
            &options(),
            forecast(|hour| match hour {
                10 => 800.0,
                14 => 900.0,
                _ => 0.0,
            }),
            tomorrow(),
        )
        .unwrap();
        assert_eq!(plan.heat_hours, vec![14]);
    }

    #[test]
    fn should_pick_earliest_window_when_irradiance_ties() {
        let plan = plan_day(
            &options(),
            forecast(|hour| if (9..=15).contains(&hour) { 800.0 } else { 0.0 }),
            tomorrow(),
        )
        .unwrap();
        assert_eq!(plan.heat_hours, vec![9]);
    }

    #[test]
    fn should_use_contiguous_window_for_long_reheat() {
        let mut options = options();
        options.target_delta_t = 30.0;
        let plan = plan_day(
            &options,
            forecast(|hour| if (10..=15).contains(&hour) { 900.0 } else { 0.0 }),
            tomorrow(),
        )
        .unwrap();
        assert_eq!(plan.heat_hours, vec![10, 11, 12]);
        assert!(plan.demand_covered);
    }

    #[test]
    fn should_combine_separate_hours_when_no_window_covers_demand() {
        let mut options = options();
        options.target_delta_t = 20.0;
        let plan = plan_day(
            &options,
            forecast(|hour| match hour {
                9 | 15 => 1000.0,
                _ => 0.0,
            }),
            tomorrow(),
        )
        .unwrap();
        assert_eq!(plan.heat_hours, vec![9, 15]);
        assert!(plan.demand_covered);
        assert_eq!(plan.schedule.windows(Setpoint::Comfort).count(), 2);
        assert_full_day(&plan.schedule);
    }

    #[test]
    fn should_stay_idle_all_day_when_surplus_is_short() {
        let plan = plan_day(&options(), forecast(|_| 100.0), tomorrow()).unwrap();
        assert!(plan.heat_hours.is_empty());
        assert!(!plan.demand_covered);
        assert_eq!(plan.schedule.slots().len(), 1);
        assert_full_day(&plan.schedule);
    }

    #[test]
    fn should_heat_in_best_window_when_legionella_floor_is_set() {
        let mut options = options();
        options.legionella_floor = true;
        let plan = plan_day(
            &options,
            forecast(|hour| if hour == 13 { 300.0 } else { 100.0 }),
            tomorrow(),
        )
        .unwrap();
        assert_eq!(plan.heat_hours, vec![13]);
        assert!(!plan.demand_covered);
    }

    #[test]
    fn should_always_produce_contiguous_full_day_schedule() {
        for peak in 0..24 {
            let plan = plan_day(
                &options(),
                forecast(|hour| if hour.abs_diff(peak) <= 1 { 1000.0 } else { 50.0 }),
                tomorrow(),
            )
            .unwrap();
            assert_full_day(&plan.schedule);
            assert!(plan.schedule.switch_points().len() <= 6);
        }
    }

    #[test]
    fn should_count_merged_windows() {
        assert_eq!(count_windows(&[]), 0);
        assert_eq!(count_windows(&[3, 4, 5]), 1);
        assert_eq!(count_windows(&[3, 5, 6, 9]), 3);
    }

    #[test]
    fn should_reject_invalid_options() {
        let mut options = options();
        options.heating_power_w = 0.0;
        assert!(options.validate().is_err());
        let mut options = self::options();
        options.weather_entity_id = " ".to_string();
        assert_eq!(
            options.validate(),
            Err(ValidationError::EmptyName {
                what: "weather_entity_id"
            })
        );
    }
}
