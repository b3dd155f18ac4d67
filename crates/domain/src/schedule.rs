//! Schedules: day programs stored in the gateway's time program slots.
//!
//! A [`Schedule`] covers one calendar day with contiguous [`TimeSlot`]s.
//! On the device a day program is a list of [`SwitchPoint`]s; each slot
//! maps to the switch point at its start.

use std::fmt;
use std::str::FromStr;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Minutes in one calendar day.
pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// One of the three on-device time program slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScheduleId {
    #[serde(rename = "schedule_1")]
    Schedule1,
    #[serde(rename = "schedule_2")]
    Schedule2,
    #[serde(rename = "schedule_3")]
    Schedule3,
}

impl ScheduleId {
    pub const ALL: [Self; 3] = [Self::Schedule1, Self::Schedule2, Self::Schedule3];

    /// Zero-based slot index.
    #[must_use]
    pub fn index(self) -> u8 {
        match self {
            Self::Schedule1 => 0,
            Self::Schedule2 => 1,
            Self::Schedule3 => 2,
        }
    }
}

impl fmt::Display for ScheduleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "schedule_{}", self.index() + 1)
    }
}

impl FromStr for ScheduleId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.to_string() == s)
            .ok_or_else(|| ValidationError::UnknownValue {
                kind: "schedule",
                value: s.to_string(),
            })
    }
}

/// Setpoint a time slot steers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Setpoint {
    /// Reduced setpoint, the idle floor of a DHW program.
    Eco,
    Comfort,
    Away,
    Morning,
    Evening,
}

/// Circuit activity a program drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    HeatCool,
    Dhw,
}

/// A half-open interval `[start, end)` of the day, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: u16,
    pub end: u16,
    pub setpoint: Setpoint,
}

impl TimeSlot {
    #[must_use]
    pub fn duration_minutes(&self) -> u16 {
        self.end - self.start
    }
}

/// A device switch point: from `minute` on, run `setpoint`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchPoint {
    pub minute: u16,
    pub setpoint: Setpoint,
    pub activity: Activity,
}

/// A full-day program for one weekday of a schedule slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schedule {
    id: ScheduleId,
    weekday: Weekday,
    activity: Activity,
    slots: Vec<TimeSlot>,
}

impl Schedule {
    /// Build a schedule from explicit slots.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidSchedule`] unless the slots are
    /// non-empty, each non-degenerate, contiguous, and together span
    /// exactly `[0, 1440)`.
    pub fn new(
        id: ScheduleId,
        weekday: Weekday,
        activity: Activity,
        slots: Vec<TimeSlot>,
    ) -> Result<Self, ValidationError> {
        let invalid = |reason: String| ValidationError::InvalidSchedule { reason };
        let (Some(first), Some(last)) = (slots.first(), slots.last()) else {
            return Err(invalid("no time slots".to_string()));
        };
        if first.start != 0 {
            return Err(invalid(format!("first slot starts at minute {}", first.start)));
        }
        if last.end != MINUTES_PER_DAY {
            return Err(invalid(format!("last slot ends at minute {}", last.end)));
        }
        if let Some(slot) = slots.iter().find(|slot| slot.start >= slot.end) {
            return Err(invalid(format!(
                "slot [{}, {}) is empty",
                slot.start, slot.end
            )));
        }
        if let Some(pair) = slots.windows(2).find(|pair| pair[0].end != pair[1].start) {
            return Err(invalid(format!(
                "slot ending at {} is followed by a slot starting at {}",
                pair[0].end, pair[1].start
            )));
        }
        Ok(Self {
            id,
            weekday,
            activity,
            slots,
        })
    }

    /// Build a schedule from one setpoint per hour, merging equal neighbours.
    #[must_use]
    pub fn from_hourly(
        id: ScheduleId,
        weekday: Weekday,
        activity: Activity,
        hourly: &[Setpoint; 24],
    ) -> Self {
        let mut slots: Vec<TimeSlot> = Vec::new();
        for (hour, setpoint) in (0u16..).zip(hourly) {
            let start = hour * 60;
            match slots.last_mut() {
                Some(last) if last.setpoint == *setpoint => last.end = start + 60,
                _ => slots.push(TimeSlot {
                    start,
                    end: start + 60,
                    setpoint: *setpoint,
                }),
            }
        }
        Self {
            id,
            weekday,
            activity,
            slots,
        }
    }

    /// Rebuild a schedule from a device day program.
    ///
    /// Switch points are sorted by time. When the first one starts after
    /// midnight, the day opens with the setpoint of the last one, carried
    /// over from the previous day.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidSchedule`] if there are no switch
    /// points or two of them share the same minute.
    pub fn from_switch_points(
        id: ScheduleId,
        weekday: Weekday,
        points: &[SwitchPoint],
    ) -> Result<Self, ValidationError> {
        let mut points = points.to_vec();
        points.sort_by_key(|point| point.minute);
        let (Some(first), Some(last)) = (points.first().copied(), points.last().copied()) else {
            return Err(ValidationError::InvalidSchedule {
                reason: "day program has no switch points".to_string(),
            });
        };
        let mut slots = Vec::with_capacity(points.len() + 1);
        if first.minute > 0 {
            slots.push(TimeSlot {
                start: 0,
                end: first.minute,
                setpoint: last.setpoint,
            });
        }
        for (index, point) in points.iter().enumerate() {
            let end = points
                .get(index + 1)
                .map_or(MINUTES_PER_DAY, |next| next.minute);
            slots.push(TimeSlot {
                start: point.minute,
                end,
                setpoint: point.setpoint,
            });
        }
        Self::new(id, weekday, first.activity, slots)
    }

    #[must_use]
    pub fn id(&self) -> ScheduleId {
        self.id
    }

    #[must_use]
    pub fn weekday(&self) -> Weekday {
        self.weekday
    }

    #[must_use]
    pub fn activity(&self) -> Activity {
        self.activity
    }

    #[must_use]
    pub fn slots(&self) -> &[TimeSlot] {
        &self.slots
    }

    /// One switch point per slot, in order.
    #[must_use]
    pub fn switch_points(&self) -> Vec<SwitchPoint> {
        self.slots
            .iter()
            .map(|slot| SwitchPoint {
                minute: slot.start,
                setpoint: slot.setpoint,
                activity: self.activity,
            })
            .collect()
    }

    /// Slots running the given setpoint.
    pub fn windows(&self, setpoint: Setpoint) -> impl Iterator<Item = &TimeSlot> {
        self.slots.iter().filter(move |slot| slot.setpoint == setpoint)
    }
}
