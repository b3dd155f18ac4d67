//! Event: an immutable record of something that happened.
//!
//! Events are published after a device write is acknowledged or when an
//! auto-schedule run finishes. They never describe intended changes.

use serde::{Deserialize, Serialize};

use crate::id::EventId;
use crate::time::{Timestamp, now};

/// What kind of thing happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A zone's state changed after the device acknowledged a write,
    /// or after a refresh read new values.
    ZoneUpdated,
    /// A DHW schedule was computed and written.
    AutoScheduleCompleted,
    /// An auto-schedule run stopped on an error.
    AutoScheduleFailed,
}

/// A domain event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub event_type: EventType,
    /// Zone the event concerns, if any.
    pub zone_id: Option<u8>,
    pub timestamp: Timestamp,
    pub data: serde_json::Value,
}

impl Event {
    /// Create an event stamped with the current time.
    #[must_use]
    pub fn new(event_type: EventType, zone_id: Option<u8>, data: serde_json::Value) -> Self {
        Self {
            id: EventId::new(),
            event_type,
            zone_id,
            timestamp: now(),
            data,
        }
    }
}
