//! In-process event bus backed by a tokio broadcast channel.
//!
//! Subscribers pick the events they care about with an [`EventFilter`]:
//! a zone card listens to one zone's updates, the scheduler dashboard to
//! run outcomes. A subscriber that falls behind loses the oldest events and
//! keeps receiving; it never sees the channel error.

use std::future::Future;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use thermohub_domain::error::ThermoHubError;
use thermohub_domain::event::{Event, EventType};

use crate::ports::EventPublisher;

/// Selects events by type and by zone. The default matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    event_types: Vec<EventType>,
    zone_id: Option<u8>,
}

impl EventFilter {
    /// Only events of these types.
    #[must_use]
    pub fn event_types(mut self, types: impl IntoIterator<Item = EventType>) -> Self {
        self.event_types.extend(types);
        self
    }

    /// Only events about `zone_id`; events tied to no zone are dropped.
    #[must_use]
    pub fn zone(mut self, zone_id: u8) -> Self {
        self.zone_id = Some(zone_id);
        self
    }

    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        let type_ok = self.event_types.is_empty() || self.event_types.contains(&event.event_type);
        let zone_ok = self.zone_id.is_none() || event.zone_id == self.zone_id;
        type_ok && zone_ok
    }
}

/// A filtered view over the bus.
pub struct Subscription {
    receiver: broadcast::Receiver<Event>,
    filter: EventFilter,
}

impl Subscription {
    /// Wait for the next matching event.
    ///
    /// Returns `None` once the bus is dropped.
    pub async fn next(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, filter = ?self.filter, "event subscriber lagging");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

/// Fan-out of zone and scheduling events to in-process subscribers.
///
/// Publishing succeeds even when no one is listening.
pub struct InProcessEventBus {
    sender: broadcast::Sender<Event>,
}

impl InProcessEventBus {
    /// Create a bus that buffers up to `capacity` events per slow subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Receive matching events published after this call.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            filter,
        }
    }
}

impl EventPublisher for InProcessEventBus {
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), ThermoHubError>> + Send {
        match self.sender.send(event) {
            Ok(receivers) => tracing::trace!(receivers, "event published"),
            Err(broadcast::error::SendError(event)) => {
                tracing::trace!(event_type = ?event.event_type, "event dropped, no subscribers");
            }
        }
        async { Ok(()) }
    }
}
