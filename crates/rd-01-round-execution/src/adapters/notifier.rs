//! Notifier adapters
//!
//! Implements `PatrolNotifier` using the shared event bus.

use crate::ports::outbound::PatrolNotifier;
use async_trait::async_trait;
use shared_bus::{EventPublisher, InMemoryEventBus, PatrolEvent};
use std::sync::Arc;
use tracing::{debug, info};

/// Publishes patrol events on the in-memory bus.
///
/// Listeners (dispatch console, live map) subscribe on the bus instead of
/// being called by the engine.
pub struct EventBusNotifier {
    event_bus: Arc<InMemoryEventBus>,
}

impl EventBusNotifier {
    pub fn new(event_bus: Arc<InMemoryEventBus>) -> Self {
        Self { event_bus }
    }
}

#[async_trait]
impl PatrolNotifier for EventBusNotifier {
    async fn notify(&self, event: PatrolEvent) {
        let topic = event.topic();
        let round_id = event.round_id().clone();

        let receivers = self.event_bus.publish(event).await;

        if receivers == 0 {
            debug!(round_id = %round_id, topic = ?topic, "No listeners for patrol event");
        } else {
            info!(round_id = %round_id, topic = ?topic, receivers, "Patrol event published");
        }
    }
}

/// Keeps every event in memory for assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    events: parking_lot::RwLock<Vec<PatrolEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PatrolEvent> {
        self.events.read().clone()
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

#[async_trait]
impl PatrolNotifier for RecordingNotifier {
    async fn notify(&self, event: PatrolEvent) {
        self.events.write().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_bus::EventFilter;
    use shared_types::RoundStatus;

    fn closed() -> PatrolEvent {
        PatrolEvent::RoundClosed {
            round_id: "r-1".into(),
            status: RoundStatus::Completed,
            end_time: 1,
        }
    }

    #[tokio::test]
    async fn test_event_bus_notifier_publishes() {
        let bus = Arc::new(InMemoryEventBus::new());
        let mut sub = bus.subscribe(EventFilter::all());
        let notifier = EventBusNotifier::new(Arc::clone(&bus));

        notifier.notify(closed()).await;

        assert_eq!(bus.events_published(), 1);
        assert!(matches!(sub.try_recv(), Ok(Some(PatrolEvent::RoundClosed { .. }))));
    }

    #[tokio::test]
    async fn test_recording_notifier_keeps_order() {
        let notifier = RecordingNotifier::new();
        assert!(notifier.is_empty());
        notifier.notify(closed()).await;
        notifier
            .notify(PatrolEvent::IncidentReported {
                round_id: "r-1".into(),
                description: "fence cut".into(),
                reported_at: 2,
            })
            .await;
        let events = notifier.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], PatrolEvent::IncidentReported { .. }));
    }
}
