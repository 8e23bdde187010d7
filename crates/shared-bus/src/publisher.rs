//! # Event Publisher
//!
//! The engine side of the bus. A publish never waits on listeners: events go
//! into a `tokio::sync::broadcast` ring and each subscription filters its own
//! copy.

use crate::events::{EventFilter, PatrolEvent};
use crate::subscriber::{EventStream, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Publishing port used by the round engine's notifier.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Hand `event` to every live subscription and return how many there were.
    async fn publish(&self, event: PatrolEvent) -> usize;

    /// Events handed to the bus so far, delivered or not.
    fn events_published(&self) -> u64;
}

/// Broadcast bus for one device session.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<PatrolEvent>,
    published: AtomicU64,
    /// Published while nobody was subscribed.
    undelivered: AtomicU64,
    capacity: usize,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// `capacity` is how far a subscriber may fall behind before it skips.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            published: AtomicU64::new(0),
            undelivered: AtomicU64::new(0),
            capacity: capacity.max(1),
        }
    }

    /// Events published from now on that pass `filter`.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        debug!(
            topics = ?filter.topics,
            rounds = filter.rounds.len(),
            "Patrol event subscription opened"
        );
        Subscription::new(self.sender.subscribe(), filter)
    }

    /// Same as [`subscribe`](Self::subscribe), as a `Stream`.
    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        EventStream::new(self.subscribe(filter))
    }

    /// Live subscriptions and streams.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub fn undelivered(&self) -> u64 {
        self.undelivered.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: PatrolEvent) -> usize {
        let topic = event.topic();
        let round_id = event.round_id().clone();
        self.published.fetch_add(1, Ordering::Relaxed);

        let Ok(receivers) = self.sender.send(event) else {
            self.undelivered.fetch_add(1, Ordering::Relaxed);
            warn!(
                topic = ?topic,
                round_id = %round_id,
                "Patrol event had no listener"
            );
            return 0;
        };

        debug!(
            topic = ?topic,
            round_id = %round_id,
            receivers,
            "Patrol event published"
        );
        receivers
    }

    fn events_published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}
