//! Broadcast bus with topic filtering and drop-oldest backpressure

use std::collections::HashSet;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::event::{Event, Topic};

/// Default per-subscriber queue depth
pub const DEFAULT_CAPACITY: usize = 256;

/// Topic-addressed event bus.
///
/// Cloning the bus is cheap; every clone publishes into the same channel.
/// Publishing never blocks: a subscriber that falls more than `capacity`
/// events behind loses its oldest undelivered events.
#[derive(Clone)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Create a bus with the given per-subscriber queue depth
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event to all current subscribers.
    ///
    /// An event published while nobody is subscribed is simply lost;
    /// these are current-state signals, not a transaction log.
    pub fn publish(&self, event: Event) {
        if self.tx.send(event).is_err() {
            debug!("event published with no subscribers attached");
        }
    }

    /// Attach a subscriber for the given topics.
    ///
    /// Only events published after this call are delivered.
    pub fn subscribe(&self, topics: &[Topic]) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            topics: topics.iter().copied().collect(),
            dropped: 0,
        }
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// A subscriber's view of the bus, filtered to its topic set
pub struct Subscription {
    rx: broadcast::Receiver<Event>,
    topics: HashSet<Topic>,
    dropped: u64,
}

impl Subscription {
    /// Wait for the next event on a subscribed topic.
    ///
    /// Returns `None` once the bus is gone (all publishers dropped).
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.rx.recv().await {
                Ok(event) => {
                    if self.topics.contains(&event.topic()) {
                        return Some(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    self.dropped += n;
                    warn!(dropped = n, "subscriber lagged, oldest events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Drain the next matching event without waiting
    pub fn try_recv(&mut self) -> Option<Event> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => {
                    if self.topics.contains(&event.topic()) {
                        return Some(event);
                    }
                }
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    self.dropped += n;
                    warn!(dropped = n, "subscriber lagged, oldest events dropped");
                }
                Err(_) => return None,
            }
        }
    }

    /// Total events this subscriber lost to backpressure
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ButtonGesture, FatigueEvent, FatigueLevel, GestureKind};

    fn fatigue(seq: u64) -> Event {
        Event::Fatigue(FatigueEvent {
            level: FatigueLevel::Normal,
            score: 0.0,
            face_detected: true,
            timestamp_ms: seq,
        })
    }

    #[tokio::test]
    async fn test_no_replay_for_late_subscriber() {
        let bus = Bus::new(16);

        bus.publish(fatigue(1));
        bus.publish(fatigue(2));

        let mut sub = bus.subscribe(&[Topic::VisionMetrics]);
        bus.publish(fatigue(3));

        match sub.recv().await {
            Some(Event::Fatigue(e)) => assert_eq!(e.timestamp_ms, 3),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_publication_order_preserved() {
        let bus = Bus::new(16);
        let mut sub = bus.subscribe(&[Topic::VisionMetrics]);

        for seq in 0..5 {
            bus.publish(fatigue(seq));
        }

        for seq in 0..5 {
            match sub.recv().await {
                Some(Event::Fatigue(e)) => assert_eq!(e.timestamp_ms, seq),
                other => panic!("unexpected event: {:?}", other),
            }
        }
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_overflow_drops_oldest() {
        let bus = Bus::new(4);
        let mut sub = bus.subscribe(&[Topic::VisionMetrics]);

        for seq in 0..8 {
            bus.publish(fatigue(seq));
        }

        // The four oldest were dropped; the newest four survive in order.
        for seq in 4..8 {
            match sub.recv().await {
                Some(Event::Fatigue(e)) => assert_eq!(e.timestamp_ms, seq),
                other => panic!("unexpected event: {:?}", other),
            }
        }
        assert_eq!(sub.dropped(), 4);
    }

    #[tokio::test]
    async fn test_topic_filtering() {
        let bus = Bus::new(16);
        let mut sub = bus.subscribe(&[Topic::ButtonInput]);

        bus.publish(fatigue(1));
        bus.publish(Event::Button(ButtonGesture {
            kind: GestureKind::Single,
            timestamp_ms: 2,
        }));

        match sub.recv().await {
            Some(Event::Button(g)) => assert_eq!(g.kind, GestureKind::Single),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(sub.try_recv().is_none());
    }
}
