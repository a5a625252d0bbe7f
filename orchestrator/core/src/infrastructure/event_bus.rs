// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - Pub/Sub for Domain Events
//
// Provides in-memory event streaming using tokio broadcast channels.
// Lets the CLI, loggers and tests observe lock coordination without
// reaching into the target registry.
//
// In-memory only: events published with no subscriber are dropped.

use crate::domain::entity::TargetId;
use crate::domain::events::{CoordinationEvent, TickEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Unified domain event type for the event bus
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    Coordination(CoordinationEvent),
    Tick(TickEvent),
}

/// Event bus for publishing and subscribing to domain events
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with specified channel capacity
    /// Capacity determines how many events can be buffered before dropping old ones
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Create event bus with default capacity (1000)
    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    /// Publish a lock coordination event
    pub fn publish_coordination_event(&self, event: CoordinationEvent) {
        self.publish(DomainEvent::Coordination(event));
    }

    /// Publish a tick lifecycle event
    pub fn publish_tick_event(&self, event: TickEvent) {
        self.publish(DomainEvent::Tick(event));
    }

    fn publish(&self, event: DomainEvent) {
        debug!("Publishing event: {:?}", event);

        // send() only fails when nobody is subscribed
        let receiver_count = self.sender.send(event).unwrap_or(0);

        if receiver_count == 0 {
            debug!("No subscribers listening to event");
        }
    }

    /// Subscribe to all domain events
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Subscribe to coordination events concerning a single target
    pub fn subscribe_target(&self, target_id: TargetId) -> TargetEventReceiver {
        TargetEventReceiver {
            receiver: self.sender.subscribe(),
            target_id,
        }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

/// Receiver for all domain events
pub struct EventReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
}

impl EventReceiver {
    /// Receive the next event (waits until one is available)
    pub async fn recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    /// Try to receive an event without waiting
    pub fn try_recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

/// Receiver for coordination events of one target (filtered)
pub struct TargetEventReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
    target_id: TargetId,
}

impl TargetEventReceiver {
    /// Receive the next coordination event for the subscribed target
    pub async fn recv(&mut self) -> Result<CoordinationEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(map_recv_error)?;
            if let DomainEvent::Coordination(event) = event {
                if event.target_id() == &self.target_id {
                    return Ok(event);
                }
            }
        }
    }
}

fn map_recv_error(e: broadcast::error::RecvError) -> EventBusError {
    match e {
        broadcast::error::RecvError::Closed => EventBusError::Closed,
        broadcast::error::RecvError::Lagged(n) => {
            warn!("Event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

/// Errors that can occur when receiving events
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::AgentId;
    use crate::domain::entity::GridPosition;
    use chrono::Utc;

    fn locked(target: &str, agent: &str) -> CoordinationEvent {
        CoordinationEvent::TargetLocked {
            target_id: TargetId::new(target),
            agent_id: AgentId::new(agent),
            position: GridPosition::new(11, 9),
            tick: 4,
            locked_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_event_bus_publish_subscribe() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        event_bus.publish_coordination_event(locked("P1", "D0"));

        let received = receiver.recv().await.unwrap();
        match received {
            DomainEvent::Coordination(CoordinationEvent::TargetLocked { target_id, agent_id, .. }) => {
                assert_eq!(target_id, TargetId::new("P1"));
                assert_eq!(agent_id, AgentId::new("D0"));
            }
            _ => panic!("Wrong event type received"),
        }
    }

    #[tokio::test]
    async fn test_target_event_filtering() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe_target(TargetId::new("P2"));

        event_bus.publish_coordination_event(locked("P1", "D0"));
        event_bus.publish_tick_event(TickEvent::TickCompleted {
            tick: 4,
            decisions: 2,
            registry_entries: 1,
            locked_entries: 1,
            completed_at: Utc::now(),
        });
        event_bus.publish_coordination_event(locked("P2", "D1"));

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.target_id(), &TargetId::new("P2"));
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let event_bus = EventBus::new(10);
        let mut receiver1 = event_bus.subscribe();
        let mut receiver2 = event_bus.subscribe();

        assert_eq!(event_bus.subscriber_count(), 2);

        event_bus.publish_coordination_event(locked("P3", "D2"));

        let _ = receiver1.recv().await.unwrap();
        let _ = receiver2.recv().await.unwrap();
    }

    #[test]
    fn test_try_recv_empty() {
        let event_bus = EventBus::new(4);
        let mut receiver = event_bus.subscribe();
        assert!(matches!(receiver.try_recv(), Err(EventBusError::Empty)));
    }

    #[test]
    fn test_serialized_events_are_tagged() {
        let json = serde_json::to_value(DomainEvent::Coordination(locked("P5", "D0"))).unwrap();
        assert_eq!(json["type"], "coordination");
        assert_eq!(json["TargetLocked"]["target_id"], "P5");
    }
}
