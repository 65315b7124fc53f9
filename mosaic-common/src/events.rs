//! Event types for mosaic pipeline progress
//!
//! Provides the `MosaicEvent` enum and the `EventBus` used to observe a
//! pipeline run. Every event carries the run id so that several runs can
//! share one bus without cross-talk.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Mosaic pipeline events
///
/// Events are broadcast via EventBus and can be serialized for transmission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MosaicEvent {
    /// Image partitioned, row 0 about to be dispatched
    RunStarted {
        run_id: Uuid,
        column_count: usize,
        row_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// All tile fetches of a row have been launched
    RowStarted {
        run_id: Uuid,
        row: usize,
        timestamp: DateTime<Utc>,
    },

    /// One tile fetch handed to a worker
    TileRequested {
        run_id: Uuid,
        row: usize,
        column: usize,
        /// Full fetch URL (`<base>/color/<hex>`)
        url: String,
        timestamp: DateTime<Utc>,
    },

    /// A worker reported an OK tile
    TileReceived {
        run_id: Uuid,
        row: usize,
        column: usize,
        timestamp: DateTime<Utc>,
    },

    /// A row was drawn onto the output surface
    RowRendered {
        run_id: Uuid,
        row: usize,
        timestamp: DateTime<Utc>,
    },

    /// Last row rendered
    RunCompleted {
        run_id: Uuid,
        rows_rendered: usize,
        timestamp: DateTime<Utc>,
    },

    /// Fatal error, no further rows will be dispatched
    RunFailed {
        run_id: Uuid,
        /// Row in flight when the run failed, if any
        row: Option<usize>,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl MosaicEvent {
    /// Run this event belongs to
    pub fn run_id(&self) -> Uuid {
        match self {
            MosaicEvent::RunStarted { run_id, .. }
            | MosaicEvent::RowStarted { run_id, .. }
            | MosaicEvent::TileRequested { run_id, .. }
            | MosaicEvent::TileReceived { run_id, .. }
            | MosaicEvent::RowRendered { run_id, .. }
            | MosaicEvent::RunCompleted { run_id, .. }
            | MosaicEvent::RunFailed { run_id, .. } => *run_id,
        }
    }

    /// Whether this event ends a run
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MosaicEvent::RunCompleted { .. } | MosaicEvent::RunFailed { .. }
        )
    }
}

/// Broadcast bus for mosaic events
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MosaicEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` events are
    /// buffered. A run emits roughly `2 * tiles + 2 * rows` events.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<MosaicEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: MosaicEvent,
    ) -> Result<usize, broadcast::error::SendError<MosaicEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: MosaicEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers_is_err() {
        let bus = EventBus::new(10);
        let result = bus.emit(MosaicEvent::RowStarted {
            run_id: Uuid::new_v4(),
            row: 0,
            timestamp: Utc::now(),
        });
        assert!(result.is_err());
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.capacity(), 10);
    }

    #[tokio::test]
    async fn test_subscriber_receives_events_in_order() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        let run_id = Uuid::new_v4();

        bus.emit_lossy(MosaicEvent::RowStarted {
            run_id,
            row: 0,
            timestamp: Utc::now(),
        });
        bus.emit_lossy(MosaicEvent::RowRendered {
            run_id,
            row: 0,
            timestamp: Utc::now(),
        });

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert!(matches!(first, MosaicEvent::RowStarted { row: 0, .. }));
        assert!(matches!(second, MosaicEvent::RowRendered { row: 0, .. }));
        assert_eq!(second.run_id(), run_id);
        assert!(!second.is_terminal());
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = MosaicEvent::RunFailed {
            run_id: Uuid::nil(),
            row: Some(1),
            message: "Server Response status Invalid".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "RunFailed");
        assert_eq!(json["row"], 1);
        assert!(event.is_terminal());
    }
}
