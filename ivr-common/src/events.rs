//! Event types for the IVR event system
//!
//! Provides build lifecycle events and the EventBus that fans them out to SSE
//! subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Build lifecycle events
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IvrEvent {
    /// Upload accepted, node enumeration finished, synthesis about to start
    BuildStarted {
        build_id: Uuid,
        /// Uploaded file name (or "upload" when none was given)
        source_name: String,
        total_nodes: usize,
        timestamp: DateTime<Utc>,
    },

    /// One node attempt resolved (success or failure)
    BuildProgress {
        build_id: Uuid,
        completed: usize,
        total: usize,
        timestamp: DateTime<Utc>,
    },

    /// Synthesis failed for one node; the build continues
    NodeSynthesisFailed {
        build_id: Uuid,
        node_id: String,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// Every node was attempted
    BuildCompleted {
        build_id: Uuid,
        completed: usize,
        total: usize,
        failed: usize,
        timestamp: DateTime<Utc>,
    },

    /// Build stopped early on caller request
    BuildCancelled {
        build_id: Uuid,
        completed: usize,
        total: usize,
        timestamp: DateTime<Utc>,
    },
}

impl IvrEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            IvrEvent::BuildStarted { .. } => "BuildStarted",
            IvrEvent::BuildProgress { .. } => "BuildProgress",
            IvrEvent::NodeSynthesisFailed { .. } => "NodeSynthesisFailed",
            IvrEvent::BuildCompleted { .. } => "BuildCompleted",
            IvrEvent::BuildCancelled { .. } => "BuildCancelled",
        }
    }

    /// Build this event belongs to
    pub fn build_id(&self) -> Uuid {
        match self {
            IvrEvent::BuildStarted { build_id, .. }
            | IvrEvent::BuildProgress { build_id, .. }
            | IvrEvent::NodeSynthesisFailed { build_id, .. }
            | IvrEvent::BuildCompleted { build_id, .. }
            | IvrEvent::BuildCancelled { build_id, .. } => *build_id,
        }
    }

    /// True for the last event a build emits
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            IvrEvent::BuildCompleted { .. } | IvrEvent::BuildCancelled { .. }
        )
    }
}

/// Central event distribution bus
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use ivr_common::events::{EventBus, IvrEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(IvrEvent::BuildProgress {
///     build_id: uuid::Uuid::new_v4(),
///     completed: 1,
///     total: 3,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert_eq!(rx.try_recv().unwrap().event_type(), "BuildProgress");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<IvrEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<IvrEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: IvrEvent) -> Result<usize, broadcast::error::SendError<IvrEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: IvrEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
