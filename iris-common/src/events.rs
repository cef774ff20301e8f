//! Event types and event bus
//!
//! The client state machines (session, auth flow, lockout timer, analyze
//! pipeline) publish what happened on an [`EventBus`]; whatever renders the
//! UI subscribes and redraws. Emitting never blocks and never fails the
//! caller: with no subscriber the event is simply dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::analysis::{ContentType, Verdict};

/// Iris event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IrisEvent {
    /// Session logged in or out
    SessionChanged {
        authenticated: bool,
        username: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// Auth flow moved to a new phase (`idle`, `submitting`, `otp_required`,
    /// `lockout`, `authenticated`, `failed`)
    AuthPhaseChanged {
        phase: String,
        timestamp: DateTime<Utc>,
    },

    /// Current location changed
    Navigated {
        path: String,
        /// History entry was replaced rather than pushed
        replace: bool,
        timestamp: DateTime<Utc>,
    },

    /// Lockout countdown, once per second
    LockoutTick { seconds_left: u64 },

    /// Lockout countdown reached zero
    LockoutEnded { timestamp: DateTime<Utc> },

    /// Analysis pipeline moved to a new stage
    AnalysisProgress {
        content_type: ContentType,
        stage: String,
    },

    /// Primary analysis result is available
    AnalysisCompleted {
        content_type: ContentType,
        verdict: Verdict,
        confidence_percent: u32,
        timestamp: DateTime<Utc>,
    },

    /// Primary analysis failed (validation, upstream or network)
    AnalysisFailed {
        content_type: ContentType,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Narrative interpretation text is available (possibly the fallback)
    InterpretationReady {
        content_type: ContentType,
        fallback: bool,
    },
}

/// Broadcast channel shared by every component of one client instance
///
/// # Examples
///
/// ```
/// use iris_common::events::{EventBus, IrisEvent};
///
/// let bus = EventBus::new(16);
/// let mut rx = bus.subscribe();
/// bus.emit(IrisEvent::LockoutTick { seconds_left: 3 });
/// assert_eq!(rx.try_recv().unwrap(), IrisEvent::LockoutTick { seconds_left: 3 });
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<IrisEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// * `capacity` - Number of events buffered per subscriber before the
    ///   oldest are dropped
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<IrisEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit(&self, event: IrisEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let bus = EventBus::new(4);
        bus.emit(IrisEvent::LockoutEnded {
            timestamp: Utc::now(),
        });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscribers_receive_in_order() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        bus.emit(IrisEvent::LockoutTick { seconds_left: 2 });
        bus.emit(IrisEvent::LockoutTick { seconds_left: 1 });

        assert_eq!(rx.recv().await.unwrap(), IrisEvent::LockoutTick { seconds_left: 2 });
        assert_eq!(rx.recv().await.unwrap(), IrisEvent::LockoutTick { seconds_left: 1 });
    }

    #[test]
    fn test_zero_capacity_is_raised_to_one() {
        assert_eq!(EventBus::new(0).capacity(), 1);
    }

    #[test]
    fn test_events_serialize_with_type_tag() {
        let json = serde_json::to_value(IrisEvent::LockoutTick { seconds_left: 5 }).unwrap();
        assert_eq!(json["type"], "LockoutTick");
        assert_eq!(json["seconds_left"], 5);
    }
}
