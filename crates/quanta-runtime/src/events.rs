//! Per-session fan-out of newly persisted entities.
//!
//! Each session gets its own broadcast channel, created on first subscribe.
//! Publishing never fails: with no subscriber the event is simply dropped.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use quanta_core::{Message, ProgressStep, ResearchResult, Session};

const DEFAULT_CAPACITY: usize = 128;

/// Something that happened inside a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    MessageCreated { message: Message },
    ResultCreated { result: ResearchResult },
    ProgressUpdated { progress: ProgressStep },
    SessionUpdated { session: Session },
}

impl SessionEvent {
    pub fn session_id(&self) -> &str {
        match self {
            SessionEvent::MessageCreated { message } => &message.session_id,
            SessionEvent::ResultCreated { result } => &result.session_id,
            SessionEvent::ProgressUpdated { progress } => &progress.session_id,
            SessionEvent::SessionUpdated { session } => &session.id,
        }
    }
}

/// Registry of per-session broadcast channels.
#[derive(Debug)]
pub struct EventHub {
    channels: RwLock<HashMap<String, broadcast::Sender<SessionEvent>>>,
    capacity: usize,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events a slow subscriber may lag behind before it starts losing them.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn subscribe(&self, session_id: &str) -> broadcast::Receiver<SessionEvent> {
        self.channels
            .write()
            .entry(session_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Deliver an event to the session's current subscribers.
    ///
    /// Returns how many subscribers received it. A channel whose last
    /// subscriber is gone is dropped.
    pub fn publish(&self, session_id: &str, event: SessionEvent) -> usize {
        let delivered = match self.channels.read().get(session_id) {
            Some(sender) => sender.send(event).unwrap_or(0),
            None => return 0,
        };

        if delivered == 0 {
            let mut channels = self.channels.write();
            if channels
                .get(session_id)
                .is_some_and(|sender| sender.receiver_count() == 0)
            {
                channels.remove(session_id);
            }
        }
        delivered
    }

    pub fn subscriber_count(&self, session_id: &str) -> usize {
        self.channels
            .read()
            .get(session_id)
            .map_or(0, |sender| sender.receiver_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quanta_core::{NewMessage, NewSession};

    fn message(session_id: &str, content: &str) -> SessionEvent {
        SessionEvent::MessageCreated {
            message: Message::from_draft("m1", NewMessage::user(session_id, content)),
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let hub = EventHub::new();
        assert_eq!(hub.publish("s1", message("s1", "hi")), 0);
    }

    #[tokio::test]
    async fn test_subscriber_receives_in_order() {
        let hub = EventHub::new();
        let mut rx = hub.subscribe("s1");

        hub.publish("s1", message("s1", "first"));
        hub.publish("s1", message("s1", "second"));

        match rx.recv().await.unwrap() {
            SessionEvent::MessageCreated { message } => assert_eq!(message.content, "first"),
            other => panic!("unexpected {:?}", other),
        }
        match rx.recv().await.unwrap() {
            SessionEvent::MessageCreated { message } => assert_eq!(message.content, "second"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let hub = EventHub::new();
        let mut rx = hub.subscribe("s1");
        assert_eq!(hub.publish("s2", message("s2", "elsewhere")), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_dropped_after_last_subscriber() {
        let hub = EventHub::new();
        let rx = hub.subscribe("s1");
        assert_eq!(hub.subscriber_count("s1"), 1);
        drop(rx);
        assert_eq!(hub.publish("s1", message("s1", "late")), 0);
        assert_eq!(hub.subscriber_count("s1"), 0);
    }

    #[test]
    fn test_event_wire_shape() {
        let event = SessionEvent::SessionUpdated {
            session: Session::from_draft("s1", NewSession::titled("Optics")),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "session_updated");
        assert_eq!(json["session"]["id"], "s1");
        assert_eq!(event.session_id(), "s1");
    }
}
