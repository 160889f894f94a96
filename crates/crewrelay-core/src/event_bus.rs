//! EventBus - broadcast of every outbound relay event.
//!
//! Connections reply to their own client directly; everything they send is
//! also published here so `/ws/events` observers see all traffic.

use crate::agents::AgentId;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Outbound events, in the same `{"event", "data"}` envelope clients see.
///
/// Carries only what was already sent to the originating client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum RelayEvent {
    /// An agent answered a chat message
    ChatResponse {
        /// Originating connection
        connection_id: Uuid,
        /// Agent that answered
        role: AgentId,
        /// Generated reply
        response: String,
    },
    /// A review finished
    ReviewComplete {
        /// Originating connection
        connection_id: Uuid,
        /// Always "success"
        status: String,
        /// Review feedback
        feedback: String,
    },
    /// A request failed
    Error {
        /// Originating connection
        connection_id: Uuid,
        /// Sanitized error text
        message: String,
    },
}

impl RelayEvent {
    /// Connection that produced the event
    #[must_use]
    pub fn connection_id(&self) -> Uuid {
        match self {
            Self::ChatResponse { connection_id, .. }
            | Self::ReviewComplete { connection_id, .. }
            | Self::Error { connection_id, .. } => *connection_id,
        }
    }
}

/// Broadcast-based relay event bus.
///
/// Slow subscribers lag and miss events rather than blocking publishers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<RelayEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to all future events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RelayEvent> {
        self.sender.subscribe()
    }

    /// Publish to every subscriber, returning how many received it.
    pub fn publish(&self, event: RelayEvent) -> usize {
        // no receivers is not an error
        self.sender.send(event).unwrap_or(0)
    }

    /// Current number of subscribers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
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

    fn chat(connection_id: Uuid, response: &str) -> RelayEvent {
        RelayEvent::ChatResponse {
            connection_id,
            role: AgentId::QaTester,
            response: response.to_string(),
        }
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        let id = Uuid::new_v4();
        assert_eq!(bus.publish(chat(id, "hi")), 2);

        assert_eq!(rx1.recv().await.unwrap().connection_id(), id);
        assert_eq!(rx2.recv().await.unwrap().connection_id(), id);
    }

    #[test]
    fn test_publish_no_subscribers() {
        let bus = EventBus::default();
        assert_eq!(bus.publish(chat(Uuid::nil(), "dropped")), 0);
    }

    #[tokio::test]
    async fn test_event_ordering() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let id = Uuid::new_v4();

        bus.publish(chat(id, "first"));
        bus.publish(RelayEvent::Error {
            connection_id: id,
            message: "second".to_string(),
        });

        match rx.recv().await.unwrap() {
            RelayEvent::ChatResponse { response, .. } => assert_eq!(response, "first"),
            other => panic!("expected ChatResponse, got: {:?}", other),
        }
        assert!(matches!(rx.recv().await.unwrap(), RelayEvent::Error { .. }));
    }

    #[test]
    fn test_envelope_serialization() {
        let event = RelayEvent::ReviewComplete {
            connection_id: Uuid::nil(),
            status: "success".to_string(),
            feedback: "ok".to_string(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "review_complete");
        assert_eq!(value["data"]["status"], "success");
        assert_eq!(value["data"]["feedback"], "ok");

        let value = serde_json::to_value(chat(Uuid::nil(), "x")).unwrap();
        assert_eq!(value["event"], "chat_response");
        assert_eq!(value["data"]["role"], "QA Tester");
    }
}
