//! Chat WebSocket wire protocol.
//!
//! Every frame is a JSON text message `{"event": <name>, "data": <payload>}`.

use crewrelay_core::{AgentId, RelayEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Raw inbound frame before dispatch on the event name
#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Value,
}

/// `chat_message` payload
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    /// Agent wire name, e.g. "QA Tester"
    pub role: String,
    /// Text for the agent
    pub message: String,
}

/// Inbound events
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Direct message to one agent
    ChatMessage(ChatMessage),
    /// Review request; the payload is not inspected
    ReviewDocument(Value),
}

/// Why an inbound frame could not be understood
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Invalid message format: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Invalid {event} payload: {source}")]
    InvalidPayload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ClientEvent {
    /// Parse a text frame
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope = serde_json::from_str(text).map_err(ProtocolError::Malformed)?;

        match envelope.event.as_str() {
            "chat_message" => serde_json::from_value(envelope.data)
                .map(ClientEvent::ChatMessage)
                .map_err(|source| ProtocolError::InvalidPayload {
                    event: envelope.event,
                    source,
                }),
            "review_document" => Ok(ClientEvent::ReviewDocument(envelope.data)),
            _ => Err(ProtocolError::UnknownEvent(envelope.event)),
        }
    }
}

/// Outbound events
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Sent once after the upgrade
    Connected { connection_id: Uuid },
    /// Agent reply to a `chat_message`
    ChatResponse { role: AgentId, response: String },
    /// Result of a `review_document`
    ReviewComplete { status: String, feedback: String },
    /// Any failure
    Error { message: String },
}

impl ServerEvent {
    /// Successful review result
    pub fn review_complete(feedback: String) -> Self {
        Self::ReviewComplete {
            status: "success".to_string(),
            feedback,
        }
    }

    /// Error event with the given text
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Bus copy of this event, tagged with its connection.
    ///
    /// `connected` is per-connection and never broadcast.
    pub fn to_relay_event(&self, connection_id: Uuid) -> Option<RelayEvent> {
        match self {
            Self::Connected { .. } => None,
            Self::ChatResponse { role, response } => Some(RelayEvent::ChatResponse {
                connection_id,
                role: *role,
                response: response.clone(),
            }),
            Self::ReviewComplete { status, feedback } => Some(RelayEvent::ReviewComplete {
                connection_id,
                status: status.clone(),
                feedback: feedback.clone(),
            }),
            Self::Error { message } => Some(RelayEvent::Error {
                connection_id,
                message: message.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_message_deserialization() {
        let text = r#"{"event":"chat_message","data":{"role":"QA Tester","message":"ping"}}"#;
        match ClientEvent::parse(text).unwrap() {
            ClientEvent::ChatMessage(msg) => {
                assert_eq!(msg.role, "QA Tester");
                assert_eq!(msg.message, "ping");
            }
            other => panic!("expected ChatMessage, got {:?}", other),
        }
    }

    #[test]
    fn test_review_document_without_data_is_null() {
        let event = ClientEvent::parse(r#"{"event":"review_document"}"#).unwrap();
        assert!(matches!(event, ClientEvent::ReviewDocument(Value::Null)));

        let text = r#"{"event":"review_document","data":{"title":"RFC","sections":[1,2]}}"#;
        match ClientEvent::parse(text).unwrap() {
            ClientEvent::ReviewDocument(data) => assert_eq!(data["title"], "RFC"),
            other => panic!("expected ReviewDocument, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            ClientEvent::parse("not json"),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            ClientEvent::parse(r#"{"event":"dance","data":{}}"#),
            Err(ProtocolError::UnknownEvent(ref e)) if e == "dance"
        ));

        let err = ClientEvent::parse(r#"{"event":"chat_message","data":{"role":"QA Tester"}}"#)
            .unwrap_err();
        assert!(err.to_string().starts_with("Invalid chat_message payload"));
    }

    #[test]
    fn test_server_event_serialization() {
        let value = serde_json::to_value(ServerEvent::ChatResponse {
            role: AgentId::BackendDeveloper,
            response: "done".to_string(),
        })
        .unwrap();
        assert_eq!(
            value,
            json!({"event": "chat_response", "data": {"role": "Backend Developer", "response": "done"}})
        );

        let value = serde_json::to_value(ServerEvent::review_complete("ok".to_string())).unwrap();
        assert_eq!(
            value,
            json!({"event": "review_complete", "data": {"status": "success", "feedback": "ok"}})
        );

        let value = serde_json::to_value(ServerEvent::error("Agent not found: DevOps")).unwrap();
        assert_eq!(value["event"], "error");
        assert_eq!(value["data"]["message"], "Agent not found: DevOps");
    }

    #[test]
    fn test_connected_is_not_broadcast() {
        let id = Uuid::new_v4();
        assert!(ServerEvent::Connected { connection_id: id }
            .to_relay_event(id)
            .is_none());
        let relayed = ServerEvent::error("x").to_relay_event(id).unwrap();
        assert_eq!(relayed.connection_id(), id);
    }
}
