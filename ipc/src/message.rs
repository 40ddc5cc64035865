//! Wire messages exchanged between two messengers

use core_types::new_uuid;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use uuid::Uuid;

/// Discriminant of a request message.
pub const REQUEST_TYPE: &str = "REQUEST";

/// Discriminant of a response message.
pub const RESPONSE_TYPE: &str = "RESPONSE";

/// Discriminant of an event message.
pub const EVENT_TYPE: &str = "EVENT";

/// Correlation identifier linking a request to its response
///
/// Locally generated ids are random v4 UUIDs. Ids received from a peer are
/// kept verbatim, whatever string the peer chose.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Creates a new random message ID
    pub fn new() -> Self {
        Self::from_uuid(new_uuid())
    }

    /// Creates a message ID from a UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid.hyphenated().to_string())
    }

    /// Returns the id as it appears on the wire
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for MessageId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for MessageId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Msg({})", self.0)
    }
}

/// A call awaiting exactly one response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestMessage {
    pub id: MessageId,
    pub action: String,
    #[serde(default)]
    pub payload: Value,
}

/// The single answer to a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage {
    /// Id of the request being answered
    pub id: MessageId,
    /// Handler result, or the encoded error when `error` is set
    #[serde(default)]
    pub payload: Value,
    pub error: bool,
}

/// A one-way notification, never answered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMessage {
    pub action: String,
    #[serde(default)]
    pub payload: Value,
}

/// Any message understood by a messenger, tagged by its `type` field
///
/// A missing `payload` key is read as `null`. Unknown extra keys are
/// ignored, but the discriminant and the required fields must be exact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    #[serde(rename = "REQUEST")]
    Request(RequestMessage),
    #[serde(rename = "RESPONSE")]
    Response(ResponseMessage),
    #[serde(rename = "EVENT")]
    Event(EventMessage),
}

impl Message {
    /// Builds a request under a fresh correlation id
    pub fn request(action: impl Into<String>, payload: Value) -> Self {
        Message::Request(RequestMessage {
            id: MessageId::new(),
            action: action.into(),
            payload,
        })
    }

    /// Builds a successful response to `id`
    pub fn response_ok(id: MessageId, payload: Value) -> Self {
        Message::Response(ResponseMessage {
            id,
            payload,
            error: false,
        })
    }

    /// Builds an error response to `id`; `payload` is an encoded error
    pub fn response_err(id: MessageId, payload: Value) -> Self {
        Message::Response(ResponseMessage {
            id,
            payload,
            error: true,
        })
    }

    /// Builds an event
    pub fn event(action: impl Into<String>, payload: Value) -> Self {
        Message::Event(EventMessage {
            action: action.into(),
            payload,
        })
    }

    /// Parses an untyped inbound value
    ///
    /// Returns `None` for anything that is not exactly one of the three
    /// message shapes. Never panics, whatever the input.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        Message::deserialize(value).ok()
    }

    /// Renders the message in its wire form
    pub fn to_value(&self) -> Value {
        match self {
            Message::Request(request) => json!({
                "id": request.id,
                "type": REQUEST_TYPE,
                "action": request.action,
                "payload": request.payload,
            }),
            Message::Response(response) => json!({
                "id": response.id,
                "type": RESPONSE_TYPE,
                "payload": response.payload,
                "error": response.error,
            }),
            Message::Event(event) => json!({
                "type": EVENT_TYPE,
                "action": event.action,
                "payload": event.payload,
            }),
        }
    }

    /// Returns the correlation id, if this kind carries one
    pub fn id(&self) -> Option<&MessageId> {
        match self {
            Message::Request(request) => Some(&request.id),
            Message::Response(response) => Some(&response.id),
            Message::Event(_) => None,
        }
    }
}

/// Checks whether `value` is a well-formed request
pub fn is_request_message(value: &Value) -> bool {
    matches!(Message::from_value(value), Some(Message::Request(_)))
}

/// Checks whether `value` is a well-formed response
pub fn is_response_message(value: &Value) -> bool {
    matches!(Message::from_value(value), Some(Message::Response(_)))
}

/// Checks whether `value` is a well-formed event
pub fn is_event_message(value: &Value) -> bool {
    matches!(Message::from_value(value), Some(Message::Event(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_id_creation() {
        let id1 = MessageId::new();
        let id2 = MessageId::new();
        assert_ne!(id1, id2);
        assert_eq!(id1.as_str().len(), 36);
    }

    #[test]
    fn test_message_id_from_uuid() {
        let uuid = Uuid::new_v4();
        let id = MessageId::from_uuid(uuid);
        assert_eq!(id.as_str(), uuid.to_string());
        assert!(format!("{}", id).starts_with("Msg("));
    }

    #[test]
    fn test_request_wire_shape() {
        let message = Message::request("dashboard.load", json!({"page": 2}));
        let value = message.to_value();

        assert_eq!(value["type"], "REQUEST");
        assert_eq!(value["action"], "dashboard.load");
        assert_eq!(value["payload"], json!({"page": 2}));
        assert!(value["id"].is_string());
        assert!(is_request_message(&value));
        assert!(!is_response_message(&value));
        assert!(!is_event_message(&value));
    }

    #[test]
    fn test_response_wire_shape() {
        let id = MessageId::from("abc");
        let value = Message::response_err(id.clone(), json!("boom")).to_value();

        assert_eq!(
            value,
            json!({"id": "abc", "type": "RESPONSE", "payload": "boom", "error": true})
        );
        match Message::from_value(&value) {
            Some(Message::Response(response)) => {
                assert_eq!(response.id, id);
                assert!(response.error);
            }
            other => panic!("Expected response, got {:?}", other),
        }
    }

    #[test]
    fn test_event_has_no_id() {
        let value = Message::event("tick", Value::Null).to_value();
        assert!(value.get("id").is_none());
        assert!(is_event_message(&value));
        assert_eq!(Message::from_value(&value).unwrap().id(), None);
    }

    #[test]
    fn test_missing_payload_reads_as_null() {
        let value = json!({"type": "EVENT", "action": "tick"});
        match Message::from_value(&value) {
            Some(Message::Event(event)) => assert_eq!(event.payload, Value::Null),
            other => panic!("Expected event, got {:?}", other),
        }
    }

    #[test]
    fn test_foreign_values_rejected() {
        let foreign = [
            Value::Null,
            json!(42),
            json!("REQUEST"),
            json!([1, 2, 3]),
            json!({}),
            json!({"type": "request", "id": "1", "action": "a", "payload": 1}),
            json!({"type": "REQUEST", "action": "a", "payload": 1}),
            json!({"type": "REQUEST", "id": 7, "action": "a", "payload": 1}),
            json!({"type": "RESPONSE", "id": "1", "payload": 1}),
            json!({"type": "RESPONSE", "id": "1", "payload": 1, "error": "yes"}),
            json!({"type": "EVENT", "payload": 1}),
            json!({"type": "EVENT", "action": null}),
            json!({"source": "react-devtools", "payload": {"event": "init"}}),
        ];

        for value in &foreign {
            assert!(Message::from_value(value).is_none(), "accepted {}", value);
            assert!(!is_request_message(value));
            assert!(!is_response_message(value));
            assert!(!is_event_message(value));
        }
    }

    #[test]
    fn test_extra_fields_tolerated() {
        let value = json!({"type": "EVENT", "action": "tick", "payload": 1, "origin": "*"});
        assert!(is_event_message(&value));
    }
}
