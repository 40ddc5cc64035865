//! Error payloads carried by error responses.
//!
//! A handler failure crosses the boundary as a plain value. Failures that
//! carry a category (`type`) and context (`data`) survive the trip intact;
//! anything else is forwarded unchanged and shows up on the requesting side
//! as an unknown error.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::warn;

/// Category sent back when a request names an action with no handler.
pub const UNKNOWN_ACTION: &str = "UNKNOWN_ACTION";

/// Category sent back when a request handler panicked.
pub const HANDLER_PANIC: &str = "HANDLER_PANIC";

/// Error with an application-defined category and machine-readable context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct StructuredError {
    /// Human-readable description
    pub message: String,
    /// Application-defined category, branched on by callers
    #[serde(rename = "type")]
    pub kind: String,
    /// Arbitrary context
    pub data: Value,
}

impl StructuredError {
    pub fn new(message: impl Into<String>, kind: impl Into<String>, data: Value) -> Self {
        Self {
            message: message.into(),
            kind: kind.into(),
            data,
        }
    }

    /// Error reported for a request whose action has no handler.
    pub fn unknown_action(action: &str) -> Self {
        Self::new(
            format!("Unknown action: {}", action),
            UNKNOWN_ACTION,
            json!({ "action": action }),
        )
    }

    /// Error reported for a request whose handler panicked.
    pub fn handler_panic(action: &str) -> Self {
        Self::new(
            format!("Handler for action {} panicked", action),
            HANDLER_PANIC,
            json!({ "action": action }),
        )
    }

    /// Checks the category of this error
    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind == kind
    }
}

/// Failure returned by a request or event handler.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HandlerError {
    /// Failure with a category and context, preserved across the boundary
    #[error(transparent)]
    Structured(#[from] StructuredError),

    /// Any other failure, forwarded as-is
    #[error("{0}")]
    Opaque(Value),
}

impl HandlerError {
    /// Wraps any displayable failure as an opaque error
    pub fn opaque(error: impl std::fmt::Display) -> Self {
        HandlerError::Opaque(Value::String(error.to_string()))
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(error: serde_json::Error) -> Self {
        HandlerError::opaque(error)
    }
}

/// Error produced when an error payload has no recognizable shape.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("unknown error")]
    Unrecognized(Value),
}

/// Turns a handler failure into a transport-safe payload.
///
/// Structured errors emit exactly `message`, `type` and `data`. Opaque
/// errors pass through unchanged.
pub fn encode(error: &HandlerError) -> Value {
    match error {
        HandlerError::Structured(structured) => json!({
            "message": structured.message,
            "type": structured.kind,
            "data": structured.data,
        }),
        HandlerError::Opaque(value) => value.clone(),
    }
}

/// Rebuilds a structured error from an error response payload.
///
/// The payload must be an object with a string `message`, a string `type`
/// and a `data` key (any value, `null` included). Anything else is logged
/// and reported as [`DecodeError::Unrecognized`].
pub fn decode(payload: Value) -> Result<StructuredError, DecodeError> {
    if let Value::Object(fields) = &payload {
        if let (Some(Value::String(message)), Some(Value::String(kind)), Some(data)) =
            (fields.get("message"), fields.get("type"), fields.get("data"))
        {
            return Ok(StructuredError::new(message.clone(), kind.clone(), data.clone()));
        }
    }

    warn!(payload = %payload, "unrecognized error payload");
    Err(DecodeError::Unrecognized(payload))
}
