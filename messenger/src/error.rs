use crate::transport::TransportError;
use ipc::StructuredError;
use lifecycle::CancellationReason;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Ways a messenger call can fail.
#[derive(Debug, Error)]
pub enum MessengerError {
    /// The peer's handler failed with a structured error
    #[error(transparent)]
    Remote(#[from] StructuredError),

    /// The peer reported an error whose payload could not be decoded
    ///
    /// Carries the raw payload as received.
    #[error("unknown error")]
    Unknown(Value),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("request cancelled: {0}")]
    Cancelled(CancellationReason),

    #[error("messenger closed")]
    Closed,

    #[error("action name must not be empty")]
    InvalidAction,

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl MessengerError {
    /// Returns the structured error sent by the peer, if any
    pub fn remote(&self) -> Option<&StructuredError> {
        match self {
            MessengerError::Remote(error) => Some(error),
            _ => None,
        }
    }

    /// Checks whether the peer failed with the given error category
    pub fn is_remote_kind(&self, kind: &str) -> bool {
        self.remote().is_some_and(|error| error.is_kind(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_remote_error_keeps_message() {
        let err = MessengerError::from(StructuredError::new("no such user", "NOT_FOUND", json!(1)));
        assert_eq!(err.to_string(), "no such user");
        assert!(err.is_remote_kind("NOT_FOUND"));
        assert!(!err.is_remote_kind("OTHER"));
    }

    #[test]
    fn test_unknown_is_distinct() {
        let err = MessengerError::Unknown(json!({"stack": "at <anonymous>"}));
        assert_eq!(err.to_string(), "unknown error");
        assert!(matches!(&err, MessengerError::Unknown(payload) if payload["stack"].is_string()));
        assert!(err.remote().is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            MessengerError::Timeout(Duration::from_millis(250)).to_string(),
            "request timed out after 250ms"
        );
        assert_eq!(
            MessengerError::Cancelled(CancellationReason::UserCancel).to_string(),
            "request cancelled: user cancelled"
        );
        assert_eq!(MessengerError::Closed.to_string(), "messenger closed");
    }
}
