//! Messenger configuration.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Duration;
use thiserror::Error;

/// Tunables for a [`Messenger`](crate::Messenger).
///
/// Loaded from JSON as `{"request_timeout_ms": 5000, "log_unhandled_events": true}`;
/// both keys are optional.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MessengerConfig {
    /// Default bound on how long a request waits for its response.
    ///
    /// `None` waits forever; a lost response then leaves the caller pending
    /// until the messenger is closed.
    #[serde(rename = "request_timeout_ms", with = "millis")]
    pub request_timeout: Option<Duration>,

    /// Log events that arrive for actions with no handler
    pub log_unhandled_events: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid messenger config: {0}")]
    Invalid(#[from] serde_json::Error),
}

impl MessengerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_unhandled_event_logging(mut self, enabled: bool) -> Self {
        self.log_unhandled_events = enabled;
        self
    }
}

mod millis {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value
            .map(|duration| u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
