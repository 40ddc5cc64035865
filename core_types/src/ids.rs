//! Unique identifiers for transport endpoints

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::uuid_tools::new_uuid;

/// Unique identifier for a transport endpoint
///
/// A peer is whatever sits on the other side of a transport: an embedded
/// frame, its host page, a worker. Every inbound message carries the id of
/// the endpoint that sent it, and every outbound message names the id it is
/// addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerId(Uuid);

impl PeerId {
    /// Creates a new random peer ID
    pub fn new() -> Self {
        Self(new_uuid())
    }

    /// Creates a peer ID from a UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for PeerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Peer({})", self.0)
    }
}
