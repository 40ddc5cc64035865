//! The message-passing primitive a messenger is layered on.
//!
//! A transport only moves untyped values between endpoints. It offers no
//! correlation and no typed payloads. It is expected to deliver each posted
//! value at most once and to preserve send order between a given pair of
//! endpoints.

use core_types::PeerId;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// A value delivered by the transport, tagged with the endpoint that sent it.
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub source: PeerId,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("no endpoint {0} on this transport")]
    UnknownDestination(PeerId),

    #[error("transport closed")]
    Closed,
}

/// Stream of inbound values. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<Inbound>,
}

impl Subscription {
    pub fn new(receiver: mpsc::UnboundedReceiver<Inbound>) -> Self {
        Self { receiver }
    }

    /// Waits for the next inbound value; `None` once the transport is gone.
    pub async fn recv(&mut self) -> Option<Inbound> {
        self.receiver.recv().await
    }

    /// Returns the next inbound value if one is already queued.
    pub fn try_recv(&mut self) -> Option<Inbound> {
        self.receiver.try_recv().ok()
    }
}

/// Endpoint binding injected into a messenger.
pub trait Transport: Send + Sync + 'static {
    /// Hands `message` to the transport for delivery to `destination`.
    ///
    /// `Ok` means the transport accepted the value, not that anyone
    /// processed it.
    fn post(&self, destination: &PeerId, message: Value) -> Result<(), TransportError>;

    /// Starts receiving every value addressed to this endpoint.
    fn subscribe(&self) -> Subscription;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn post(&self, destination: &PeerId, message: Value) -> Result<(), TransportError> {
        (**self).post(destination, message)
    }

    fn subscribe(&self) -> Subscription {
        (**self).subscribe()
    }
}
