//! In-process transport connecting any number of endpoints.

use crate::transport::{Inbound, Subscription, Transport, TransportError};
use core_types::PeerId;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::trace;

type Subscribers = Vec<mpsc::UnboundedSender<Inbound>>;

/// A shared hub standing in for a window-to-window message channel.
///
/// Every endpoint created from the same bus can post to every other one.
/// Values posted to an endpoint reach all of its live subscriptions, in
/// send order.
///
/// ## Example
///
/// ```
/// use messenger::{LocalBus, Transport};
/// use serde_json::json;
///
/// let bus = LocalBus::new();
/// let host = bus.endpoint();
/// let frame = bus.endpoint();
///
/// let mut inbox = frame.subscribe();
/// host.post(&frame.id(), json!("hello")).unwrap();
///
/// let inbound = inbox.try_recv().unwrap();
/// assert_eq!(inbound.source, host.id());
/// assert_eq!(inbound.data, json!("hello"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct LocalBus {
    endpoints: Arc<DashMap<PeerId, Subscribers>>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an endpoint with a fresh id.
    pub fn endpoint(&self) -> BusEndpoint {
        let id = PeerId::new();
        self.endpoints.insert(id, Vec::new());
        BusEndpoint {
            id,
            bus: self.clone(),
        }
    }

    /// Number of endpoints currently attached.
    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    fn deliver(
        &self,
        source: PeerId,
        destination: &PeerId,
        data: Value,
    ) -> Result<(), TransportError> {
        let mut subscribers = self
            .endpoints
            .get_mut(destination)
            .ok_or(TransportError::UnknownDestination(*destination))?;

        subscribers.retain(|subscriber| {
            subscriber
                .send(Inbound {
                    source,
                    data: data.clone(),
                })
                .is_ok()
        });
        trace!(%source, %destination, subscribers = subscribers.len(), "delivered");
        Ok(())
    }

    fn subscribe(&self, id: &PeerId) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        if let Some(mut subscribers) = self.endpoints.get_mut(id) {
            subscribers.push(sender);
        }
        Subscription::new(receiver)
    }
}

/// One endpoint on a [`LocalBus`]. Dropping it detaches it from the bus.
#[derive(Debug)]
pub struct BusEndpoint {
    id: PeerId,
    bus: LocalBus,
}

impl BusEndpoint {
    pub fn id(&self) -> PeerId {
        self.id
    }
}

impl Transport for BusEndpoint {
    fn post(&self, destination: &PeerId, message: Value) -> Result<(), TransportError> {
        self.bus.deliver(self.id, destination, message)
    }

    fn subscribe(&self) -> Subscription {
        self.bus.subscribe(&self.id)
    }
}

impl Drop for BusEndpoint {
    fn drop(&mut self) {
        self.bus.endpoints.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_post_to_unknown_destination() {
        let bus = LocalBus::new();
        let endpoint = bus.endpoint();
        let stranger = PeerId::new();

        let result = endpoint.post(&stranger, json!(1));
        assert_eq!(result, Err(TransportError::UnknownDestination(stranger)));
    }

    #[test]
    fn test_delivery_preserves_order() {
        let bus = LocalBus::new();
        let a = bus.endpoint();
        let b = bus.endpoint();
        let mut inbox = b.subscribe();

        for i in 0..5 {
            a.post(&b.id(), json!(i)).unwrap();
        }

        for i in 0..5 {
            assert_eq!(inbox.try_recv().unwrap().data, json!(i));
        }
        assert!(inbox.try_recv().is_none());
    }

    #[test]
    fn test_every_subscription_gets_a_copy() {
        let bus = LocalBus::new();
        let a = bus.endpoint();
        let b = bus.endpoint();
        let mut first = b.subscribe();
        let mut second = b.subscribe();

        a.post(&b.id(), json!("x")).unwrap();

        assert_eq!(first.try_recv().unwrap().data, json!("x"));
        assert_eq!(second.try_recv().unwrap().data, json!("x"));
    }

    #[test]
    fn test_posting_without_subscribers_is_accepted() {
        let bus = LocalBus::new();
        let a = bus.endpoint();
        let b = bus.endpoint();
        assert!(a.post(&b.id(), json!(null)).is_ok());
    }

    #[test]
    fn test_dropped_subscription_is_pruned() {
        let bus = LocalBus::new();
        let a = bus.endpoint();
        let b = bus.endpoint();
        let dropped = b.subscribe();
        let mut kept = b.subscribe();
        drop(dropped);

        a.post(&b.id(), json!(1)).unwrap();
        assert_eq!(kept.try_recv().unwrap().data, json!(1));
        assert_eq!(bus.endpoints.get(&b.id()).unwrap().len(), 1);
    }

    #[test]
    fn test_dropped_endpoint_detaches() {
        let bus = LocalBus::new();
        let a = bus.endpoint();
        let b = bus.endpoint();
        let b_id = b.id();
        assert_eq!(bus.endpoint_count(), 2);

        drop(b);
        assert_eq!(bus.endpoint_count(), 1);
        assert!(a.post(&b_id, json!(1)).is_err());
    }

    #[tokio::test]
    async fn test_shared_endpoint_through_arc() {
        let bus = LocalBus::new();
        let a = Arc::new(bus.endpoint());
        let b = bus.endpoint();
        let mut inbox = b.subscribe();

        let shared: Arc<BusEndpoint> = Arc::clone(&a);
        shared.post(&b.id(), json!("via arc")).unwrap();

        let inbound = inbox.recv().await.unwrap();
        assert_eq!(inbound.source, a.id());
    }
}
