//! Correlation table for outstanding requests.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use ipc::{MessageId, ResponseMessage};
use tokio::sync::oneshot;
use tracing::debug;

/// Outstanding requests keyed by correlation id.
///
/// Each entry is settled at most once: the first matching response removes
/// it. A waiter whose entry disappears without a response observes a
/// closed channel.
pub struct PendingCalls {
    pending: DashMap<MessageId, oneshot::Sender<ResponseMessage>>,
}

impl PendingCalls {
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
        }
    }

    /// Arms a waiter under a fresh, unused correlation id.
    pub fn register(&self) -> (MessageId, oneshot::Receiver<ResponseMessage>) {
        loop {
            let id = MessageId::new();
            if let Entry::Vacant(slot) = self.pending.entry(id.clone()) {
                let (sender, receiver) = oneshot::channel();
                slot.insert(sender);
                return (id, receiver);
            }
        }
    }

    /// Hands a response to the waiter with the same id.
    ///
    /// Returns `false` if nothing is waiting on that id (already settled,
    /// abandoned, or never ours).
    pub fn dispatch(&self, response: ResponseMessage) -> bool {
        match self.pending.remove(&response.id) {
            Some((id, sender)) => {
                if sender.send(response).is_err() {
                    debug!(%id, "waiter gone before response");
                }
                true
            }
            None => false,
        }
    }

    /// Forgets a waiter without settling it.
    pub fn remove(&self, id: &MessageId) -> bool {
        self.pending.remove(id).is_some()
    }

    /// Drops every waiter; each observes a closed channel.
    pub fn close_all(&self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.pending.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Default for PendingCalls {
    fn default() -> Self {
        Self::new()
    }
}

/// Removes its id from the table when dropped, whatever path the call took.
pub(crate) struct PendingGuard<'a> {
    calls: &'a PendingCalls,
    id: MessageId,
}

impl<'a> PendingGuard<'a> {
    pub(crate) fn new(calls: &'a PendingCalls, id: MessageId) -> Self {
        Self { calls, id }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.calls.remove(&self.id);
    }
}
