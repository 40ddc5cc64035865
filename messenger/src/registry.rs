//! Action-keyed handler registries.

use dashmap::DashMap;
use ipc::HandlerError;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Future returned by a request handler.
pub type RequestFuture = Pin<Box<dyn Future<Output = Result<Value, HandlerError>> + Send>>;

/// Type-erased request handler.
pub type RequestHandler = Arc<dyn Fn(Value) -> RequestFuture + Send + Sync>;

/// Type-erased event handler.
pub type EventHandler = Arc<dyn Fn(Value) -> Result<(), HandlerError> + Send + Sync>;

/// Maps an action name to a single handler.
///
/// Registering an action that already has a handler replaces it. There is
/// never more than one handler per action.
pub struct HandlerRegistry<H> {
    handlers: DashMap<String, H>,
}

impl<H: Clone> HandlerRegistry<H> {
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
        }
    }

    /// Registers `handler` for `action`, returning the handler it replaced.
    pub fn register(&self, action: impl Into<String>, handler: H) -> Option<H> {
        self.handlers.insert(action.into(), handler)
    }

    /// Removes the handler for `action`.
    pub fn remove(&self, action: &str) -> Option<H> {
        self.handlers.remove(action).map(|(_, handler)| handler)
    }

    /// Looks up the handler for `action`.
    ///
    /// The handler is cloned out so no registry lock is held while it runs.
    pub fn get(&self, action: &str) -> Option<H> {
        self.handlers.get(action).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, action: &str) -> bool {
        self.handlers.contains_key(action)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<H: Clone> Default for HandlerRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}
