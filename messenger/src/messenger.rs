//! The messenger: request/response and events over a single peer binding.

use crate::config::MessengerConfig;
use crate::error::MessengerError;
use crate::pending::{PendingCalls, PendingGuard};
use crate::registry::{EventHandler, HandlerRegistry, RequestFuture, RequestHandler};
use crate::transport::{Subscription, Transport};
use core_types::PeerId;
use ipc::{
    decode, encode, DecodeError, EventMessage, HandlerError, Message, RequestMessage,
    ResponseMessage, StructuredError,
};
use lifecycle::{CancellationReason, CancellationSource, CancellationToken, Deadline, Timeout};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, warn};

/// Per-call options for [`Messenger::send_request_with`].
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Overrides the configured request timeout
    pub timeout: Option<Timeout>,
    /// Abandons the call when cancelled
    pub cancellation: Option<CancellationToken>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(Timeout::after(timeout));
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

/// State shared between the public handle, the listener task and the
/// request handler tasks.
struct Shared {
    transport: Box<dyn Transport>,
    peer: PeerId,
    config: MessengerConfig,
    requests: HandlerRegistry<RequestHandler>,
    events: HandlerRegistry<EventHandler>,
    pending: PendingCalls,
    closed: AtomicBool,
    shutdown: CancellationSource,
}

/// Bidirectional RPC and event channel to one fixed peer.
///
/// Construction subscribes to the transport once and spawns the listener
/// task that serves the peer's requests, runs event handlers and settles
/// outstanding requests. [`close`](Messenger::close) (or dropping the
/// messenger) detaches it.
///
/// Must be created inside a tokio runtime.
///
/// ## Example
///
/// ```
/// use messenger::{LocalBus, Messenger};
/// use serde_json::{json, Value};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let bus = LocalBus::new();
/// let host = bus.endpoint();
/// let frame = bus.endpoint();
/// let (host_id, frame_id) = (host.id(), frame.id());
///
/// let host = Messenger::new(host, frame_id);
/// let frame = Messenger::new(frame, host_id);
///
/// frame.on_request("double", |payload: Value| async move {
///     Ok(json!(payload.as_i64().unwrap_or_default() * 2))
/// });
///
/// let answer = host.send_request("double", json!(21)).await.unwrap();
/// assert_eq!(answer, json!(42));
/// # }
/// ```
pub struct Messenger {
    shared: Arc<Shared>,
    listener: JoinHandle<()>,
}

impl Messenger {
    /// Binds a messenger to `peer` over `transport` with default settings
    pub fn new<T: Transport>(transport: T, peer: PeerId) -> Self {
        Self::with_config(transport, peer, MessengerConfig::default())
    }

    /// Binds a messenger to `peer` over `transport`
    pub fn with_config<T: Transport>(transport: T, peer: PeerId, config: MessengerConfig) -> Self {
        let subscription = transport.subscribe();
        let shared = Arc::new(Shared {
            transport: Box::new(transport),
            peer,
            config,
            requests: HandlerRegistry::new(),
            events: HandlerRegistry::new(),
            pending: PendingCalls::new(),
            closed: AtomicBool::new(false),
            shutdown: CancellationSource::new(),
        });
        let listener = tokio::spawn(listen(Arc::clone(&shared), subscription));
        debug!(%peer, "messenger bound");

        Self { shared, listener }
    }

    /// The peer this messenger talks to
    pub fn peer(&self) -> PeerId {
        self.shared.peer
    }

    pub fn config(&self) -> &MessengerConfig {
        &self.shared.config
    }

    /// Number of requests still waiting for a response
    pub fn pending_count(&self) -> usize {
        self.shared.pending.len()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Calls `action` on the peer and waits for its result
    ///
    /// Waits at most the configured request timeout, if one is set.
    pub async fn send_request(
        &self,
        action: &str,
        payload: Value,
    ) -> Result<Value, MessengerError> {
        self.send_request_with(action, payload, RequestOptions::default())
            .await
    }

    /// Calls `action` on the peer with per-call timeout and cancellation
    pub async fn send_request_with(
        &self,
        action: &str,
        payload: Value,
        options: RequestOptions,
    ) -> Result<Value, MessengerError> {
        if action.is_empty() {
            return Err(MessengerError::InvalidAction);
        }
        self.ensure_open()?;

        let shared = &self.shared;
        let timeout = options
            .timeout
            .or_else(|| shared.config.request_timeout.map(Timeout::after));
        let deadline = timeout.and_then(|timeout| timeout.to_deadline(Instant::now()));
        let cancellation = options.cancellation.unwrap_or_else(CancellationToken::none);

        // Armed before sending so a fast reply cannot slip past.
        let (id, reply) = shared.pending.register();
        let _guard = PendingGuard::new(&shared.pending, id.clone());

        let request = Message::Request(RequestMessage {
            id: id.clone(),
            action: action.to_string(),
            payload,
        });
        shared.transport.post(&shared.peer, request.to_value())?;
        debug!(%id, action, "request sent");

        let response = tokio::select! {
            biased;
            response = reply => response.map_err(|_| MessengerError::Closed)?,
            reason = cancellation.cancelled() => {
                debug!(%id, action, %reason, "request cancelled");
                return Err(MessengerError::Cancelled(reason));
            }
            _ = expired(deadline) => {
                let waited = timeout.map(|timeout| timeout.duration()).unwrap_or_default();
                warn!(%id, action, ?waited, "request timed out");
                return Err(MessengerError::Timeout(waited));
            }
        };

        settle(response)
    }

    /// Typed variant of [`send_request`](Messenger::send_request)
    pub async fn request<Req, Resp>(
        &self,
        action: &str,
        payload: &Req,
    ) -> Result<Resp, MessengerError>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let payload = serde_json::to_value(payload)?;
        let result = self.send_request(action, payload).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Sends a one-way event to the peer
    ///
    /// Returns once the transport accepted it; the peer never answers.
    pub fn send_event(&self, action: &str, payload: Value) -> Result<(), MessengerError> {
        if action.is_empty() {
            return Err(MessengerError::InvalidAction);
        }
        self.ensure_open()?;

        let event = Message::event(action, payload);
        self.shared.transport.post(&self.shared.peer, event.to_value())?;
        debug!(action, "event sent");
        Ok(())
    }

    /// Registers the handler answering the peer's `action` requests
    ///
    /// Replaces any handler previously registered for `action`.
    pub fn on_request<F, Fut>(&self, action: impl Into<String>, handler: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
    {
        let handler: RequestHandler =
            Arc::new(move |payload: Value| -> RequestFuture { Box::pin(handler(payload)) });
        self.shared.requests.register(action, handler);
    }

    /// Typed variant of [`on_request`](Messenger::on_request)
    ///
    /// A payload that does not deserialize into `Req` fails the request
    /// with an opaque error naming the mismatch.
    pub fn on_typed_request<Req, Resp, F, Fut>(&self, action: impl Into<String>, handler: F)
    where
        Req: DeserializeOwned + 'static,
        Resp: Serialize + Send + 'static,
        F: Fn(Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Resp, HandlerError>> + Send + 'static,
    {
        self.on_request(action, move |payload: Value| {
            run_typed(serde_json::from_value(payload).map(|request| handler(request)))
        });
    }

    /// Registers the handler for the peer's `action` events
    ///
    /// Replaces any handler previously registered for `action`. Failures
    /// are logged and never reported to the peer.
    pub fn on_event<F>(&self, action: impl Into<String>, handler: F)
    where
        F: Fn(Value) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let handler: EventHandler = Arc::new(handler);
        self.shared.events.register(action, handler);
    }

    /// Unregisters the request handler for `action`
    pub fn remove_request_handler(&self, action: &str) -> bool {
        self.shared.requests.remove(action).is_some()
    }

    /// Unregisters the event handler for `action`
    pub fn remove_event_handler(&self, action: &str) -> bool {
        self.shared.events.remove(action).is_some()
    }

    /// Detaches the listener and fails every pending request
    ///
    /// Later sends fail with [`MessengerError::Closed`]. Calling it again
    /// does nothing.
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shared.shutdown.cancel(CancellationReason::SupervisorCancel);
        self.listener.abort();
        let abandoned = self.shared.pending.close_all();
        debug!(peer = %self.shared.peer, abandoned, "messenger closed");
    }

    fn ensure_open(&self) -> Result<(), MessengerError> {
        if self.is_closed() {
            Err(MessengerError::Closed)
        } else {
            Ok(())
        }
    }
}

impl Drop for Messenger {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Messenger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Messenger")
            .field("peer", &self.shared.peer)
            .field("pending", &self.shared.pending.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn settle(response: ResponseMessage) -> Result<Value, MessengerError> {
    if !response.error {
        return Ok(response.payload);
    }
    match decode(response.payload) {
        Ok(error) => Err(MessengerError::Remote(error)),
        Err(DecodeError::Unrecognized(payload)) => Err(MessengerError::Unknown(payload)),
    }
}

async fn run_typed<Resp, Fut>(call: Result<Fut, serde_json::Error>) -> Result<Value, HandlerError>
where
    Resp: Serialize,
    Fut: Future<Output = Result<Resp, HandlerError>>,
{
    let response = call?.await?;
    Ok(serde_json::to_value(response)?)
}

async fn expired(deadline: Option<Deadline>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.instant()).await,
        None => std::future::pending().await,
    }
}

async fn listen(shared: Arc<Shared>, mut subscription: Subscription) {
    let shutdown = shared.shutdown.token();
    loop {
        let inbound = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            inbound = subscription.recv() => match inbound {
                Some(inbound) => inbound,
                None => {
                    debug!(peer = %shared.peer, "transport subscription ended");
                    break;
                }
            },
        };
        // Queued messages are never dispatched once close() has run.
        if shared.is_closed() {
            break;
        }
        if inbound.source != shared.peer {
            continue;
        }
        let Some(message) = Message::from_value(&inbound.data) else {
            if shared.config.log_unhandled_events {
                warn!(data = %inbound.data, "dropping foreign message");
            }
            continue;
        };

        match message {
            Message::Event(event) => shared.dispatch_event(event),
            Message::Request(request) => shared.dispatch_request(request),
            Message::Response(response) => shared.dispatch_response(response),
        }
    }
}

impl Shared {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn dispatch_event(&self, event: EventMessage) {
        let Some(handler) = self.events.get(&event.action) else {
            if self.config.log_unhandled_events {
                warn!(action = %event.action, "no handler for event");
            }
            return;
        };

        match panic::catch_unwind(AssertUnwindSafe(|| handler(event.payload))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => error!(action = %event.action, error = %err, "event handler failed"),
            Err(_) => error!(action = %event.action, "event handler panicked"),
        }
    }

    fn dispatch_request(self: &Arc<Self>, request: RequestMessage) {
        let RequestMessage {
            id,
            action,
            payload,
        } = request;

        let Some(handler) = self.requests.get(&action) else {
            warn!(%id, %action, "request for unknown action");
            let error = HandlerError::from(StructuredError::unknown_action(&action));
            self.reply(Message::response_err(id, encode(&error)));
            return;
        };

        // The handler runs on its own task so a panic surfaces as a
        // JoinError and the listener keeps dispatching while it is suspended.
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            if shared.is_closed() {
                return;
            }
            let outcome = tokio::spawn(async move { handler(payload).await }).await;
            let response = match outcome {
                Ok(Ok(result)) => Message::response_ok(id, result),
                Ok(Err(err)) => {
                    error!(%id, %action, error = %err, "request handler failed");
                    Message::response_err(id, encode(&err))
                }
                Err(join_error) => {
                    error!(%id, %action, error = %join_error, "request handler aborted");
                    let err = HandlerError::from(StructuredError::handler_panic(&action));
                    Message::response_err(id, encode(&err))
                }
            };
            shared.reply(response);
        });
    }

    fn dispatch_response(&self, response: ResponseMessage) {
        let id = response.id.clone();
        if !self.pending.dispatch(response) {
            debug!(%id, "response for no pending request");
        }
    }

    fn reply(&self, response: Message) {
        if self.is_closed() {
            return;
        }
        if let Err(err) = self.transport.post(&self.peer, response.to_value()) {
            error!(peer = %self.peer, error = %err, "failed to send response");
        }
    }
}
