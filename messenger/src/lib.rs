//! # Messenger
//!
//! Request/response calls and one-way events between two isolated contexts
//! that can only exchange untyped values through a fire-and-forget
//! transport, such as an embedded frame and its host page.
//!
//! ## Philosophy
//!
//! - **Correlation is ours**: The transport knows nothing about requests; ids and waiters live here
//! - **Every request is answered**: Unknown actions and failing handlers still produce a response
//! - **One peer per messenger**: Traffic from any other endpoint is ignored
//! - **Nothing hangs silently**: Timeouts, cancellation and `close` all release waiting callers
//!
//! ## Architecture
//!
//! - [`Messenger`]: the public handle; sends requests and events, registers handlers
//! - [`Transport`]: the injected endpoint binding; [`LocalBus`] is the in-process one
//! - [`HandlerRegistry`]: one handler per action, last registration wins
//! - [`PendingCalls`]: the correlation table of outstanding requests

pub mod bus;
pub mod config;
pub mod error;
pub mod messenger;
pub mod pending;
pub mod registry;
pub mod transport;

pub use bus::{BusEndpoint, LocalBus};
pub use config::{ConfigError, MessengerConfig};
pub use error::MessengerError;
pub use messenger::{Messenger, RequestOptions};
pub use pending::PendingCalls;
pub use registry::{EventHandler, HandlerRegistry, RequestFuture, RequestHandler};
pub use transport::{Inbound, Subscription, Transport, TransportError};

pub use ipc::{HandlerError, StructuredError};
pub use lifecycle::{CancellationReason, CancellationSource, CancellationToken, Timeout};
