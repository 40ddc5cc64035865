//! # Messenger Contract Tests
//!
//! This crate provides "golden" tests for the messenger protocol to ensure
//! it doesn't drift accidentally over time.
//!
//! ## Philosophy
//!
//! - **Explicit over implicit**: The wire format is written down as literal JSON
//! - **Testability first**: Contract tests fail when the protocol or its guarantees change
//! - **Both sides of the wire**: Behavior is checked through real and hand-driven peers
//!
//! ## Structure
//!
//! - [`wire`]: exact message shapes as they appear on the transport
//! - [`properties`]: end-to-end guarantees of request, event and error handling

pub mod properties;
pub mod wire;

/// Common helpers for driving messengers in tests
pub mod test_helpers {
    use core_types::PeerId;
    use messenger::{BusEndpoint, LocalBus, Messenger, MessengerConfig, Subscription, Transport};
    use serde_json::Value;

    /// Installs a test-friendly tracing subscriber, honoring `RUST_LOG`
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    /// Two messengers bound to each other over a fresh bus
    pub fn messenger_pair() -> (Messenger, Messenger) {
        init_tracing();
        let bus = LocalBus::new();
        let a = bus.endpoint();
        let b = bus.endpoint();
        let (a_id, b_id) = (a.id(), b.id());
        (Messenger::new(a, b_id), Messenger::new(b, a_id))
    }

    /// A messenger whose peer is a bare endpoint driven by the test
    pub struct RawPeer {
        pub bus: LocalBus,
        pub messenger: Messenger,
        /// Id of the messenger's own endpoint
        pub local: PeerId,
        /// The peer endpoint the messenger is bound to
        pub raw: BusEndpoint,
        /// Everything the messenger sends to its peer
        pub inbox: Subscription,
    }

    impl RawPeer {
        pub fn new() -> Self {
            Self::with_config(MessengerConfig::default())
        }

        pub fn with_config(config: MessengerConfig) -> Self {
            init_tracing();
            let bus = LocalBus::new();
            let local = bus.endpoint();
            let raw = bus.endpoint();
            let inbox = raw.subscribe();
            let local_id = local.id();
            let messenger = Messenger::with_config(local, raw.id(), config);
            Self {
                bus,
                messenger,
                local: local_id,
                raw,
                inbox,
            }
        }

        /// Posts a raw value to the messenger as its bound peer
        pub fn post(&self, value: Value) {
            self.raw
                .post(&self.local, value)
                .expect("messenger endpoint should be attached");
        }

        /// Waits for the next value the messenger sends
        pub async fn next(&mut self) -> Value {
            self.inbox
                .recv()
                .await
                .expect("transport should stay open")
                .data
        }

        /// Lets spawned tasks run, then returns everything sent so far
        pub async fn drain(&mut self) -> Vec<Value> {
            settle().await;
            let mut sent = Vec::new();
            while let Some(inbound) = self.inbox.try_recv() {
                sent.push(inbound.data);
            }
            sent
        }
    }

    impl Default for RawPeer {
        fn default() -> Self {
            Self::new()
        }
    }

    /// Gives the listener and handler tasks a chance to run to completion
    pub async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }
}
