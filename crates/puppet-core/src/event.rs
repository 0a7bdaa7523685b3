//! Events a puppet emits towards its host.
//!
//! Puppets own an [`EventEmitter`]; hosts call [`EventEmitter::subscribe`]
//! (usually through [`Puppet::subscribe`](crate::Puppet::subscribe)) to
//! receive a copy of every event emitted after subscription.

use tokio::sync::broadcast;

/// Default buffer size of the event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Event emitted by a puppet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PuppetEvent {
    /// The account finished logging in.
    Login {
        /// The bot's own contact id.
        contact_id: String,
    },
    /// The account left an online session.
    Logout {
        /// The bot's own contact id.
        contact_id: String,
        /// Why the session ended.
        reason: String,
    },
    /// A message arrived and its raw payload is cached.
    Message {
        /// Id to pass to `message_raw_payload`.
        message_id: String,
    },
    /// Reply to a `ding`.
    Dong {
        /// The data passed to `ding`.
        data: String,
    },
    /// A non-fatal error worth surfacing to the host.
    Error {
        /// Human-readable description.
        message: String,
    },
}

impl PuppetEvent {
    /// Returns the event name as used by hosts and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Login { .. } => "login",
            Self::Logout { .. } => "logout",
            Self::Message { .. } => "message",
            Self::Dong { .. } => "dong",
            Self::Error { .. } => "error",
        }
    }
}

/// Broadcasting side of a puppet's event stream.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    tx: broadcast::Sender<PuppetEvent>,
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventEmitter {
    /// Creates an emitter buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emits an event, returning how many subscribers received it.
    ///
    /// Emitting with no subscribers is not an error; the event is dropped.
    pub fn emit(&self, event: PuppetEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Subscribes to events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<PuppetEvent> {
        self.tx.subscribe()
    }

    /// Returns the number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
