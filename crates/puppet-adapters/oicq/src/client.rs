//! The protocol client collaborator.
//!
//! The QQ wire protocol, its login / QR-code state machine and its
//! reconnection policy all live in an external client library. The adapter
//! talks to it only through [`ProtocolClient`]:
//!
//! ```text
//! ClientFactory::create(account, options) ──► Arc<dyn ProtocolClient>
//!                                               │
//!             login / terminate / send_* ◄──────┤
//!                                               └──► events(): Stream<ClientEvent>
//! ```

use std::num::NonZeroU64;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use puppet_core::PuppetError;
use thiserror::Error;

use crate::model::{ContactRecord, MessageRecord};

// =============================================================================
// Errors
// =============================================================================

/// Errors reported by a protocol client call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The client is not (or no longer) connected.
    #[error("client is not connected")]
    NotConnected,

    /// The login attempt was rejected.
    #[error("login failed ({code}): {message}")]
    LoginFailed {
        /// Client-specific error code.
        code: i32,
        /// Human readable reason.
        message: String,
    },

    /// A send call was rejected.
    #[error("failed to send message to {target}: {reason}")]
    SendFailed {
        /// Target account or group number.
        target: u64,
        /// Reason for failure.
        reason: String,
    },

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl From<ClientError> for PuppetError {
    fn from(err: ClientError) -> Self {
        PuppetError::Client(err.to_string())
    }
}

/// Result type for protocol client calls.
pub type ClientResult<T> = Result<T, ClientError>;

// =============================================================================
// Events
// =============================================================================

/// Events emitted by a protocol client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// A QR code must be scanned to finish logging in.
    LoginQrCode,
    /// A login attempt failed.
    ///
    /// Negative codes are transient (expired QR code, network hiccup).
    LoginError {
        /// Client-specific error code.
        code: i32,
        /// Human readable reason.
        message: String,
    },
    /// Login succeeded; carries the friend list.
    Online {
        /// Friend list snapshot.
        friends: Vec<ContactRecord>,
    },
    /// Inbound message.
    Message(MessageRecord),
    /// The connection dropped; the client reconnects on its own.
    Offline {
        /// Reason reported by the client.
        reason: String,
    },
}

impl ClientEvent {
    /// Returns a short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::LoginQrCode => "login_qrcode",
            Self::LoginError { .. } => "login_error",
            Self::Online { .. } => "online",
            Self::Message(_) => "message",
            Self::Offline { .. } => "offline",
        }
    }
}

// =============================================================================
// Client
// =============================================================================

/// Construction options passed to the client factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Log level of the client library itself.
    pub log_level: String,
    /// Ask the client not to write QR code image files.
    pub suppress_qrcode_image: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            log_level: "off".to_string(),
            suppress_qrcode_image: true,
        }
    }
}

/// A connected (or connecting) QQ protocol client for one account.
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    /// The account this client logs into.
    fn uin(&self) -> NonZeroU64;

    /// Takes the client's event stream.
    ///
    /// Only the first call yields events; later calls return an empty stream.
    fn events(&self) -> BoxStream<'static, ClientEvent>;

    /// Starts (or restarts) a login attempt.
    async fn login(&self) -> ClientResult<()>;

    /// Closes the connection.
    async fn terminate(&self) -> ClientResult<()>;

    /// Sends a private message; returns the protocol message id.
    async fn send_private_msg(&self, user_id: u64, text: &str) -> ClientResult<String>;

    /// Sends a group message; returns the protocol message id.
    async fn send_group_msg(&self, group_id: u64, text: &str) -> ClientResult<String>;

    /// Returns `true` if the account has joined the group.
    fn is_group_joined(&self, group_id: u64) -> bool;
}

/// Shared handle to a protocol client.
pub type BoxedClient = Arc<dyn ProtocolClient>;

/// Builds protocol clients.
pub trait ClientFactory: Send + Sync {
    /// Creates a fresh client for `account`.
    fn create(&self, account: NonZeroU64, options: &ClientOptions) -> BoxedClient;
}

impl<F> ClientFactory for F
where
    F: Fn(NonZeroU64, &ClientOptions) -> BoxedClient + Send + Sync,
{
    fn create(&self, account: NonZeroU64, options: &ClientOptions) -> BoxedClient {
        self(account, options)
    }
}

/// Shared handle to a client factory.
pub type BoxedClientFactory = Arc<dyn ClientFactory>;
