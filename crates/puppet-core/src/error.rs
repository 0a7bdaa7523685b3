//! Unified error types for the puppet contract.
//!
//! Every failure a puppet can report to its host is a variant of
//! [`PuppetError`]. Unknown or unsupported branches always map to a
//! distinguished variant, never to a default value.

use std::fmt;

use thiserror::Error;

// =============================================================================
// Entity Kinds
// =============================================================================

/// The kind of cached entity a lookup was aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A raw message record.
    Message,
    /// A raw contact record.
    Contact,
    /// A raw room record.
    Room,
}

impl EntityKind {
    /// Returns the kind name as used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Contact => "contact",
            Self::Room => "room",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Puppet Errors
// =============================================================================

/// Errors that can occur in puppet operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PuppetError {
    /// A conversation id could not be decoded into a QQ number.
    #[error("invalid identifier: {id:?}")]
    InvalidIdentifier {
        /// The rejected identifier.
        id: String,
    },

    /// A conversation id is neither a user id nor a group id.
    #[error("conversation id {id:?} is neither a user id nor a group id")]
    InvalidConversationId {
        /// The unclassifiable identifier.
        id: String,
    },

    /// A raw-payload lookup missed the cache.
    #[error("{kind} '{id}' not found")]
    NotFound {
        /// Which store was queried.
        kind: EntityKind,
        /// The key that missed.
        id: String,
    },

    /// A raw message resolves to neither a direct recipient nor a room.
    #[error("message '{message_id}' has neither a recipient nor a room")]
    MissingDestination {
        /// The offending message id.
        message_id: String,
    },

    /// A message names both a direct recipient and a room.
    #[error("message '{message_id}' has both a recipient and a room")]
    AmbiguousDestination {
        /// The offending message id.
        message_id: String,
    },

    /// A raw enumeration value has no framework counterpart.
    #[error("unknown value {value:?} for field '{field}'")]
    UnknownEnumValue {
        /// The raw field name.
        field: &'static str,
        /// The unrecognized value.
        value: String,
    },

    /// The capability is intentionally unsupported by this puppet.
    #[error("{operation} is not implemented")]
    NotImplemented {
        /// The framework operation name.
        operation: &'static str,
    },

    /// The operation needs a live protocol client but none is running.
    #[error("no active session")]
    NoActiveSession,

    /// The protocol client rejected a call.
    #[error("protocol client error: {0}")]
    Client(String),

    /// Startup configuration is missing or malformed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PuppetError {
    /// Creates an invalid identifier error.
    pub fn invalid_identifier(id: impl Into<String>) -> Self {
        Self::InvalidIdentifier { id: id.into() }
    }

    /// Creates a not-found error for the given store.
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Creates a not-implemented error for a framework operation.
    pub fn not_implemented(operation: &'static str) -> Self {
        Self::NotImplemented { operation }
    }

    /// Creates a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Returns `true` if the error reports an unsupported capability.
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Self::NotImplemented { .. })
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for puppet operations.
pub type PuppetResult<T> = Result<T, PuppetError>;
