//! # Puppet Core
//!
//! The framework-facing contract every puppet implements.
//!
//! A puppet sits between a host automation framework and one chat account:
//!
//! ```text
//! ┌────────────┐  on_start / send   ┌──────────┐  login / send   ┌─────────────────┐
//! │    Host    │───────────────────▶│  Puppet  │────────────────▶│ Protocol client │
//! │ framework  │◀───────────────────│          │◀────────────────│                 │
//! └────────────┘   PuppetEvent      └──────────┘   raw events    └─────────────────┘
//! ```
//!
//! This crate provides:
//!
//! - [`Puppet`]: lifecycle hooks, raw-payload accessors and parsers, outbound operations
//! - Canonical payloads: [`MessagePayload`], [`ContactPayload`], [`RoomPayload`]
//! - Events: [`PuppetEvent`] broadcast through an [`EventEmitter`]
//! - Errors: [`PuppetError`] and [`PuppetResult`]

pub mod error;
pub mod event;
pub mod payload;
pub mod puppet;

pub use error::{EntityKind, PuppetError, PuppetResult};
pub use event::{DEFAULT_EVENT_CAPACITY, EventEmitter, PuppetEvent};
pub use payload::{
    ContactGender, ContactPayload, ContactType, FileBox, FriendshipPayload, ImageType,
    MessageDestination, MessagePayload, MessageType, MiniProgramPayload, RoomInvitationPayload,
    RoomMemberPayload, RoomPayload, UrlLinkPayload,
};
pub use puppet::Puppet;

/// Prelude for common imports.
pub mod prelude {
    pub use super::error::*;
    pub use super::event::*;
    pub use super::payload::*;
    pub use super::puppet::Puppet;
}
