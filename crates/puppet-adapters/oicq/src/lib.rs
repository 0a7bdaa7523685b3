//! # QQ Puppet (OICQ)
//!
//! Drives one QQ account on behalf of a chat-automation host through an
//! external protocol client (see [`ProtocolClient`]).
//!
//! ## Overview
//!
//! ```text
//!  ProtocolClient ──ClientEvent──► PuppetOicq ──PuppetEvent──► host
//!        ▲                           │    │
//!        │ send_private / send_group │    └─► EntityCache (messages, contacts, rooms)
//!        └───────────────────────────┘               │
//!                                     raw payload ◄──┘──► translate ──► canonical payload
//! ```
//!
//! Conversation ids live in two disjoint namespaces, `qq_<number>` for users
//! and `group_<number>` for groups (see [`qq_id`]). The outbound send path
//! relies on that prefix alone to pick the private or the group call.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use puppet_core::{Puppet, PuppetEvent};
//! use puppet_oicq::{OicqConfig, PuppetOicq};
//!
//! let puppet = PuppetOicq::builder()
//!     .config(OicqConfig::with_account(123456789))
//!     .client_factory(|account, options: &ClientOptions| my_client(account, options))
//!     .build()?;
//!
//! let mut events = puppet.subscribe();
//! puppet.on_start().await?;
//! while let Ok(event) = events.recv().await {
//!     if let PuppetEvent::Message { message_id } = event {
//!         let raw = puppet.message_raw_payload(&message_id).await?;
//!         let payload = puppet.message_raw_payload_parser(raw).await?;
//!         puppet.message_send_text(&payload.from_id, &payload.text).await?;
//!     }
//! }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod model;
mod probe;
mod puppet;
pub mod qq_id;
pub mod translate;

#[cfg(test)]
mod mock;

pub use cache::{CacheStats, EntityCache};
pub use client::{
    BoxedClient, BoxedClientFactory, ClientError, ClientEvent, ClientFactory, ClientOptions,
    ClientResult, ProtocolClient,
};
pub use config::{ACCOUNT_ENV, OicqConfig};
pub use model::{ContactRecord, MessageKind, MessageRecord, RoomRecord};
pub use probe::LoginProbe;
pub use puppet::{PuppetOicq, PuppetOicqBuilder, SessionState, VERSION};
pub use qq_id::{ConversationId, GroupId, IdKind, UserId};
