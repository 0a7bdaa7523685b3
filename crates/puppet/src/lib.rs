//! # Puppet
//!
//! Drives a chat account on behalf of a bot framework.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌────────────────────────────────┐
//! │   Runtime   │────▶│  PuppetOicq  │────▶│ ProtocolClient (login, send)   │
//! │ (config,    │     │ (session,    │◀────│ ClientEvent stream             │
//! │  logging)   │◀────│  cache)      │     └────────────────────────────────┘
//! └─────────────┘     └──────────────┘
//!        PuppetEvent broadcast
//! ```
//!
//! - **Core**: the [`Puppet`](core::Puppet) contract, payloads and events
//! - **OICQ**: the QQ puppet: identifier codec, entity cache, translation
//! - **Runtime**: configuration, logging and lifecycle
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use puppet::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = PuppetRuntime::builder().build_oicq(my_client_factory)?;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use puppet_core as core;
pub use puppet_oicq as oicq;
pub use puppet_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use puppet::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use puppet_runtime::{PuppetConfig, PuppetRuntime, RuntimeError, RuntimeResult};

    // Contract and payloads
    pub use puppet_core::{
        ContactGender, ContactPayload, ContactType, EventEmitter, MessageDestination,
        MessagePayload, MessageType, Puppet, PuppetError, PuppetEvent, PuppetResult, RoomPayload,
    };

    // QQ backend
    pub use puppet_oicq::{
        BoxedClient, ClientError, ClientEvent, ClientFactory, ClientOptions, ClientResult,
        ContactRecord, ConversationId, GroupId, MessageRecord, OicqConfig, ProtocolClient,
        PuppetOicq, RoomRecord, UserId,
    };

    // Logging macros
    pub use puppet_runtime::prelude::*;
}
