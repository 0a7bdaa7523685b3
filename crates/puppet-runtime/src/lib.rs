//! Puppet Runtime - hosting layer for puppets.
//!
//! This crate provides:
//! - Layered configuration (`PuppetConfig`, `ConfigLoader`)
//! - Logging setup driven by that configuration
//! - Lifecycle orchestration and event logging (`PuppetRuntime`)
//!
//! ```ignore
//! use puppet_runtime::PuppetRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = PuppetRuntime::builder()
//!         .profile("dev")
//!         .build_oicq(my_client_factory)?;
//!
//!     // Run until Ctrl+C
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Configuration Sources
//!
//! Defaults, then `puppet.toml` / `config.toml` (YAML with the `yaml-config`
//! feature) and their `{profile}` variants, then `PUPPET_*` environment
//! variables with `__` separating nested keys (`PUPPET_OICQ__QQ=10001`).
//! See [`config`] for the exact precedence.

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{ConfigError, ConfigLoader, ConfigResult, LoggingConfig, PuppetConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{PuppetRuntime, RuntimeBuilder};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// Provides the logging macros plus `Level` and the `instrument` attribute.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
