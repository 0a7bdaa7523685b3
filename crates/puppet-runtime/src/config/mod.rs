//! Configuration for the puppet runtime.
//!
//! Layered loading via figment (see [`loader`]), the [`schema`] of the
//! configuration file and [`validation`] of values serde cannot reject.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, PuppetConfig, SpanEventConfig,
};
pub use validation::validate_config;
