//! Runtime error types.

use puppet_core::PuppetError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The puppet rejected a lifecycle call or could not be built.
    #[error("Puppet error: {0}")]
    Puppet(#[from] PuppetError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
